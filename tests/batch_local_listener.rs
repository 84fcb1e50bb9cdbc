use std::fs;
use std::time::Duration;

use mailverify_lib::{
    BatchRunner, CheckStatus, DisposableDomains, LocalSmtpServer, LookupMx, MxError, MxRecord,
    NoopSink, OutputFormat, SmtpProbe, SmtpProbeOptions, ValidationMode, Verifier, read_addresses,
    write_report,
};

/// Every domain has MX records except those under `.invalid`.
struct FixedMx;

impl LookupMx for FixedMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, MxError> {
        if domain.ends_with(".invalid") {
            Ok(Vec::new())
        } else {
            Ok(vec![MxRecord::new(10, format!("mx.{domain}"))])
        }
    }
}

#[test]
fn batch_against_local_listener() {
    let server = LocalSmtpServer::start("127.0.0.1:0").expect("start listener");
    let addr = server.local_addr();
    let options = SmtpProbeOptions {
        host: addr.ip().to_string(),
        port: addr.port(),
        timeout: Duration::from_secs(5),
        ..SmtpProbeOptions::default()
    };

    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("emails.txt");
    fs::write(
        &input,
        "good@validdomain.test\nnot-an-email\n\nuser@nonexistent-domain-xyz.invalid\nuser@mailinator.com\n",
    )
    .expect("write input");
    let addresses = read_addresses(&input).expect("read input");
    assert_eq!(addresses.len(), 5);

    let disposable = DisposableDomains::builtin();
    let summary = BatchRunner::new(3).run(
        &addresses,
        || {
            Verifier::new(
                ValidationMode::Strict,
                FixedMx,
                SmtpProbe::new(options.clone()),
                &disposable,
            )
        },
        &NoopSink,
    );
    drop(server);

    assert!(!summary.cancelled);
    assert_eq!(summary.total(), 5);
    assert_eq!(summary.valid(), 1);
    assert_eq!(summary.invalid(), 4);

    let [good, bad_syntax, blank, no_mx, throwaway] = summary.results.as_slice() else {
        panic!("expected five results");
    };
    assert!(good.is_valid());
    assert_eq!(good.smtp_check, CheckStatus::Pass);
    assert!(!bad_syntax.syntax_valid);
    assert_eq!(bad_syntax.mx_check, CheckStatus::Skipped);
    assert_eq!(blank.address, "");
    assert!(!blank.syntax_valid);
    assert_eq!(no_mx.mx_check, CheckStatus::Fail);
    assert_eq!(no_mx.smtp_check, CheckStatus::Skipped);
    assert_eq!(no_mx.error_detail.as_deref(), Some("No valid MX records"));
    assert_eq!(throwaway.smtp_check, CheckStatus::Pass);
    assert!(throwaway.is_disposable);

    let output = dir.path().join("validation_results.csv");
    write_report(&output, &summary, OutputFormat::Csv).expect("write report");
    let written = fs::read_to_string(&output).expect("read report");
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "email,is_valid,normalized_email,mx_check,smtp_check,is_disposable,error"
    );
    assert!(lines[1].starts_with("good@validdomain.test,true,"));
    assert!(lines[3].starts_with(",false,"));
    assert!(lines[5].starts_with("user@mailinator.com,false,"));
}

#[test]
fn unsupported_input_is_rejected_before_any_work() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("emails.json");
    fs::write(&input, "[]").expect("write input");

    let err = read_addresses(&input).expect_err("unsupported");
    assert!(err.to_string().contains("unsupported input format"), "{err}");
}
