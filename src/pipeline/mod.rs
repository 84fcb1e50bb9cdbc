//! Per-address verification: syntax → MX → SMTP → disposable.
//!
//! A syntax failure or an MX failure ends verification for the address; an
//! SMTP failure does not, the disposable check still runs. Nothing in here
//! returns an error: every failure ends up in the [`VerificationResult`].

mod types;

pub use types::{CheckStatus, VerificationResult};

use crate::config::VerifierConfig;
use crate::disposable::DisposableDomains;
use crate::events::{Event, EventSink, Step};
use crate::mx::{self, DnsMxResolver, LookupMx};
use crate::smtp::{MailboxProbe, SmtpProbe};
use crate::validator::{ValidationMode, normalize_email};

pub const NO_MX_RECORDS: &str = "No valid MX records";

/// Anything that turns an address into a verdict. The batch runner only
/// depends on this.
pub trait Verify {
    fn verify(&self, address: &str, sink: &dyn EventSink) -> VerificationResult;
}

pub struct Verifier<'d, L, P> {
    mode: ValidationMode,
    resolver: L,
    probe: P,
    disposable: &'d DisposableDomains,
}

impl<'d> Verifier<'d, DnsMxResolver, SmtpProbe> {
    /// Network-backed verifier: system DNS resolver and SMTP probe, both
    /// bounded by the configured timeouts.
    pub fn from_config(config: &VerifierConfig, disposable: &'d DisposableDomains) -> Self {
        Self::new(
            config.validation.mode,
            DnsMxResolver::new(config.dns_timeout()),
            SmtpProbe::new(config.smtp_options()),
            disposable,
        )
    }
}

impl<'d, L, P> Verifier<'d, L, P>
where
    L: LookupMx,
    P: MailboxProbe,
{
    pub fn new(
        mode: ValidationMode,
        resolver: L,
        probe: P,
        disposable: &'d DisposableDomains,
    ) -> Self {
        Self {
            mode,
            resolver,
            probe,
            disposable,
        }
    }

    fn finish(&self, result: VerificationResult, sink: &dyn EventSink) -> VerificationResult {
        sink.emit(&Event::Verified { result: &result });
        result
    }
}

fn completed(sink: &dyn EventSink, address: &str, step: Step, status: CheckStatus, detail: Option<&str>) {
    sink.emit(&Event::StepCompleted {
        address,
        step,
        status,
        detail,
    });
}

impl<L, P> Verify for Verifier<'_, L, P>
where
    L: LookupMx,
    P: MailboxProbe,
{
    fn verify(&self, address: &str, sink: &dyn EventSink) -> VerificationResult {
        sink.emit(&Event::StepStarted {
            address,
            step: Step::Syntax,
        });
        let reason = match normalize_email(address, self.mode) {
            Ok(normalized) if normalized.valid => Ok(normalized),
            Ok(normalized) => Err(normalized.reason_text()),
            Err(err) => Err(err.to_string()),
        };
        let normalized = match reason {
            Ok(normalized) => normalized,
            Err(reason) => {
                completed(sink, address, Step::Syntax, CheckStatus::Fail, Some(&reason));
                return self.finish(VerificationResult::syntax_failure(address, reason), sink);
            }
        };
        completed(sink, address, Step::Syntax, CheckStatus::Pass, None);

        let canonical = format!("{}@{}", normalized.local, normalized.domain);
        let domain = normalized.domain.as_str();
        let ascii_domain = normalized.ascii_domain.as_str();

        sink.emit(&Event::StepStarted {
            address,
            step: Step::Mx,
        });
        let lookup = if ascii_domain.is_empty() {
            Err(mx::Error::EmptyDomain)
        } else {
            mx::resolve_with(&self.resolver, ascii_domain)
        };
        match lookup {
            Ok(status) if status.has_records() => {}
            Ok(_) => {
                completed(sink, address, Step::Mx, CheckStatus::Fail, Some("no MX records"));
                return self.finish(VerificationResult::mx_failure(address, canonical), sink);
            }
            Err(err) => {
                let detail = err.to_string();
                completed(sink, address, Step::Mx, CheckStatus::Fail, Some(&detail));
                return self.finish(VerificationResult::mx_failure(address, canonical), sink);
            }
        }
        completed(sink, address, Step::Mx, CheckStatus::Pass, None);

        sink.emit(&Event::StepStarted {
            address,
            step: Step::Smtp,
        });
        let recipient = format!("{}@{}", normalized.local, ascii_domain);
        let report = self.probe.probe(&recipient);
        let smtp_check = CheckStatus::from_passed(report.outcome.is_accepted());
        let smtp_detail = (smtp_check == CheckStatus::Fail).then(|| report.outcome.to_string());
        completed(sink, address, Step::Smtp, smtp_check, smtp_detail.as_deref());

        sink.emit(&Event::StepStarted {
            address,
            step: Step::Disposable,
        });
        let is_disposable = self.disposable.is_disposable(domain)
            || (ascii_domain != domain && self.disposable.is_disposable(ascii_domain));
        completed(
            sink,
            address,
            Step::Disposable,
            CheckStatus::from_passed(!is_disposable),
            is_disposable.then_some("disposable domain"),
        );

        self.finish(
            VerificationResult::completed(address, canonical, smtp_check, is_disposable),
            sink,
        )
    }
}
