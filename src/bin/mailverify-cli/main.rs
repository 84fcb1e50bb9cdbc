mod args;
mod progress;

use std::io;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use mailverify_lib::{
    BatchRunner, BatchSummary, CancelToken, DisposableDomains, LocalSmtpServer, Verifier,
    VerifierConfig, Verify, read_addresses, read_lines, write_report,
};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::progress::{StatusPrinter, verdict_line};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

/// Ctrl-C flips the returned token instead of killing the process. Only the
/// batch run and `serve` install it; elsewhere SIGINT keeps its default.
fn install_ctrlc() -> Result<CancelToken> {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("Interrupted, finishing in-flight addresses...");
        token.cancel();
    })
    .context("install Ctrl-C handler")?;
    Ok(cancel)
}

fn load_disposable(config: &VerifierConfig) -> Result<DisposableDomains> {
    match &config.validation.disposable_list {
        Some(path) => DisposableDomains::load_extra(path)
            .with_context(|| format!("read disposable list {}", path.display())),
        None => Ok(DisposableDomains::builtin()),
    }
}

/// Stand-in listener for the run, when enabled. A bind failure is only
/// logged: something else may already be listening on the target.
fn start_local_server(config: &VerifierConfig) -> Option<LocalSmtpServer> {
    if !config.batch.local_server {
        return None;
    }
    let target = config.smtp_target();
    match LocalSmtpServer::start(target.as_str()) {
        Ok(server) => {
            eprintln!("Local SMTP server listening on {}", server.local_addr());
            Some(server)
        }
        Err(err) => {
            tracing::warn!(%target, error = %err, "cannot start local SMTP listener, using existing target");
            None
        }
    }
}

fn run_serve(config: &VerifierConfig, listen: Option<String>) -> Result<()> {
    let addr = listen.unwrap_or_else(|| config.smtp_target());
    let mut server =
        LocalSmtpServer::start(addr.as_str()).with_context(|| format!("bind SMTP listener on {addr}"))?;
    let cancel = install_ctrlc()?;
    println!("SMTP server running on {}", server.local_addr());
    while !cancel.is_cancelled() {
        thread::sleep(Duration::from_millis(200));
    }
    server.shutdown();
    Ok(())
}

fn run_check(config: &VerifierConfig, email: &str, steps: bool) -> Result<bool> {
    let disposable = load_disposable(config)?;
    let _server = start_local_server(config);
    let verifier = Verifier::from_config(config, &disposable);
    let result = verifier.verify(email, &StatusPrinter::new(steps));
    println!("{}", verdict_line(&result));
    if let Some(normalized) = &result.normalized_address {
        println!("Normalized: {normalized}");
    }
    Ok(result.is_valid())
}

fn run_batch(cli: &Cli, config: &VerifierConfig) -> Result<()> {
    // input errors abort here, before any verification and without output
    let addresses = if cli.stdin {
        read_lines(io::stdin().lock()).context("read stdin")?
    } else {
        let input = cli.input.as_deref().context("no input file given")?;
        read_addresses(input).context("error reading input")?
    };
    eprintln!("Found {} emails to validate", addresses.len());

    let disposable = load_disposable(config)?;
    let server = start_local_server(config);
    let cancel = install_ctrlc()?;

    let runner = BatchRunner::new(config.batch.workers).with_cancel(cancel);
    let printer = StatusPrinter::with_progress(cli.verbose > 0, addresses.len());
    let summary = runner.run(
        &addresses,
        || Verifier::from_config(config, &disposable),
        &printer,
    );
    printer.finish(summary.cancelled);
    drop(server);

    // counts are printed even when the results file cannot be written
    print_summary(&summary);
    let output = &config.batch.output;
    write_report(output, &summary, cli.format)
        .with_context(|| format!("write results to {}", output.display()))?;
    println!("Results saved to: {} ({})", output.display(), cli.format);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!();
    if summary.cancelled {
        println!("Validation cancelled ({} not processed)", summary.skipped);
    } else {
        println!("Validation Complete!");
    }
    println!("Total emails: {}", summary.total());
    println!("Valid emails: {}", summary.valid());
    println!("Invalid emails: {}", summary.invalid());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.resolve_config()?;

    match &cli.cmd {
        Some(Commands::Serve { listen }) => run_serve(&config, listen.clone()),
        Some(Commands::Check { email }) => {
            let valid = run_check(&config, email, cli.verbose > 0)?;
            // codes de sortie : 0 valide, 2 invalide, 1 erreur
            if !valid {
                std::process::exit(2);
            }
            Ok(())
        }
        None => run_batch(&cli, &config),
    }
}
