use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use mailverify_lib::{OutputFormat, ValidationMode, VerifierConfig};

#[derive(Parser)]
#[command(
    name = "mailverify-cli",
    version,
    about = "Bulk e-mail verification: syntax, MX, SMTP RCPT probe, disposable domains",
    subcommand_negates_reqs = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// input file: .csv (with an `email` column) or .txt (one address per line)
    #[arg(required_unless_present = "stdin")]
    pub input: Option<PathBuf>,

    /// read addresses from stdin (one per line)
    #[arg(long, conflicts_with = "input")]
    pub stdin: bool,

    /// results file (default: validation_results.csv)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// format: csv|json|ndjson
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,

    /// number of worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// SMTP probe target host
    #[arg(long)]
    pub smtp_host: Option<String>,

    /// SMTP probe target port
    #[arg(long)]
    pub smtp_port: Option<u16>,

    /// SMTP connect and per-command timeout (ms)
    #[arg(long)]
    pub smtp_timeout_ms: Option<u64>,

    /// MX lookup timeout (ms)
    #[arg(long)]
    pub dns_timeout_ms: Option<u64>,

    /// name sent with EHLO
    #[arg(long)]
    pub helo: Option<String>,

    /// envelope MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// mode: strict|relaxed
    #[arg(long)]
    pub mode: Option<String>,

    /// extra disposable domains, one per line
    #[arg(long)]
    pub disposable_list: Option<PathBuf>,

    /// do not start the local stand-in SMTP listener
    #[arg(long)]
    pub no_local_server: bool,

    /// TOML config file
    #[arg(long, env = "MAILVERIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// more logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify a single address (exit 0 when valid, 2 when invalid)
    Check { email: String },
    /// Run the stand-in SMTP listener until Ctrl-C
    Serve {
        /// listen address (default: the configured SMTP target)
        #[arg(long)]
        listen: Option<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Config file (if any) with command-line overrides applied on top.
    pub fn resolve_config(&self) -> Result<VerifierConfig> {
        let mut config = match &self.config {
            Some(path) => VerifierConfig::load(path)?,
            None => VerifierConfig::default(),
        };

        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if let Some(out) = &self.out {
            config.batch.output = out.clone();
        }
        if self.no_local_server {
            config.batch.local_server = false;
        }
        if let Some(host) = &self.smtp_host {
            config.smtp.host = host.clone();
        }
        if let Some(port) = self.smtp_port {
            config.smtp.port = port;
        }
        if let Some(ms) = self.smtp_timeout_ms {
            config.smtp.timeout_ms = ms;
        }
        if let Some(ms) = self.dns_timeout_ms {
            config.dns.timeout_ms = ms;
        }
        if let Some(helo) = &self.helo {
            config.smtp.helo = helo.clone();
        }
        if let Some(from) = &self.mail_from {
            config.smtp.mail_from = from.clone();
        }
        if let Some(mode) = &self.mode {
            config.validation.mode = mode_from_str(mode)?;
        }
        if let Some(list) = &self.disposable_list {
            config.validation.disposable_list = Some(list.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

pub fn mode_from_str(s: &str) -> Result<ValidationMode> {
    match s {
        "strict" => Ok(ValidationMode::Strict),
        "relaxed" => Ok(ValidationMode::Relaxed),
        other => bail!("unknown --mode '{other}', use: strict|relaxed"),
    }
}
