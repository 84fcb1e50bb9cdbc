//! Run configuration, loadable from TOML. Every key is optional; defaults
//! target the local stand-in listener with 10 second timeouts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::smtp::SmtpProbeOptions;
use crate::validator::ValidationMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub dns: DnsConfig,
    pub smtp: SmtpConfig,
    pub validation: ValidationConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DnsConfig {
    pub timeout_ms: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
    pub helo: String,
    pub mail_from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        let probe = SmtpProbeOptions::default();
        Self {
            host: probe.host,
            port: probe.port,
            timeout_ms: probe.timeout.as_millis() as u64,
            helo: probe.helo,
            mail_from: probe.mail_from,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub mode: ValidationMode,
    /// Extra disposable domains, one per line.
    pub disposable_list: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub workers: usize,
    pub output: PathBuf,
    /// Start the stand-in SMTP listener on the probe target before the run.
    pub local_server: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            output: PathBuf::from("validation_results.csv"),
            local_server: true,
        }
    }
}

impl VerifierConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid("batch.workers must be at least 1".into()));
        }
        if self.dns.timeout_ms == 0 {
            return Err(ConfigError::Invalid("dns.timeout_ms must be positive".into()));
        }
        if self.smtp.timeout_ms == 0 {
            return Err(ConfigError::Invalid("smtp.timeout_ms must be positive".into()));
        }
        if self.smtp.host.trim().is_empty() {
            return Err(ConfigError::Invalid("smtp.host is empty".into()));
        }
        Ok(())
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns.timeout_ms)
    }

    pub fn smtp_options(&self) -> SmtpProbeOptions {
        SmtpProbeOptions {
            host: self.smtp.host.clone(),
            port: self.smtp.port,
            timeout: Duration::from_millis(self.smtp.timeout_ms),
            helo: self.smtp.helo.clone(),
            mail_from: self.smtp.mail_from.clone(),
        }
    }

    /// `host:port` of the probe target, which is also where the stand-in
    /// listener binds.
    pub fn smtp_target(&self) -> String {
        format!("{}:{}", self.smtp.host, self.smtp.port)
    }
}
