//! Results file: one row per address, written once at the end of a batch.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::BatchSummary;
use crate::pipeline::{CheckStatus, VerificationResult};

pub const COLUMNS: [&str; 7] = [
    "email",
    "is_valid",
    "normalized_email",
    "mx_check",
    "smtp_check",
    "is_disposable",
    "error",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown output format '{0}', use: csv|json|ndjson")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Ndjson,
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        })
    }
}

/// Serialized shape of one result. `normalized_email` is blank when syntax
/// failed and `is_disposable` is blank when the check never ran.
#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    email: &'a str,
    is_valid: bool,
    normalized_email: Option<&'a str>,
    mx_check: CheckStatus,
    smtp_check: CheckStatus,
    is_disposable: Option<bool>,
    error: Option<&'a str>,
}

impl<'a> From<&'a VerificationResult> for ReportRow<'a> {
    fn from(result: &'a VerificationResult) -> Self {
        Self {
            email: &result.address,
            is_valid: result.is_valid(),
            normalized_email: result.normalized_address.as_deref(),
            mx_check: result.mx_check,
            smtp_check: result.smtp_check,
            is_disposable: result.disposable_checked().then_some(result.is_disposable),
            error: result.error_detail.as_deref(),
        }
    }
}

/// Encodes the results without touching the filesystem.
pub fn render(results: &[VerificationResult], format: OutputFormat) -> Result<Vec<u8>, ReportError> {
    let rows = results.iter().map(ReportRow::from);
    match format {
        OutputFormat::Csv => {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(Vec::new());
            wtr.write_record(COLUMNS)?;
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.into_inner().map_err(|err| ReportError::Csv(err.into_error().into()))
        }
        OutputFormat::Json => {
            let rows: Vec<ReportRow<'_>> = rows.collect();
            let mut buf = serde_json::to_vec_pretty(&rows)?;
            buf.push(b'\n');
            Ok(buf)
        }
        OutputFormat::Ndjson => {
            let mut buf = Vec::new();
            for row in rows {
                serde_json::to_writer(&mut buf, &row)?;
                buf.push(b'\n');
            }
            Ok(buf)
        }
    }
}

/// Writes the full result set to `path` through a sibling temp file and a
/// rename, so an interrupted run never leaves a truncated report.
pub fn write_report(path: &Path, summary: &BatchSummary, format: OutputFormat) -> Result<(), ReportError> {
    let bytes = render(&summary.results, format)?;
    write_all_atomically(path, &bytes)?;
    tracing::info!(path = %path.display(), rows = summary.results.len(), %format, "report written");
    Ok(())
}

fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let io_error = |source: io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let written = File::create(&tmp).and_then(|mut f| {
        f.write_all(bytes)?;
        f.sync_all()
    });
    if let Err(source) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(io_error(source));
    }
    Ok(())
}
