#![forbid(unsafe_code)]
//! Bulk e-mail verification: syntax, MX lookup, SMTP
//! `RCPT TO` probe and disposable-domain screening.
//!
//! The per-address entry point is [`Verifier::verify`]; [`BatchRunner`] fans a
//! list of addresses out over a bounded worker pool and keeps input order.

pub mod batch;
pub mod config;
pub mod disposable;
pub mod events;
pub mod input;
pub mod listener;
pub mod mx;
pub mod pipeline;
pub mod report;
pub mod smtp;
pub mod validator;

pub use batch::{BatchRunner, BatchSummary, CancelToken};
pub use config::{ConfigError, VerifierConfig};
pub use disposable::DisposableDomains;
pub use events::{Event, EventSink, NoopSink, Step, TracingSink};
pub use input::{InputError, InputFormat, read_addresses, read_lines};
pub use listener::LocalSmtpServer;
pub use mx::{DnsMxResolver, Error as MxError, LookupMx, MxRecord, MxStatus, check_mx};
pub use pipeline::{CheckStatus, Verifier, Verify, VerificationResult};
pub use report::{OutputFormat, ReportError, write_report};
pub use smtp::{MailboxProbe, SmtpError, SmtpOutcome, SmtpProbe, SmtpProbeOptions, SmtpReply};
pub use validator::{
    EmailError, NormalizedEmail, ValidationMode, ValidationReport, normalize_email,
    validate_email,
};
