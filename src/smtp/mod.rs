//! SMTP `RCPT TO` probing against a single relay endpoint.
//!
//! [`SmtpProbe`] opens a plain-text session, walks greeting → `EHLO` →
//! `MAIL FROM` → `RCPT TO`, always attempts `QUIT`, and classifies the
//! recipient reply into an [`SmtpOutcome`]. Every failure is folded into the
//! outcome; nothing here returns an error to the caller.

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::SmtpError;
pub use options::SmtpProbeOptions;
pub use probe::{MailboxProbe, SmtpProbe};
pub use types::{AttemptStage, SmtpEvent, SmtpOutcome, SmtpProbeReport, SmtpReply};

#[cfg(test)]
pub(crate) mod tests;
