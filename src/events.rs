//! Typed progress events.
//!
//! The pipeline and the batch runner report what they are doing through an
//! [`EventSink`]; rendering is left to the caller. Sinks are shared across
//! worker threads, hence the `Sync` bound.

use std::fmt;

use crate::pipeline::{CheckStatus, VerificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Syntax,
    Mx,
    Smtp,
    Disposable,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax validation",
            Self::Mx => "DNS records",
            Self::Smtp => "SMTP connection",
            Self::Disposable => "disposable email check",
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    StepStarted {
        address: &'a str,
        step: Step,
    },
    StepCompleted {
        address: &'a str,
        step: Step,
        status: CheckStatus,
        detail: Option<&'a str>,
    },
    /// Final verdict for one address.
    Verified { result: &'a VerificationResult },
    /// Emitted by the batch runner each time a result is collected.
    Progress { completed: usize, total: usize },
}

pub trait EventSink: Sync {
    fn emit(&self, event: &Event<'_>);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: &Event<'_>) {
        (**self).emit(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &Event<'_>) {}
}

/// Forwards events to `tracing`: steps at `debug`, verdicts at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event<'_>) {
        match *event {
            Event::StepStarted { address, step } => {
                tracing::debug!(address, %step, "checking");
            }
            Event::StepCompleted {
                address,
                step,
                status,
                detail,
            } => {
                if status == CheckStatus::Fail {
                    tracing::warn!(address, %step, detail = detail.unwrap_or_default(), "check failed");
                } else {
                    tracing::debug!(address, %step, %status, "check done");
                }
            }
            Event::Verified { result } => {
                tracing::info!(
                    address = %result.address,
                    valid = result.is_valid(),
                    mx = %result.mx_check,
                    smtp = %result.smtp_check,
                    disposable = result.is_disposable,
                    "verified"
                );
            }
            Event::Progress { completed, total } => {
                tracing::trace!(completed, total, "progress");
            }
        }
    }
}
