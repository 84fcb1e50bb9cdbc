//! Bounded worker pool over a list of addresses.
//!
//! Addresses go through an indexed rayon iterator on a dedicated pool, so the
//! summary follows input order whatever the completion order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::events::{Event, EventSink};
use crate::pipeline::{VerificationResult, Verify};

pub const DEFAULT_WORKERS: usize = 10;

/// Stops dispatch of new addresses. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Results in input order. Shorter than the input when the run was cancelled.
    pub results: Vec<VerificationResult>,
    pub cancelled: bool,
    /// Addresses never dispatched.
    pub skipped: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn valid(&self) -> usize {
        self.results.iter().filter(|r| r.is_valid()).count()
    }

    pub fn invalid(&self) -> usize {
        self.total() - self.valid()
    }
}

#[derive(Debug, Clone)]
pub struct BatchRunner {
    workers: usize,
    cancel: CancelToken,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl BatchRunner {
    /// `workers` is clamped to at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Verifies every address. `make_verifier` runs once per rayon work split,
    /// so a verifier (resolver and probe included) is never shared between
    /// threads.
    pub fn run<F, V>(&self, addresses: &[String], make_verifier: F, sink: &dyn EventSink) -> BatchSummary
    where
        F: Fn() -> V + Sync,
        V: Verify,
    {
        let total = addresses.len();
        let workers = self.workers.min(total.max(1));
        tracing::info!(total, workers, "batch started");

        let completed = AtomicUsize::new(0);
        let verify_one = |verifier: &mut V, address: &String| {
            // addresses not yet started when the token flips are skipped
            if self.cancel.is_cancelled() {
                return None;
            }
            let result = verify_isolated(&*verifier, address, sink);
            let completed = completed.fetch_add(1, Ordering::SeqCst) + 1;
            sink.emit(&Event::Progress { completed, total });
            Some(result)
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("verify-{i}"))
            .build();
        let slots: Vec<Option<VerificationResult>> = match pool {
            Ok(pool) => pool.install(|| {
                addresses
                    .par_iter()
                    .map_init(&make_verifier, &verify_one)
                    .collect()
            }),
            Err(err) => {
                tracing::warn!(error = %err, "cannot build worker pool, verifying on the calling thread");
                let mut verifier = make_verifier();
                addresses
                    .iter()
                    .map(|address| verify_one(&mut verifier, address))
                    .collect()
            }
        };

        let results: Vec<VerificationResult> = slots.into_iter().flatten().collect();
        let cancelled = self.cancel.is_cancelled() && results.len() < total;
        let skipped = total - results.len();
        if cancelled {
            tracing::warn!(completed = results.len(), skipped, "batch cancelled");
        } else {
            tracing::info!(total, "batch finished");
        }

        BatchSummary {
            results,
            cancelled,
            skipped,
        }
    }
}

/// A panic inside one verification only costs that address its result.
fn verify_isolated<V: Verify>(verifier: &V, address: &str, sink: &dyn EventSink) -> VerificationResult {
    match panic::catch_unwind(AssertUnwindSafe(|| verifier.verify(address, sink))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = format!("verification aborted: {}", panic_message(payload.as_ref()));
            tracing::error!(address, %detail, "verification panicked");
            let result = VerificationResult::aborted(address, detail);
            sink.emit(&Event::Verified { result: &result });
            result
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
