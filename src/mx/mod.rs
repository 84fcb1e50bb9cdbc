//! DNS MX resolution.
//!
//! [`check_mx`] performs a one-off lookup; the pipeline holds a
//! [`DnsMxResolver`] per worker and goes through the [`LookupMx`] trait so
//! tests can substitute a stub.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{DEFAULT_DNS_TIMEOUT, DnsMxResolver, LookupMx, check_mx, resolve_with};
pub use types::{MxRecord, MxStatus};
