use std::cell::OnceCell;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
    system_conf::read_system_conf,
};

use super::{Error, MxRecord, MxStatus};

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);

/// Lookup MX records for `domain` with a fresh resolver bounded by `timeout`.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] contains the sorted list of records (ascending preference).
pub fn check_mx(domain: &str, timeout: Duration) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = DnsMxResolver::new(timeout);
    resolve_with(&resolver, &ascii)
}

pub fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx + ?Sized,
{
    let mut records = resolver.lookup_mx(ascii_domain)?;

    records.sort();
    records.dedup();

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// Source of MX records. "No records" answers are `Ok(vec![])`, everything
/// else the resolver reports is an error.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error>;
}

/// System-configured DNS resolver whose per-query timeout is fixed at
/// construction. The underlying resolver is built on first use; a build
/// failure surfaces as [`Error::ResolverInit`] and is retried on the next
/// lookup.
pub struct DnsMxResolver {
    timeout: Duration,
    inner: OnceCell<Resolver>,
}

impl DnsMxResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: OnceCell::new(),
        }
    }

    fn resolver(&self) -> Result<&Resolver, Error> {
        if let Some(resolver) = self.inner.get() {
            return Ok(resolver);
        }
        let resolver = build_resolver(self.timeout)?;
        Ok(self.inner.get_or_init(|| resolver))
    }
}

impl std::fmt::Debug for DnsMxResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsMxResolver")
            .field("timeout", &self.timeout)
            .field("initialized", &self.inner.get().is_some())
            .finish()
    }
}

fn build_resolver(timeout: Duration) -> Result<Resolver, Error> {
    let (config, mut opts) = match read_system_conf() {
        Ok(pair) => pair,
        Err(err) => {
            tracing::warn!(error = %err, "system resolver configuration unavailable, using defaults");
            (ResolverConfig::default(), ResolverOpts::default())
        }
    };
    // one attempt so the configured timeout bounds the whole lookup
    opts.timeout = timeout;
    opts.attempts = 1;
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

impl LookupMx for DnsMxResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        let resolver = self.resolver()?;
        let lookup = match resolver.mx_lookup(domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(Error::lookup(err)),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

impl<T: LookupMx + ?Sized> LookupMx for &T {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        (**self).lookup_mx(domain)
    }
}
