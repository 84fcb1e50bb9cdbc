//! Disposable / throwaway domain screening.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

/// Throwaway mailbox providers shipped by `mailchecker`, all lower-case.
static BUILTIN: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| mailchecker::blacklist().into_iter().collect());

/// Immutable disposable-domain set: the compiled-in list plus any extra
/// domains loaded once at startup. Share it by reference across workers.
#[derive(Debug, Clone, Default)]
pub struct DisposableDomains {
    extra: HashSet<String>,
}

impl DisposableDomains {
    /// Only the compiled-in list.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_extra<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = domains
            .into_iter()
            .map(|d| canonical(d.as_ref()))
            .filter(|d| !d.is_empty())
            .collect();
        Self { extra }
    }

    /// Compiled-in list extended with a newline-separated file. Blank lines
    /// and `#` comments are ignored.
    pub fn load_extra(path: &Path) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        let domains = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        Ok(Self::with_extra(domains))
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        let key = canonical(domain);
        BUILTIN.contains(key.as_str()) || self.extra.contains(&key)
    }

    pub fn len(&self) -> usize {
        BUILTIN.len() + self.extra.iter().filter(|d| !BUILTIN.contains(d.as_str())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn canonical(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}
