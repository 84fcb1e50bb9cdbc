use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

impl CheckStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed { Self::Pass } else { Self::Fail }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one address. The overall verdict is not stored: see
/// [`VerificationResult::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub address: String,
    pub normalized_address: Option<String>,
    pub syntax_valid: bool,
    pub mx_check: CheckStatus,
    pub smtp_check: CheckStatus,
    pub is_disposable: bool,
    /// Explanation of the first fatal failure.
    pub error_detail: Option<String>,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.mx_check == CheckStatus::Pass
            && self.smtp_check == CheckStatus::Pass
            && !self.is_disposable
    }

    /// The disposable check only runs once MX passed.
    pub fn disposable_checked(&self) -> bool {
        self.mx_check == CheckStatus::Pass
    }

    pub(crate) fn syntax_failure(address: &str, reason: String) -> Self {
        Self {
            address: address.to_string(),
            normalized_address: None,
            syntax_valid: false,
            mx_check: CheckStatus::Skipped,
            smtp_check: CheckStatus::Skipped,
            is_disposable: false,
            error_detail: Some(reason),
        }
    }

    pub(crate) fn mx_failure(address: &str, normalized: String) -> Self {
        Self {
            address: address.to_string(),
            normalized_address: Some(normalized),
            syntax_valid: true,
            mx_check: CheckStatus::Fail,
            smtp_check: CheckStatus::Skipped,
            is_disposable: false,
            error_detail: Some(super::NO_MX_RECORDS.to_string()),
        }
    }

    pub(crate) fn completed(
        address: &str,
        normalized: String,
        smtp_check: CheckStatus,
        is_disposable: bool,
    ) -> Self {
        Self {
            address: address.to_string(),
            normalized_address: Some(normalized),
            syntax_valid: true,
            mx_check: CheckStatus::Pass,
            smtp_check,
            is_disposable,
            error_detail: None,
        }
    }

    /// Placeholder for an address whose verification panicked.
    pub(crate) fn aborted(address: &str, detail: String) -> Self {
        Self {
            address: address.to_string(),
            normalized_address: None,
            syntax_valid: false,
            mx_check: CheckStatus::Skipped,
            smtp_check: CheckStatus::Skipped,
            is_disposable: false,
            error_detail: Some(detail),
        }
    }
}
