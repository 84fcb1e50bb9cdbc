//! Address syntax validation and normalisation.

mod domain;
mod local;
mod types;

pub use types::{EmailError, NormalizedEmail, ValidationMode, ValidationReport};

use unicode_normalization::UnicodeNormalization;

use domain::{check_domain, normalize_domain};
use local::{is_local_relaxed, is_local_strict, is_quoted};

pub fn validate_email(email: &str, mode: ValidationMode) -> Result<ValidationReport, EmailError> {
    let input = email.trim();
    if input.is_empty() {
        return Err(EmailError::Empty);
    }

    let mut reasons = Vec::new();

    // RFC 5321: 254 max avec @
    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let Some((local, domain)) = split_address(input, mode) else {
        reasons.push("must contain exactly one '@'".to_string());
        return Ok(ValidationReport { ok: false, reasons });
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }

    check_domain(domain, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok && !local.is_empty() {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ok = reasons.is_empty();
    Ok(ValidationReport { ok, reasons })
}

/// Splits on the last `@`. A second `@` is only tolerated inside a quoted
/// local part in relaxed mode.
fn split_address(input: &str, mode: ValidationMode) -> Option<(&str, &str)> {
    let (local, domain) = input.rsplit_once('@')?;
    if local.contains('@') && !(mode == ValidationMode::Relaxed && is_quoted(local)) {
        return None;
    }
    Some((local, domain))
}

/// Valide et renvoie une sortie normalisée (local NFC, domaine en minuscules,
/// domaine ASCII).
pub fn normalize_email(email: &str, mode: ValidationMode) -> Result<NormalizedEmail, EmailError> {
    let report = validate_email(email, mode)?;
    let input = email.trim();
    // décomposer même si invalide pour normaliser ce qu'on peut
    let (local, domain) = input.rsplit_once('@').unwrap_or((input, ""));
    let (domain_lower, ascii_domain) = normalize_domain(domain);

    Ok(NormalizedEmail {
        original: email.to_string(),
        local: local.nfc().collect(),
        domain: domain_lower,
        ascii_domain,
        mode,
        valid: report.ok,
        reasons: report.reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn accepts_basic() {
        let r = validate_email("alice@example.com", ValidationMode::Strict).unwrap();
        assert!(r.ok, "{:?}", r.reasons);
    }

    #[test]
    fn rejects_double_at() {
        let r = validate_email("a@@b.com", ValidationMode::Strict).unwrap();
        assert!(!r.ok);
    }

    #[test]
    fn rejects_missing_at() {
        let r = validate_email("not-an-email", ValidationMode::Strict).unwrap();
        assert!(!r.ok);
        assert_eq!(r.reasons, vec!["must contain exactly one '@'".to_string()]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = validate_email("   ", ValidationMode::Strict).expect_err("empty");
        assert!(matches!(err, EmailError::Empty));
    }

    #[test]
    fn relaxed_accepts_quoted_local_with_at() {
        let r = validate_email("\"a@b\"@example.com", ValidationMode::Relaxed).unwrap();
        assert!(r.ok, "{:?}", r.reasons);
        let r = validate_email("\"a@b\"@example.com", ValidationMode::Strict).unwrap();
        assert!(!r.ok);
    }

    #[test]
    fn normalized_has_ascii_domain() {
        let n = normalize_email("alice@exämple.com", ValidationMode::Strict).unwrap();
        assert!(!n.ascii_domain.is_empty());
    }

    #[test]
    fn normalized_address_lowercases_domain_only() {
        let n = normalize_email(" Alice@Example.COM ", ValidationMode::Strict).unwrap();
        assert_eq!(n.local, "Alice");
        assert_eq!(n.domain, "example.com");
        assert_eq!(n.original, " Alice@Example.COM ");
    }

    #[test]
    fn invalid_address_has_no_canonical_form() {
        let n = normalize_email("bad@-example.com", ValidationMode::Strict).unwrap();
        assert!(!n.valid);
        assert!(!n.reason_text().is_empty());
    }
}
