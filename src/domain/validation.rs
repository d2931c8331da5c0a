//! Field validation shared by the mutator and the console.

use crate::domain::{DomainError, Lead, LeadPatch, LeadStatus};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";

/// Basic `local@domain.tld` check, case-insensitive.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(&email.to_lowercase())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(DomainError::validation("email", INVALID_EMAIL_MESSAGE))
    }
}

/// Checks a patch against the lead it targets.
///
/// `Converted` is reachable only through conversion and is terminal, so a patch
/// may carry it only when the lead is already converted.
pub fn validate_patch(lead: &Lead, patch: &LeadPatch) -> Result<(), DomainError> {
    if let Some(email) = &patch.email {
        validate_email(email)?;
    }
    match patch.status {
        Some(status) if status == lead.status => Ok(()),
        Some(LeadStatus::Converted) => Err(DomainError::validation(
            "status",
            "Use conversion to mark a lead as Converted",
        )),
        Some(_) if lead.status == LeadStatus::Converted => Err(DomainError::validation(
            "status",
            "A converted lead cannot change status",
        )),
        _ => Ok(()),
    }
}

pub fn validate_amount(amount: Option<f64>) -> Result<(), DomainError> {
    match amount {
        Some(value) if !value.is_finite() || value < 0.0 => Err(DomainError::validation(
            "amount",
            "Amount must be a non-negative number",
        )),
        _ => Ok(()),
    }
}

/// Parses the free-text amount field. Blank input means "no amount".
pub fn parse_amount(input: &str) -> Result<Option<f64>, DomainError> {
    let trimmed = input.trim().trim_start_matches('$').replace(',', "");
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| DomainError::validation("amount", "Amount must be a number"))?;
    validate_amount(Some(value))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(status: LeadStatus) -> Lead {
        Lead {
            id: "L1".into(),
            name: "Ada".into(),
            company: "Acme".into(),
            email: "a@b.com".into(),
            source: "Web".into(),
            score: 80,
            status,
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("First.Last@Sub.Example.ORG"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_validate_patch_rejects_bad_email() {
        let err = validate_patch(&lead(LeadStatus::New), &LeadPatch::email("nope")).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "email", .. }));
        assert_eq!(err.to_string(), INVALID_EMAIL_MESSAGE);
    }

    #[test]
    fn test_validate_patch_converted_rules() {
        assert!(
            validate_patch(&lead(LeadStatus::New), &LeadPatch::status(LeadStatus::Converted))
                .is_err()
        );
        assert!(
            validate_patch(&lead(LeadStatus::Converted), &LeadPatch::status(LeadStatus::New))
                .is_err()
        );
        let keep = LeadPatch {
            email: Some("new@b.com".into()),
            status: Some(LeadStatus::Converted),
        };
        assert!(validate_patch(&lead(LeadStatus::Converted), &keep).is_ok());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("").unwrap(), None);
        assert_eq!(parse_amount("1000").unwrap(), Some(1000.0));
        assert_eq!(parse_amount("$1,250.50").unwrap(), Some(1250.5));
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("abc").is_err());
    }
}
