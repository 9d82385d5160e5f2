//! Input normalization shared by the edge and the admission coordinator.

use std::collections::HashSet;

use crate::error::AdmissionError;

const MAX_HEADER_LENGTH: usize = 128;
const CURRENCY_CODE_LENGTH: usize = 3;

/// Trim and validate a required header-borne identifier.
pub fn require_identifier(value: Option<&str>, field: &str) -> Result<String, AdmissionError> {
    let normalized = value.map(str::trim).unwrap_or_default();
    if normalized.is_empty() {
        return Err(AdmissionError::Validation(format!(
            "Missing required header: {field}"
        )));
    }
    if normalized.len() > MAX_HEADER_LENGTH {
        return Err(AdmissionError::Validation(format!("Header too long: {field}")));
    }
    Ok(normalized.to_string())
}

/// Uppercase the currency and check it against the configured supported set.
pub fn ensure_supported_currency(
    currency: &str,
    supported: &HashSet<String>,
) -> Result<String, AdmissionError> {
    let normalized = currency.trim().to_uppercase();
    if normalized.len() != CURRENCY_CODE_LENGTH {
        return Err(AdmissionError::Validation(format!(
            "Invalid currency code length: {normalized}"
        )));
    }
    if !supported.contains(&normalized) {
        return Err(AdmissionError::Validation(format!(
            "Unsupported currency: {normalized}"
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currencies() -> HashSet<String> {
        ["BRL", "USD"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identifiers_are_trimmed() {
        assert_eq!(
            require_identifier(Some("  merchant-1  "), "X-Merchant-Id").unwrap(),
            "merchant-1"
        );
    }

    #[test]
    fn empty_or_missing_identifier_is_a_validation_error() {
        assert!(require_identifier(None, "X-Merchant-Id").is_err());
        assert!(require_identifier(Some("   "), "X-Merchant-Id").is_err());
    }

    #[test]
    fn oversized_identifier_is_rejected() {
        let long = "a".repeat(129);
        assert!(require_identifier(Some(&long), "Idempotency-Key").is_err());
        let exact = "a".repeat(128);
        assert!(require_identifier(Some(&exact), "Idempotency-Key").is_ok());
    }

    #[test]
    fn currency_is_uppercased_and_checked() {
        assert_eq!(ensure_supported_currency("brl", &currencies()).unwrap(), "BRL");
        assert!(ensure_supported_currency("EUR", &currencies()).is_err());
        assert!(ensure_supported_currency("BRLX", &currencies()).is_err());
    }
}
