//! Structural IBAN checks
//!
//! Only the shape is verified: two-letter country code, two check digits and
//! a 1-30 character alphanumeric BBAN. The mod-97 checksum is not computed.

use std::sync::OnceLock;

use regex::Regex;

use super::result::{Error, Result};

fn iban_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z0-9]{1,30}$").expect("IBAN pattern is valid")
    })
}

/// Normalize an IBAN (strip spaces, uppercase) and check its structure
pub fn normalize_iban(raw: &str) -> Result<String> {
    let iban: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if iban.is_empty() {
        return Err(Error::validation("iban", "IBAN is required"));
    }
    if !iban_pattern().is_match(&iban) {
        return Err(Error::validation("iban", "Invalid IBAN format"));
    }
    Ok(iban)
}
