//! Phone number normalization.
//!
//! Users are identified by the `(country_code, local_number)` pair, never by
//! the raw string a client typed. Raw input is reduced to digits: ten digits
//! is a US domestic number, anything longer carries a country-code prefix in
//! front of the last ten digits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

const LOCAL_NUMBER_LEN: usize = 10;
const US_COUNTRY_CODE: &str = "1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    #[error("phone number is empty")]
    Empty,

    #[error("phone number '{0}' has fewer than 10 digits")]
    TooShort(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// ISO country ("US"), empty when the code isn't one we map.
    pub country: String,
    pub country_code: String,
    pub local_number: String,
}

impl PhoneNumber {
    pub fn us(local_number: impl Into<String>) -> Self {
        Self {
            country: "US".to_string(),
            country_code: US_COUNTRY_CODE.to_string(),
            local_number: local_number.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, PhoneNumberError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

        if digits.is_empty() {
            return Err(PhoneNumberError::Empty);
        }
        if digits.len() < LOCAL_NUMBER_LEN {
            return Err(PhoneNumberError::TooShort(raw.to_string()));
        }
        if digits.len() == LOCAL_NUMBER_LEN {
            return Ok(Self::us(digits));
        }

        let (country_code, local_number) = digits.split_at(digits.len() - LOCAL_NUMBER_LEN);
        Ok(Self {
            country: country_for_code(country_code).to_string(),
            country_code: country_code.to_string(),
            local_number: local_number.to_string(),
        })
    }

    /// E.164 form used by the SMS gateway, e.g. `+15551234567`.
    pub fn full_number(&self) -> String {
        format!("+{}{}", self.country_code, self.local_number)
    }
}

// Identity is the (country_code, local_number) pair.
impl PartialEq for PhoneNumber {
    fn eq(&self, other: &Self) -> bool {
        self.country_code == other.country_code && self.local_number == other.local_number
    }
}

impl Eq for PhoneNumber {}

impl Hash for PhoneNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.country_code.hash(state);
        self.local_number.hash(state);
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_number())
    }
}

fn country_for_code(code: &str) -> &'static str {
    match code {
        "1" => "US",
        "52" => "MX",
        "502" => "GT",
        "503" => "SV",
        "504" => "HN",
        "57" => "CO",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digits_is_us_domestic() {
        let phone = PhoneNumber::parse("5551234567").unwrap();
        assert_eq!(phone.country, "US");
        assert_eq!(phone.country_code, "1");
        assert_eq!(phone.local_number, "5551234567");
        assert_eq!(phone.full_number(), "+15551234567");
    }

    #[test]
    fn formatting_characters_are_ignored() {
        let phone = PhoneNumber::parse("(555) 123-4567").unwrap();
        assert_eq!(phone, PhoneNumber::us("5551234567"));
    }

    #[test]
    fn longer_numbers_carry_a_country_code() {
        let phone = PhoneNumber::parse("+52 555 123 4567").unwrap();
        assert_eq!(phone.country_code, "52");
        assert_eq!(phone.local_number, "5551234567");
        assert_eq!(phone.country, "MX");

        let us = PhoneNumber::parse("+1 555 123 4567").unwrap();
        assert_eq!(us, PhoneNumber::us("5551234567"));
    }

    #[test]
    fn short_numbers_are_rejected() {
        assert_eq!(
            PhoneNumber::parse("12345"),
            Err(PhoneNumberError::TooShort("12345".to_string()))
        );
        assert_eq!(PhoneNumber::parse("  "), Err(PhoneNumberError::Empty));
    }

    #[test]
    fn equality_ignores_country_label() {
        let mut a = PhoneNumber::us("5551234567");
        a.country = String::new();
        assert_eq!(a, PhoneNumber::us("5551234567"));
    }
}
