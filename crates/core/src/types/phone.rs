//! Normalized phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty (or contains no digits).
    #[error("phone number cannot be empty")]
    Empty,
    /// The digits are too few to be a subscriber number.
    #[error("phone number must contain at least {min} digits")]
    TooShort {
        /// Minimum number of digits.
        min: usize,
    },
    /// The digits do not match a recognizable local pattern.
    #[error("phone number must start with the country code 90 or the mobile prefix 5")]
    UnrecognizedPrefix,
}

/// A phone number normalized to digits only.
///
/// Non-digit characters (spaces, dashes, parentheses, a leading `+`) are
/// stripped on parse. The remaining digits must look like a Turkish mobile
/// subscriber: either prefixed with the country code `90` or starting with
/// the domestic mobile prefix `5`.
///
/// ## Examples
///
/// ```
/// use doorstep_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("+90 555 123 45 67").unwrap();
/// assert_eq!(phone.as_str(), "905551234567");
///
/// let phone = PhoneNumber::parse("5551234567").unwrap();
/// assert_eq!(phone.with_country_prefix(), "+905551234567");
///
/// assert!(PhoneNumber::parse("").is_err());
/// assert!(PhoneNumber::parse("1-800-555-0100").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum number of digits in a subscriber number.
    pub const MIN_DIGITS: usize = 10;

    /// Parse a `PhoneNumber` from a string, stripping non-digit characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Contains no digits
    /// - Has fewer than 10 digits
    /// - Does not start with `90` or `5` after normalization
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        if digits.len() < Self::MIN_DIGITS {
            return Err(PhoneError::TooShort {
                min: Self::MIN_DIGITS,
            });
        }

        if !digits.starts_with("90") && !digits.starts_with('5') {
            return Err(PhoneError::UnrecognizedPrefix);
        }

        Ok(Self(digits))
    }

    /// Returns the normalized digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PhoneNumber` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the number in international form with the `+90` country
    /// prefix, adding it if the digits are domestic-only.
    #[must_use]
    pub fn with_country_prefix(&self) -> String {
        if self.0.starts_with("90") {
            format!("+{}", self.0)
        } else {
            format!("+90{}", self.0)
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed normalized
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_formatting() {
        let phone = PhoneNumber::parse("+90 (555) 123-45-67").unwrap();
        assert_eq!(phone.as_str(), "905551234567");

        let phone = PhoneNumber::parse("0555 123 45 67").is_err();
        assert!(phone, "leading trunk zero is not a recognized prefix");
    }

    #[test]
    fn test_parse_domestic() {
        let phone = PhoneNumber::parse("5551234567").unwrap();
        assert_eq!(phone.as_str(), "5551234567");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(PhoneNumber::parse(""), Err(PhoneError::Empty)));
        assert!(matches!(PhoneNumber::parse("abc"), Err(PhoneError::Empty)));
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            PhoneNumber::parse("555123"),
            Err(PhoneError::TooShort { .. })
        ));
    }

    #[test]
    fn test_parse_unrecognized_prefix() {
        assert!(matches!(
            PhoneNumber::parse("1800555010"),
            Err(PhoneError::UnrecognizedPrefix)
        ));
    }

    #[test]
    fn test_with_country_prefix() {
        let domestic = PhoneNumber::parse("5551234567").unwrap();
        assert_eq!(domestic.with_country_prefix(), "+905551234567");

        let international = PhoneNumber::parse("905551234567").unwrap();
        assert_eq!(international.with_country_prefix(), "+905551234567");
    }

    #[test]
    fn test_serde_roundtrip() {
        let phone = PhoneNumber::parse("5551234567").unwrap();
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"5551234567\"");

        let parsed: PhoneNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, phone);
    }
}
