use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::entity;

/// Catalog entry as exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Server-assigned identifier
    pub id: i32,
    /// Title of the book, unique across the catalog
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Genre, empty when not provided
    pub genre: String,
    /// Price with two fractional digits, serialized as a string
    pub price: Price,
}

impl From<entity::Model> for Book {
    fn from(model: entity::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            genre: model.genre,
            price: Price::from_cents(model.price_cents),
        }
    }
}

/// Monetary amount held as whole cents.
///
/// Valid prices lie in `0.00..=9999.99`; parsing enforces the range and the
/// two-digit precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

const MAX_WHOLE_DIGITS: usize = 4;
const MAX_DECIMAL_PLACES: usize = 2;

impl Price {
    pub const MAX: Price = Price { cents: 999_999 };

    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }
}

/// Reasons a price string is rejected, worded for API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,
    #[error("Ensure that there are no more than 4 digits before the decimal point.")]
    TooManyWholeDigits,
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
}

impl FromStr for Price {
    type Err = PriceError;

    /// Parses plain or exponent notation (`"12.50"`, `"1e3"`, `"1.5E-1"`).
    ///
    /// Precision is judged on the value as written: `"1.500"` has three
    /// decimal places, `"1.50e1"` has one.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (negative, unsigned) = match raw.as_bytes().first() {
            Some(b'-') => (true, &raw[1..]),
            Some(b'+') => (false, &raw[1..]),
            _ => (false, raw),
        };

        let (mantissa, exponent) = match unsigned.split_once(|c: char| c == 'e' || c == 'E') {
            Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)?),
            None => (unsigned, 0),
        };

        let (whole, fraction) = match mantissa.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (mantissa, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(PriceError::Invalid);
        }

        // value = digits * 10^scale
        let digits = format!("{whole}{fraction}");
        let digits = digits.trim_start_matches('0');
        let scale = exponent.saturating_sub(fraction.len() as i64);

        let decimal_places = scale.min(0).unsigned_abs();
        let whole_digits = (digits.len() as i64).saturating_add(scale).max(0) as u64;

        if decimal_places > MAX_DECIMAL_PLACES as u64 {
            return Err(PriceError::TooManyDecimalPlaces);
        }
        if !digits.is_empty() && whole_digits > MAX_WHOLE_DIGITS as u64 {
            return Err(PriceError::TooManyWholeDigits);
        }

        // At most six significant digits remain, shifted into cents.
        let cents = if digits.is_empty() {
            0
        } else {
            let value: i64 = digits.parse().map_err(|_| PriceError::Invalid)?;
            value * 10_i64.pow((scale + MAX_DECIMAL_PLACES as i64) as u32)
        };

        if negative && cents != 0 {
            return Err(PriceError::Negative);
        }

        Ok(Self { cents })
    }
}

fn parse_exponent(raw: &str) -> Result<i64, PriceError> {
    let digits = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::Invalid);
    }
    // Exponents beyond i64 are out of range either way.
    Ok(raw.parse().unwrap_or(if raw.starts_with('-') { i64::MIN } else { i64::MAX }))
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
