use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Rounds a monetary value to cents, midpoint away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Adds `amount` into `total` unless the sum leaves the `Decimal` range.
/// Returns whether it was added.
///
/// Money arithmetic never panics. A value that would overflow is treated
/// like any other unreadable input: it contributes zero and the running
/// total stays as it was.
pub fn accumulate(total: &mut Decimal, amount: Decimal) -> bool {
    match total.checked_add(amount) {
        Some(sum) => {
            *total = sum;
            true
        }
        None => false,
    }
}

/// `rate` percent of `base`, or `None` when the product is out of range.
pub fn percent_of(base: Decimal, rate: Decimal) -> Option<Decimal> {
    base.checked_mul(rate)?.checked_div(Decimal::ONE_HUNDRED)
}

/// Reads a number the way a form field is read: blank or unreadable text is
/// zero, and trailing garbage after a numeric prefix is ignored (`"12kg"` is 12).
/// Scientific notation outside the `Decimal` range is unreadable, not its mantissa.
pub fn parse_amount(text: &str) -> Decimal {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Decimal::ZERO;
    }

    if let Ok(value) = Decimal::from_str(trimmed) {
        return value;
    }
    if let Ok(value) = Decimal::from_scientific(trimmed) {
        return value;
    }
    if is_scientific(trimmed) {
        return Decimal::ZERO;
    }

    let prefix = numeric_prefix(trimmed);
    Decimal::from_str(prefix).unwrap_or(Decimal::ZERO)
}

fn is_scientific(text: &str) -> bool {
    let Some((mantissa, exponent)) = text.split_once(['e', 'E']) else {
        return false;
    };
    let exponent = exponent.strip_prefix(['-', '+']).unwrap_or(exponent);
    !numeric_prefix(mantissa).is_empty()
        && numeric_prefix(mantissa).len() == mantissa.len()
        && !exponent.is_empty()
        && exponent.bytes().all(|b| b.is_ascii_digit())
}

fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;

    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }

    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return "";
    }
    text[..end].trim_end_matches('.')
}

/// A user-entered numeric field. Accepts JSON numbers, numeric strings, blank
/// strings and null; anything unreadable becomes zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn parse(text: &str) -> Self {
        Self(parse_amount(text))
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(number) => Self::parse(&number.to_string()),
            Value::String(text) => Self::parse(text),
            _ => Self::ZERO,
        }
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    /// Negative input is treated as unreadable.
    pub fn non_negative(self) -> Decimal {
        self.0.max(Decimal::ZERO)
    }

    pub fn clamp_percent(self) -> Decimal {
        self.0.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&raw))
    }
}
