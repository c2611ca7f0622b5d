//! Normalization of numeric identifiers.
//!
//! Proposal ids and counters reach the client in several shapes: machine
//! integers from decoded accounts, floating point numbers and decimal
//! strings from JSON, and wide integers from callers.  Every ingestion
//! boundary converts through [`Numeric`] so the "is this a valid `u64`"
//! decision is made in exactly one place.

use {
    serde::{de, Deserialize, Deserializer},
    serde_json::Value,
    std::fmt,
    thiserror::Error,
};

/// 2^64 as an `f64`; the first float that no longer fits in a `u64`.
const U64_LIMIT_F64: f64 = 18_446_744_073_709_551_616.0;

/// Why a value cannot be represented as a `u64`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("{0} is negative")]
    Negative(String),

    #[error("{0} is not an integer")]
    Fractional(String),

    #[error("{0} is not finite")]
    NonFinite(String),

    #[error("{0} does not fit in 64 bits")]
    TooLarge(String),

    #[error("{0:?} is not a number")]
    Unparseable(String),
}

/// A numeric value in any of the representations the client accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Unsigned(u128),
    Signed(i128),
    Float(f64),
    /// Decimal text of arbitrary length.
    Text(String),
}

impl Numeric {
    /// Convert to a `u64`, rejecting anything that would change the value.
    pub fn to_u64(&self) -> Result<u64, NumericError> {
        match self {
            Self::Unsigned(v) => u64::try_from(*v).map_err(|_| NumericError::TooLarge(v.to_string())),
            Self::Signed(v) => {
                if *v < 0 {
                    Err(NumericError::Negative(v.to_string()))
                } else {
                    u64::try_from(*v).map_err(|_| NumericError::TooLarge(v.to_string()))
                }
            }
            Self::Float(v) => float_to_u64(*v),
            Self::Text(text) => text_to_u64(text),
        }
    }
}

/// Serde adapter that reads a `u64` field through [`Numeric`], so `12`,
/// `12.0` and `"12"` all decode while `-1` or `1e20` are rejected.
pub fn deserialize_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Numeric::from(&value).to_u64().map_err(de::Error::custom)
}

fn float_to_u64(value: f64) -> Result<u64, NumericError> {
    if !value.is_finite() {
        return Err(NumericError::NonFinite(value.to_string()));
    }
    if value.fract() != 0.0 {
        return Err(NumericError::Fractional(value.to_string()));
    }
    if value < 0.0 {
        return Err(NumericError::Negative(value.to_string()));
    }
    if value >= U64_LIMIT_F64 {
        return Err(NumericError::TooLarge(value.to_string()));
    }
    Ok(value as u64)
}

fn text_to_u64(text: &str) -> Result<u64, NumericError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        // Arbitrary length: anything that fails to parse is out of range.
        return digits
            .parse::<u64>()
            .map_err(|_| NumericError::TooLarge(trimmed.to_string()));
    }
    if let Some(rest) = trimmed.strip_prefix('-') {
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            if rest.bytes().all(|b| b == b'0') {
                return Ok(0);
            }
            return Err(NumericError::Negative(trimmed.to_string()));
        }
    }
    match trimmed.parse::<f64>() {
        Ok(value) => float_to_u64(value),
        Err(_) => Err(NumericError::Unparseable(text.to_string())),
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Numeric {
            fn from(value: $t) -> Self {
                Self::Unsigned(value as u128)
            }
        }
    )*};
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Numeric {
            fn from(value: $t) -> Self {
                Self::Signed(value as i128)
            }
        }
    )*};
}

impl_from_unsigned!(u8, u16, u32, u64, u128, usize);
impl_from_signed!(i8, i16, i32, i64, i128, isize);

impl From<f64> for Numeric {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Numeric {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<&str> for Numeric {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Numeric {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&Value> for Numeric {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Self::Unsigned(u128::from(v))
                } else if let Some(v) = n.as_i64() {
                    Self::Signed(i128::from(v))
                } else {
                    // Finite by construction; serde_json has no NaN.
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<Value> for Numeric {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}
