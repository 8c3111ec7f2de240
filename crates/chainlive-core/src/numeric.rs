//! Lenient wide-integer parsing.
//!
//! Chain values (block numbers, gas, wei amounts) arrive as decimal strings
//! and are stored as [`U256`]. A value that cannot be parsed becomes zero:
//! one bad field must never take down the whole event.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serializer};

/// Parse a decimal (or `0x`-prefixed hex) string into a [`U256`].
///
/// Empty, negative, overflowing or otherwise malformed input yields zero.
pub fn parse_u256(raw: &str) -> U256 {
    let trimmed = raw.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    if digits.is_empty() {
        return U256::ZERO;
    }
    match U256::from_str_radix(digits, radix) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(raw, error = ?e, "unparsable wide integer, coercing to zero");
            U256::ZERO
        }
    }
}

/// Anything the wire may put in a numeric slot.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireNumber {
    Str(String),
    Int(u64),
    Float(f64),
    Other(serde::de::IgnoredAny),
}

impl WireNumber {
    fn into_u256(self) -> U256 {
        match self {
            Self::Str(s) => parse_u256(&s),
            Self::Int(n) => U256::from(n),
            Self::Float(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => {
                U256::from(f as u64)
            }
            Self::Float(f) => {
                tracing::debug!(value = f, "non-integral wide integer, coercing to zero");
                U256::ZERO
            }
            Self::Other(_) => U256::ZERO,
        }
    }
}

/// `serde(with = "lenient_u256")` for required wide-integer fields.
///
/// Serializes as a decimal string, the same encoding the wire uses.
pub mod lenient_u256 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        Ok(WireNumber::deserialize(deserializer)?.into_u256())
    }
}

/// `serde(with = "lenient_u256_opt")` for optional wide-integer fields.
///
/// `null` and a missing field are `None`; a present-but-bad value is `Some(0)`.
pub mod lenient_u256_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Ok(Option::<WireNumber>::deserialize(deserializer)?.map(WireNumber::into_u256))
    }
}
