//! Decoding of numeric fields sent either as JSON numbers or as strings.
//!
//! Depending on the api version the server sends the same field as `12` or as
//! `"12"`. The adapters below accept both encodings and reject anything else,
//! an unparsable value is a decoding error and never becomes zero.
//!
//! ```
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Level {
//!     #[serde(deserialize_with = "wdapi::wd::lenient::integer")]
//!     level: i64,
//! }
//!
//! let a: Level = serde_json::from_str(r#"{"level": 12}"#).unwrap();
//! let b: Level = serde_json::from_str(r#"{"level": "12"}"#).unwrap();
//! assert_eq!(a.level, b.level);
//! ```

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// A finite number decoded from a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LenientNumber(pub f64);

/// An integer decoded from a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LenientInt(pub i64);

struct NumberVisitor;

impl Visitor<'_> for NumberVisitor {
    type Value = LenientNumber;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a string containing a number")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() {
            Ok(LenientNumber(v))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientNumber(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(LenientNumber(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match v.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(LenientNumber(n)),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

impl<'de> Deserialize<'de> for LenientNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumberVisitor)
    }
}

struct IntVisitor;

impl Visitor<'_> for IntVisitor {
    type Value = LenientInt;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an integer or a string containing an integer")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(LenientInt(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(LenientInt)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    // `12.0` is accepted, `12.5` is not
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
            Ok(LenientInt(v as i64))
        } else {
            Err(E::invalid_value(de::Unexpected::Float(v), &self))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<i64>()
            .map(LenientInt)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for LenientInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IntVisitor)
    }
}

/// `deserialize_with` helper for `f64` fields.
pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    LenientNumber::deserialize(deserializer).map(|n| n.0)
}

/// `deserialize_with` helper for `i64` fields.
pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    LenientInt::deserialize(deserializer).map(|n| n.0)
}

/// `deserialize_with` helper for optional `i64` fields, `null` decodes to `None`.
///
/// Pair it with `#[serde(default)]` so a missing field is `None` as well.
pub fn option_integer<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<LenientInt>::deserialize(deserializer).map(|n| n.map(|n| n.0))
}
