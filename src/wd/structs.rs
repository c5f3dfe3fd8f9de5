//! Value types shared by several API responses.

use std::fmt;

use serde::Deserialize;

use crate::wd::lenient;

/// Map coordinates of a place, in server units.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Coords {
    #[serde(deserialize_with = "lenient::number")]
    pub x: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub y: f64,
}

/// Displays the coordinates as shown on the in-game map.
impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "X:{:.1} Y:{:.1}", self.x / 40.0, self.y / -40.0)
    }
}

/// Tier names, indexed by the tier digit ending a primarch type minus one.
const PRIMARCH_TIERS: [&str; 5] = ["Bronze", "Silver 1", "Silver 2", "Gold 1", "Gold 2"];

/// Display name of a primarch type, without its tier digit.
fn primarch_type_name(dtype: &str) -> Option<&'static str> {
    match dtype {
        "rusher" => Some("Trapper"),
        "taunter" => Some("Taunter"),
        "destroyer" => Some("Destroyer"),
        "sieger" => Some("Sieger"),
        _ => None,
    }
}

/// Defender of a place, either a primarch or the fort garrison.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Primarch {
    /// Type followed by an optional tier digit, e.g. `sieger5`, or `garrison`
    pub dtype: String,
    #[serde(deserialize_with = "lenient::integer")]
    pub level: i64,
}

impl Primarch {
    /// Splits the type into its name and tier. A type without a tier digit is tier 1.
    fn type_and_tier(&self) -> (&str, u32) {
        match self.dtype.chars().last().and_then(|c| c.to_digit(10)) {
            Some(tier) => (&self.dtype[..self.dtype.len() - 1], tier),
            None => (self.dtype.as_str(), 1),
        }
    }
}

/// Displays `Fort level 15`, `LVL 25 Gold 2 Sieger` or `Unknown: <dtype>`.
impl fmt::Display for Primarch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.dtype == "garrison" {
            return write!(f, "Fort level {}", self.level);
        }

        let (dtype, tier) = self.type_and_tier();
        let tier_name = (tier as usize)
            .checked_sub(1)
            .and_then(|i| PRIMARCH_TIERS.get(i));

        match (tier_name, primarch_type_name(dtype)) {
            (Some(tier_name), Some(type_name)) => {
                write!(f, "LVL {} {} {}", self.level, tier_name, type_name)
            }
            _ => write!(f, "Unknown: {}", self.dtype),
        }
    }
}
