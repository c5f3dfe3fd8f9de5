//! Place identifiers and their string projections.
//!
//! A place (castle, fortress...) is identified by a kingdom, a region and a
//! continent index. The server names it either `kingdom-region-index` (KRIDX)
//! or `region-index` (RIDX) depending on the endpoint and the api version.
//! This module normalizes both forms.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::wd::lenient;

/// Errors raised when an identifier cannot be normalized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier is neither `kingdom-region-index` nor `region-index`.
    #[error("malformed place identifier {0:?}")]
    Malformed(String),
    /// The identifier already names a kingdom, and not the expected one.
    #[error("place identifier {id:?} does not belong to kingdom {kingdom_id}")]
    KingdomMismatch { id: String, kingdom_id: i64 },
}

/// Structured identifier of a place.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceId {
    /// Kingdom the place belongs to
    #[serde(rename = "k_id", deserialize_with = "lenient::integer")]
    pub kingdom_id: i64,
    /// Region identifier, e.g. `A0`
    pub region_id: String,
    /// Index of the place in its region
    #[serde(deserialize_with = "lenient::integer")]
    pub cont_idx: i64,
}

impl PlaceId {
    /// Returns the identifier as `{kingdom}-{region}-{index}`.
    pub fn kridx(&self) -> String {
        format!("{}-{}-{}", self.kingdom_id, self.region_id, self.cont_idx)
    }

    /// Returns the identifier as `{region}-{index}`.
    pub fn ridx(&self) -> String {
        format!("{}-{}", self.region_id, self.cont_idx)
    }

    /// Parses a `{kingdom}-{region}-{index}` identifier.
    pub fn parse_kridx(id: &str) -> Result<Self, IdError> {
        match Segments::parse(id)? {
            Segments {
                kingdom_id: Some(kingdom_id),
                region_id,
                cont_idx,
            } => Ok(PlaceId {
                kingdom_id,
                region_id: region_id.to_string(),
                cont_idx,
            }),
            _ => Err(IdError::Malformed(id.to_string())),
        }
    }

    /// Parses an identifier of either form, using `kingdom_id` when the
    /// identifier does not carry its kingdom.
    pub fn parse_ridx(id: &str, kingdom_id: i64) -> Result<Self, IdError> {
        let segments = Segments::parse(id)?;
        match segments.kingdom_id {
            Some(k) if k != kingdom_id => Err(IdError::KingdomMismatch {
                id: id.to_string(),
                kingdom_id,
            }),
            _ => Ok(PlaceId {
                kingdom_id,
                region_id: segments.region_id.to_string(),
                cont_idx: segments.cont_idx,
            }),
        }
    }
}

/// Same as [`PlaceId::kridx`].
impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.kridx())
    }
}

/// Validated pieces of a textual identifier.
struct Segments<'a> {
    kingdom_id: Option<i64>,
    region_id: &'a str,
    cont_idx: i64,
}

impl<'a> Segments<'a> {
    fn parse(id: &'a str) -> Result<Self, IdError> {
        let malformed = || IdError::Malformed(id.to_string());
        let parts: Vec<&str> = id.split('-').collect();

        let (kingdom_id, region_id, cont_idx) = match parts.as_slice() {
            [region, idx] => (None, *region, *idx),
            [kingdom, region, idx] => (
                Some(kingdom.parse::<i64>().map_err(|_| malformed())?),
                *region,
                *idx,
            ),
            _ => return Err(malformed()),
        };

        if region_id.is_empty() {
            return Err(malformed());
        }
        let cont_idx = cont_idx.parse::<i64>().map_err(|_| malformed())?;

        Ok(Segments {
            kingdom_id,
            region_id,
            cont_idx,
        })
    }
}

/// Ensures that the identifier is prefixed with its kingdom.
///
/// `A0-1` becomes `5-A0-1` for kingdom 5, `5-A0-0` is returned unchanged.
/// Applying it twice gives the same result as once. Numeric segments are
/// written in canonical form, `A0-05` becomes `5-A0-5`.
///
/// # Errors
///
/// * [`IdError::Malformed`] - the identifier has neither 2 nor 3 segments
/// * [`IdError::KingdomMismatch`] - the identifier names another kingdom
///
/// # Examples
///
/// ```
/// use wdapi::wd::ensure_kridx;
///
/// assert_eq!(ensure_kridx("A0-1", 5).unwrap(), "5-A0-1");
/// assert_eq!(ensure_kridx("5-A0-0", 5).unwrap(), "5-A0-0");
/// ```
pub fn ensure_kridx(id: &str, kingdom_id: i64) -> Result<String, IdError> {
    PlaceId::parse_ridx(id, kingdom_id).map(|place| place.kridx())
}

/// Ensures that the identifier is not prefixed with its kingdom.
///
/// `5-A0-0` becomes `A0-0`, `A0-1` is returned unchanged. The index is
/// written in canonical form, `A0-05` becomes `A0-5`.
///
/// # Errors
///
/// [`IdError::Malformed`] when the identifier has neither 2 nor 3 segments
/// or when its kingdom or index is not a number.
pub fn ensure_ridx(id: &str) -> Result<String, IdError> {
    let segments = Segments::parse(id)?;
    Ok(format!("{}-{}", segments.region_id, segments.cont_idx))
}

/// Rewrites the keys of `map` as KRIDX identifiers of `kingdom_id`.
///
/// Fails on the first key that cannot be normalized.
pub fn rekey_kridx<V>(
    map: HashMap<String, V>,
    kingdom_id: i64,
) -> Result<HashMap<String, V>, IdError> {
    map.into_iter()
        .map(|(id, value)| ensure_kridx(&id, kingdom_id).map(|id| (id, value)))
        .collect()
}
