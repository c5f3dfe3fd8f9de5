//! War Dragons game server API client.
//!
//! This module provides the authenticated request pipeline and the decoding
//! layer that turns the server's JSON answers into typed structures.
//!
//! # Modules
//!
//! - `signature` - Per request signature and authentication headers
//! - `requester` - HTTP client executing signed requests and the endpoint functions
//! - `place_id` - Castle/place identifiers and their KRIDX/RIDX projections
//! - `time` - The two timestamp encodings used by the server
//! - `lenient` - Decoding of numbers sent either as JSON numbers or strings
//! - `response_structs` - Structures for the API responses
//! - `structs` - Shared value types (coordinates, primarchs)
//!
//! # Examples
//!
//! ```no_run
//! use wdapi::wd::{Requester, WdRequester};
//!
//! # async fn run() -> Result<(), wdapi::wd::ApiError> {
//! let requester = WdRequester::new(None, None, "secret", "client_id", "default_key")?;
//! let alliances = requester.alliances().await?;
//! println!("{} alliances", alliances.alliances.len());
//! # Ok(())
//! # }
//! ```

pub mod lenient;
mod place_id;
mod requester;
mod response_structs;
mod signature;
mod structs;
mod time;

use std::fmt;

use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

pub use crate::wd::place_id::{IdError, PlaceId, ensure_kridx, ensure_ridx, rekey_kridx};
pub use crate::wd::requester::{
    API_VERSION_1, API_VERSION_2, ApiVersion, BASE_URL, MockRequester, Requester, WdRequester,
};
pub use crate::wd::response_structs::{
    Activity, Alliances, BattlePrim, Battles, BattlesV1, BattlesV2, Buff, Buffs, Castle,
    CastleInfo, CastlesMacro, Contribution, EmbeddedError, Entry, EntryStats, ErrorEnvelope,
    EventDetails, EventScore, Executor, Fort, Infra, Infrastructure, League, MonthlyKills, Port,
    Prim, Report, ReportV2, RosterPlayer, Ships, SingleEvent, TeamKills, TeamMacroV1, TeamMacroV2,
    TeamMetadata, TeamTroops, TeamsMacro, TeamsMacroV1, TeamsMacroV2, TeamsMetadata, TroopCount,
};
pub use crate::wd::signature::{
    API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, auth_headers, signature,
};
pub use crate::wd::structs::{Coords, Primarch};
pub use crate::wd::time::{ApiTime, Epoch, PgTimestamp, TimeError};

/// Errors returned by the War Dragons API client.
///
/// # Variants
///
/// * `Transport` - The HTTP exchange itself failed (connection, DNS, timeout)
/// * `Decode` - The body did not match the expected shape, the raw answer is kept
/// * `Upstream` - The server answered with an error embedded in the body
/// * `Identifier` - A place identifier had an unexpected shape
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body could not be decoded into the expected type.
    #[error("{0}")]
    Decode(RawFailure),
    /// The server reported an application level error inside the body.
    #[error("upstream error {code}: {message}")]
    Upstream { message: String, code: i64 },
    /// A place identifier could not be normalized.
    #[error(transparent)]
    Identifier(#[from] IdError),
    /// The api key cannot be sent as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
    /// The api version string is not one the client knows about.
    #[error("unknown api version: {0}")]
    UnknownVersion(String),
}

/// Raw answer of a request whose body could not be decoded.
///
/// Kept verbatim so that a schema change on the server side can be diagnosed
/// without sending the request again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFailure {
    /// Status line, e.g. `200 OK`
    pub status: String,
    /// Numeric HTTP status code
    pub status_code: u16,
    /// Exact bytes of the response body
    pub body: Vec<u8>,
    /// Message of the JSON decoder
    pub error: String,
}

impl RawFailure {
    /// Body of the response as text, invalid UTF-8 sequences are replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({})\nResponse: {}\nError: {}",
            self.status,
            self.status_code,
            self.body_text(),
            self.error
        )
    }
}
