//! wdapi - A client library for the War Dragons game server API.
//!
//! # Overview
//!
//! The library signs every request with the application secret, sends it to
//! the game server and decodes the JSON answer into typed structures. The
//! server's schema drifts between api versions: ids come as `kingdom-region-index`
//! or `region-index`, numbers come as JSON numbers or strings and timestamps
//! are in seconds or milliseconds. The [`wd`] module normalizes all of it.
//!
//! # Errors
//!
//! Every call returns exactly one outcome, see [`wd::ApiError`]:
//!
//! - transport failures (connection, DNS, timeout)
//! - decode failures, carrying the raw status and body of the response
//! - errors the server embedded in an otherwise successful response
//! - malformed place identifiers
//!
//! # Logging
//!
//! The library logs through the [`log`] facade. Request lines are logged at
//! `debug` level, [`wd::WdRequester::with_verbose`] also logs the raw
//! responses at `info` level.

pub mod wd;
