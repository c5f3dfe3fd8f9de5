//! Configuration file structures for the wdapi command line.
//!
//! The configuration is read from a YAML file and can be overridden with
//! environment variables prefixed with `WDAPI_`, nested keys being separated
//! by `__`.
//!
//! # Configuration File Format
//!
//! ```yaml
//! api:
//!   # Base URL of the server, optional
//!   url: "https://api-dot-pgdragonsong.appspot.com"
//!   # Api version path, optional
//!   version: "api/v1"
//!   # Application secret used to sign requests
//!   secret: "app-secret"
//!   # Application identifier
//!   client_id: "app-id"
//!   # Api key of the endpoints not bound to a player
//!   api_key: "default-key"
//!   # Log raw responses
//!   verbose: false
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export WDAPI_API__SECRET="secret-from-env"
//! export WDAPI_API__VERBOSE=true
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Game server api configuration
    pub api: Api,
}

/// Game server api configuration.
///
/// # YAML Section
///
/// ```yaml
/// api:
///   secret: "app-secret"
///   client_id: "app-id"
///   api_key: "default-key"
/// ```
#[derive(Deserialize, Debug)]
pub struct Api {
    /// Base URL of the server, the library default when missing.
    pub url: Option<String>,

    /// Api version path (`api/v1`, `api/v2`), the library default when missing.
    pub version: Option<String>,

    /// Application secret used to sign requests.
    pub secret: String,

    /// Application identifier.
    pub client_id: String,

    /// Api key of the endpoints not bound to a player.
    pub api_key: String,

    /// Log every request and raw response.
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Loads the configuration from `path`, then applies the `WDAPI_`
    /// environment variables on top of it.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("WDAPI_").split("__"))
            .extract()
    }
}
