//! HTTP client for the War Dragons server API.
//!
//! This module provides the [`WdRequester`] struct which signs requests,
//! executes them and decodes the answers, and the [`Requester`] trait listing
//! the api endpoints.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use log::{debug, info};
use mockall::automock;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::wd::place_id::rekey_kridx;
use crate::wd::response_structs::{
    Alliances, Battles, BattlesV1, BattlesV2, CastleInfo, CastlesMacro, Contribution, EmbeddedError,
    ErrorEnvelope, EventScore, MonthlyKills, TeamsMacro, TeamsMacroV1, TeamsMacroV2, TeamsMetadata,
    TroopCount,
};
use crate::wd::signature::auth_headers;
use crate::wd::{ApiError, RawFailure};

/// Default server url.
pub const BASE_URL: &str = "https://api-dot-pgdragonsong.appspot.com";
/// Version path of the first api generation.
pub const API_VERSION_1: &str = "api/v1";
/// Version path of the second api generation.
pub const API_VERSION_2: &str = "api/v2";

/// Api generation, selects the url path and the response schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V1,
    V2,
}

impl ApiVersion {
    /// Path segment of the version, e.g. `api/v1`.
    pub fn path(&self) -> &'static str {
        match self {
            ApiVersion::V1 => API_VERSION_1,
            ApiVersion::V2 => API_VERSION_2,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Parses `api/v1`, `v1`, `api/v2` or `v2`.
impl FromStr for ApiVersion {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_matches('/') {
            API_VERSION_1 | "v1" => Ok(ApiVersion::V1),
            API_VERSION_2 | "v2" => Ok(ApiVersion::V2),
            _ => Err(ApiError::UnknownVersion(s.to_string())),
        }
    }
}

/// HTTP client for requesting data from the War Dragons server.
///
/// Each call sends exactly one request. Nothing is cached and failed requests
/// are not retried.
///
/// # Examples
///
/// ```no_run
/// use wdapi::wd::{Requester, WdRequester};
///
/// # async fn run() -> Result<(), wdapi::wd::ApiError> {
/// let requester = WdRequester::new(None, Some("api/v1"), "secret", "client_id", "default_key")?;
/// let castles = requester.castles_macro(5, "realm").await?;
/// println!("{} castles", castles.castles.len());
/// # Ok(())
/// # }
/// ```
pub struct WdRequester {
    /// Server url, without trailing slash
    url: String,
    /// Api generation
    version: ApiVersion,
    /// Application secret used to sign requests
    secret: String,
    /// Application identifier
    client_id: String,
    /// Api key of the endpoints which are not bound to a player
    default_api_key: String,
    /// HTTP client
    client: Client,
    /// Log every request and raw response at info level
    verbose: bool,
}

/// Trait for making requests to the War Dragons server.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
pub trait Requester {
    /// Fetches the teams of each alliance.
    async fn alliances(&self) -> Result<Alliances, ApiError>;
    /// Fetches the castles of a kingdom, keyed by KRIDX.
    async fn castles_macro(&self, kingdom_id: i64, realm_name: &str)
    -> Result<CastlesMacro, ApiError>;
    /// Fetches the detailed state of castles, keyed by KRIDX.
    async fn castle_info(
        &self,
        castle_ids: &[String],
    ) -> Result<HashMap<String, CastleInfo>, ApiError>;
    /// Fetches the teams of a kingdom.
    async fn teams_macro(&self, kingdom_id: i64, realm_name: &str) -> Result<TeamsMacro, ApiError>;
    /// Fetches roster and alliance of the given teams.
    async fn teams_metadata(
        &self,
        kingdom_id: i64,
        realm_name: &str,
        team_names: &[String],
    ) -> Result<TeamsMetadata, ApiError>;
    /// Fetches the kills of the given teams for the current month.
    async fn monthly_kill_count(&self, team_names: &[String]) -> Result<MonthlyKills, ApiError>;
    /// Fetches the event scores of the player owning `api_key`.
    async fn event_score(&self, api_key: &str) -> Result<EventScore, ApiError>;
    /// Fetches the team contribution of the player owning `api_key`.
    async fn contribution(&self, api_key: &str) -> Result<Contribution, ApiError>;
    /// Fetches the troops of the team of the player owning `api_key`.
    async fn troop_count(&self, api_key: &str) -> Result<TroopCount, ApiError>;
    /// Fetches one page of battle reports of the team of the player owning `api_key`.
    async fn battles(&self, api_key: &str, cursor: &str) -> Result<Battles, ApiError>;
    /// Sends a signed request and returns the raw body, without decoding it.
    async fn get_plain(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        api_key: &str,
    ) -> Result<Vec<u8>, ApiError>;
}

impl WdRequester {
    /// Create a new [WdRequester].
    ///
    /// # Arguments
    ///
    /// * `url` - Server url, [`BASE_URL`] when `None`
    /// * `version` - Api version path, [`API_VERSION_1`] when `None`
    /// * `secret` - Application secret used to sign requests
    /// * `client_id` - Application identifier
    /// * `default_api_key` - Api key of the endpoints not bound to a player
    ///
    /// # Errors
    ///
    /// [`ApiError::UnknownVersion`] if `version` is not a known api version.
    pub fn new(
        url: Option<&str>,
        version: Option<&str>,
        secret: &str,
        client_id: &str,
        default_api_key: &str,
    ) -> Result<Self, ApiError> {
        let version = match version {
            Some(version) => version.parse()?,
            None => ApiVersion::default(),
        };

        Ok(WdRequester {
            url: url.unwrap_or(BASE_URL).trim_end_matches('/').to_string(),
            version,
            secret: secret.to_string(),
            client_id: client_id.to_string(),
            default_api_key: default_api_key.to_string(),
            client: Client::new(),
            verbose: false,
        })
    }

    /// Replaces the HTTP client, e.g. to configure timeouts or a proxy.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Enables logging of every request and raw response.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Server url.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Api generation used by this requester.
    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Application identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", &self.url, self.version.path(), path)
    }

    /// Attaches the authentication headers, signed with the current time.
    fn sign(&self, request: RequestBuilder, api_key: &str) -> Result<RequestBuilder, ApiError> {
        let now = Utc::now().timestamp();
        Ok(request.headers(auth_headers(&self.secret, api_key, now)?))
    }

    /// Signs and sends `request`, then returns the status and the raw body.
    async fn send(
        &self,
        request: RequestBuilder,
        api_key: &str,
    ) -> Result<(StatusCode, Vec<u8>), ApiError> {
        let request = self.sign(request, api_key)?.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!("request {} {}", &method, &url);

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if self.verbose {
            info!("{} {}", &method, &url);
            info!("{}", String::from_utf8_lossy(&body));
        }
        debug!("response from {} {} -> {}", &method, &url, &status);

        Ok((status, body))
    }

    /// Signs and sends `request`, then decodes the body into `T`.
    ///
    /// The request is signed right before being sent, with `api_key`.
    ///
    /// # Errors
    ///
    /// * [`ApiError::Transport`] - the request could not be sent or the body read
    /// * [`ApiError::Decode`] - the body is not a valid `T`, the raw body is kept
    /// * [`ApiError::InvalidHeader`] - `api_key` is not a valid header value
    ///
    /// Errors embedded in the body are not inspected here, see [`EmbeddedError`].
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        api_key: &str,
    ) -> Result<T, ApiError> {
        let (status, body) = self.send(request, api_key).await?;
        Self::decode(status, body)
    }

    /// Decodes `body` into `T`, keeping the raw answer on failure.
    fn decode<T: DeserializeOwned>(status: StatusCode, body: Vec<u8>) -> Result<T, ApiError> {
        serde_json::from_slice(&body).map_err(|err| {
            ApiError::Decode(RawFailure {
                status: status.to_string(),
                status_code: status.as_u16(),
                body,
                error: err.to_string(),
            })
        })
    }

    fn kingdom_query(kingdom_id: i64, realm_name: &str) -> [(&'static str, String); 2] {
        [
            ("k_id", kingdom_id.to_string()),
            ("realm_name", realm_name.to_string()),
        ]
    }
}

impl Requester for WdRequester {
    /// Request `/atlas/alliances/teams` to get the teams of each alliance.
    async fn alliances(&self) -> Result<Alliances, ApiError> {
        let url = self.endpoint("atlas/alliances/teams");
        info!("request alliances");

        let alliances: Alliances = self
            .execute(self.client.get(&url), &self.default_api_key)
            .await?;
        alliances.check()
    }

    /// Request `/atlas/castles/metadata/macro?k_id={kingdom}&realm_name={realm}`.
    ///
    /// The server keys castles by RIDX or KRIDX depending on the version, the
    /// returned map is always keyed by KRIDX.
    async fn castles_macro(
        &self,
        kingdom_id: i64,
        realm_name: &str,
    ) -> Result<CastlesMacro, ApiError> {
        let url = self.endpoint("atlas/castles/metadata/macro");
        info!("request castles of kingdom {} in {}", kingdom_id, realm_name);

        let request = self
            .client
            .get(&url)
            .query(&Self::kingdom_query(kingdom_id, realm_name));
        let mut castles = self
            .execute::<CastlesMacro>(request, &self.default_api_key)
            .await?
            .check()?;

        castles.castles = rekey_kridx(castles.castles, kingdom_id)?;
        Ok(castles)
    }

    /// Request `/castle_info?cont_ids=["id1","id2"]`.
    ///
    /// The returned map is keyed by the KRIDX of each castle's `place_id`.
    /// The server answers with a bare map, errors come as a separate
    /// `{"error": .., "error_code": ..}` object.
    async fn castle_info(
        &self,
        castle_ids: &[String],
    ) -> Result<HashMap<String, CastleInfo>, ApiError> {
        let url = self.endpoint("castle_info");
        info!("request castle info of {:?}", castle_ids);

        let request = self
            .client
            .get(&url)
            .query(&[("cont_ids", json!(castle_ids).to_string())]);
        let (status, body) = self.send(request, &self.default_api_key).await?;
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            envelope.check()?;
        }
        let castles: HashMap<String, CastleInfo> = Self::decode(status, body)?;

        Ok(castles
            .into_values()
            .map(|castle| (castle.place_id.kridx(), castle))
            .collect())
    }

    /// Request `/atlas/teams/metadata/macro?k_id={kingdom}&realm_name={realm}`.
    ///
    /// The response schema depends on the api version, see [`TeamsMacro`].
    async fn teams_macro(&self, kingdom_id: i64, realm_name: &str) -> Result<TeamsMacro, ApiError> {
        let url = self.endpoint("atlas/teams/metadata/macro");
        info!("request teams of kingdom {} in {}", kingdom_id, realm_name);

        let request = self
            .client
            .get(&url)
            .query(&Self::kingdom_query(kingdom_id, realm_name));
        let teams = match self.version {
            ApiVersion::V1 => TeamsMacro::V1(
                self.execute::<TeamsMacroV1>(request, &self.default_api_key)
                    .await?,
            ),
            ApiVersion::V2 => TeamsMacro::V2(
                self.execute::<TeamsMacroV2>(request, &self.default_api_key)
                    .await?,
            ),
        };
        teams.check()
    }

    /// Request `POST /atlas/teams/metadata` with
    /// `{"teams": [..], "k_id": kingdom, "realm_name": realm}`.
    async fn teams_metadata(
        &self,
        kingdom_id: i64,
        realm_name: &str,
        team_names: &[String],
    ) -> Result<TeamsMetadata, ApiError> {
        let url = self.endpoint("atlas/teams/metadata");
        info!("request metadata of teams {:?}", team_names);

        let body = json!({
            "teams": team_names,
            "k_id": kingdom_id,
            "realm_name": realm_name,
        });
        let metadata: TeamsMetadata = self
            .execute(
                self.client.post(&url).body(body.to_string()),
                &self.default_api_key,
            )
            .await?;
        metadata.check()
    }

    /// Request `POST /atlas/teams/monthly_kill_count` with `{"teams": [..]}`.
    async fn monthly_kill_count(&self, team_names: &[String]) -> Result<MonthlyKills, ApiError> {
        let url = self.endpoint("atlas/teams/monthly_kill_count");
        info!("request monthly kills of teams {:?}", team_names);

        let body = json!({ "teams": team_names });
        let kills: MonthlyKills = self
            .execute(
                self.client.post(&url).body(body.to_string()),
                &self.default_api_key,
            )
            .await?;
        kills.check()
    }

    /// Request `/atlas/player/event/score`.
    async fn event_score(&self, api_key: &str) -> Result<EventScore, ApiError> {
        let url = self.endpoint("atlas/player/event/score");
        info!("request event score");

        let score: EventScore = self.execute(self.client.get(&url), api_key).await?;
        score.check()
    }

    /// Request `/team/contribution`.
    async fn contribution(&self, api_key: &str) -> Result<Contribution, ApiError> {
        let url = self.endpoint("team/contribution");
        info!("request team contribution");

        let contribution: Contribution = self.execute(self.client.get(&url), api_key).await?;
        contribution.check()
    }

    /// Request `/atlas/team/troop_count`.
    async fn troop_count(&self, api_key: &str) -> Result<TroopCount, ApiError> {
        let url = self.endpoint("atlas/team/troop_count");
        info!("request team troop count");

        let troops: TroopCount = self.execute(self.client.get(&url), api_key).await?;
        troops.check()
    }

    /// Request `/atlas/team/battles?cursor={cursor}`.
    ///
    /// The response schema depends on the api version, see [`Battles`].
    async fn battles(&self, api_key: &str, cursor: &str) -> Result<Battles, ApiError> {
        let url = self.endpoint("atlas/team/battles");
        info!("request battles from cursor {:?}", cursor);

        let request = self.client.get(&url).query(&[("cursor", cursor)]);
        let battles = match self.version {
            ApiVersion::V1 => Battles::V1(self.execute::<BattlesV1>(request, api_key).await?),
            ApiVersion::V2 => Battles::V2(self.execute::<BattlesV2>(request, api_key).await?),
        };
        battles.check()
    }

    /// Sends `body` to `endpoint`, a full url, and returns the raw answer.
    async fn get_plain(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
        api_key: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let mut request = self.client.request(method, endpoint);
        if let Some(body) = body {
            request = request.body(body);
        }

        let (_, body) = self.send(request, api_key).await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wd::signature::{API_KEY_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, signature};
    use crate::wd::time::ApiTime;
    use mockito::Matcher;

    fn requester(url: &str, version: Option<&str>) -> WdRequester {
        WdRequester::new(Some(url), version, "secret", "client_id", "default_key").unwrap()
    }

    fn signed(mock: mockito::Mock, api_key: &str) -> mockito::Mock {
        mock.match_header(API_KEY_HEADER, api_key)
            .match_header(TIMESTAMP_HEADER, Matcher::Regex(r"^\d+$".to_string()))
            .match_header(SIGNATURE_HEADER, Matcher::Regex(r"^[0-9a-f]{64}$".to_string()))
            .match_header("accept", "application/json")
            .match_header("content-type", "application/json")
    }

    #[test]
    fn test_new_defaults() {
        let requester =
            WdRequester::new(None, None, "secret", "client_id", "default_key").unwrap();
        assert_eq!(requester.url(), BASE_URL);
        assert_eq!(requester.version(), ApiVersion::V1);
        assert_eq!(requester.client_id(), "client_id");
        assert_eq!(
            requester.endpoint("castle_info"),
            "https://api-dot-pgdragonsong.appspot.com/api/v1/castle_info"
        );
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let requester = requester("http://localhost:8080/", Some("api/v2"));
        assert_eq!(
            requester.endpoint("atlas/team/battles"),
            "http://localhost:8080/api/v2/atlas/team/battles"
        );
    }

    #[test]
    fn test_new_unknown_version() {
        assert!(matches!(
            WdRequester::new(None, Some("api/v9"), "secret", "client_id", "key"),
            Err(ApiError::UnknownVersion(v)) if v == "api/v9"
        ));
    }

    #[test]
    fn test_api_version_parse() {
        assert_eq!("api/v1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("v1".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("/api/v2/".parse::<ApiVersion>().unwrap(), ApiVersion::V2);
        assert_eq!(ApiVersion::V2.to_string(), "api/v2");
        assert!("".parse::<ApiVersion>().is_err());
    }

    #[tokio::test]
    async fn test_alliances() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"timestamp": 1600000000, "alliances": {"Dragons": ["TeamA", "TeamB"]}}"#;

        let mock = signed(server.mock("GET", "/api/v1/atlas/alliances/teams"), "default_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let alliances = requester(&server.url(), None).alliances().await.unwrap();
        mock.assert_async().await;
        assert_eq!(alliances.alliances["Dragons"], vec!["TeamA", "TeamB"]);
        assert_eq!(alliances.timestamp.unwrap().unix_seconds(), 1_600_000_000);
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let body = "<html>Server Error</html>";

        server
            .mock("GET", "/api/v1/atlas/alliances/teams")
            .with_status(500)
            .with_body(body)
            .create_async()
            .await;

        match requester(&server.url(), None).alliances().await {
            Err(ApiError::Decode(failure)) => {
                assert_eq!(failure.status, "500 Internal Server Error");
                assert_eq!(failure.status_code, 500);
                assert_eq!(failure.body, body.as_bytes());
                assert!(!failure.error.is_empty());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_failure_wrong_shape() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"alliances": ["not", "a", "map"]}"#;

        server
            .mock("GET", "/api/v1/atlas/alliances/teams")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        match requester(&server.url(), None).alliances().await {
            Err(ApiError::Decode(failure)) => {
                assert_eq!(failure.status, "200 OK");
                assert_eq!(failure.body_text(), body);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embedded_error() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/v1/team/contribution")
            .match_header(API_KEY_HEADER, "player_key")
            .with_status(200)
            .with_body(r#"{"entries": [], "error": "rate limited", "error_code": 429}"#)
            .create_async()
            .await;

        match requester(&server.url(), None).contribution("player_key").await {
            Err(ApiError::Upstream { message, code }) => {
                assert_eq!(message, "rate limited");
                assert_eq!(code, 429);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure() {
        // nothing listens on port 1
        let result = requester("http://127.0.0.1:1", None).alliances().await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn test_invalid_api_key_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/team/contribution")
            .expect(0)
            .create_async()
            .await;

        let result = requester(&server.url(), None)
            .contribution("bad\nkey")
            .await;
        assert!(matches!(result, Err(ApiError::InvalidHeader(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_castles_macro_keys_are_normalized() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"castle": {
            "A0-1": {"owner_team": "TeamA", "level": 3, "coords": {"x": 400, "y": -400}},
            "5-B2-0": {"owner_team": "TeamB", "level": "2", "coords": {"x": "80", "y": "-80"}}
        }}"#;

        signed(
            server.mock("GET", "/api/v1/atlas/castles/metadata/macro"),
            "default_key",
        )
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("k_id".to_owned(), "5".to_owned()),
            Matcher::UrlEncoded("realm_name".to_owned(), "Realm One".to_owned()),
        ]))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

        let castles = requester(&server.url(), None)
            .castles_macro(5, "Realm One")
            .await
            .unwrap();
        assert_eq!(castles.castles.len(), 2);
        assert_eq!(castles.castles["5-A0-1"].owner_team, "TeamA");
        assert_eq!(castles.castles["5-B2-0"].level, 2);
        assert_eq!(castles.castles["5-B2-0"].coords.to_string(), "X:2.0 Y:2.0");
    }

    #[tokio::test]
    async fn test_castles_macro_malformed_key() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/v1/atlas/castles/metadata/macro")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"castle": {"A0": {"owner_team": "TeamA"}}}"#)
            .create_async()
            .await;

        let result = requester(&server.url(), None).castles_macro(5, "realm").await;
        assert!(matches!(result, Err(ApiError::Identifier(_))));
    }

    #[tokio::test]
    async fn test_castle_info_is_keyed_by_place_id() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "A0-1": {"place_id": {"k_id": 5, "region_id": "A0", "cont_idx": 1}, "owner_team": "TeamA"},
            "whatever": {"place_id": {"k_id": "5", "region_id": "B2", "cont_idx": "3"}, "owner_team": "TeamB"}
        }"#;

        signed(server.mock("GET", "/api/v1/castle_info"), "default_key")
            .match_query(Matcher::UrlEncoded(
                "cont_ids".to_owned(),
                r#"["A0-1","5-B2-3"]"#.to_owned(),
            ))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let ids = vec!["A0-1".to_string(), "5-B2-3".to_string()];
        let castles = requester(&server.url(), None)
            .castle_info(&ids)
            .await
            .unwrap();
        assert_eq!(castles.len(), 2);
        assert_eq!(castles["5-A0-1"].owner_team, "TeamA");
        assert_eq!(castles["5-B2-3"].owner_team, "TeamB");
    }

    #[tokio::test]
    async fn test_castle_info_embedded_error() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/v1/castle_info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "rate limited", "error_code": 429}"#)
            .create_async()
            .await;

        let result = requester(&server.url(), None)
            .castle_info(&["A0-1".to_string()])
            .await;
        match result {
            Err(ApiError::Upstream { message, code }) => {
                assert_eq!(message, "rate limited");
                assert_eq!(code, 429);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_castle_info_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"A0-1": {"owner_team": "TeamA"}}"#;

        server
            .mock("GET", "/api/v1/castle_info")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        match requester(&server.url(), None)
            .castle_info(&["A0-1".to_string()])
            .await
        {
            Err(ApiError::Decode(failure)) => assert_eq!(failure.body_text(), body),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sent_signature_matches_timestamp() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/api/v1/team/contribution")
            .match_request(|req| {
                let header = |name: &'static str| {
                    req.header(name)
                        .first()
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                let (Some(timestamp), Some(sent)) =
                    (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER))
                else {
                    return false;
                };
                timestamp
                    .parse::<i64>()
                    .is_ok_and(|ts| sent == signature("secret", "player_key", ts))
            })
            .with_status(200)
            .with_body(r#"{"entries": []}"#)
            .expect(1)
            .create_async()
            .await;

        let contribution = requester(&server.url(), None)
            .contribution("player_key")
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(contribution.entries.is_empty());
    }

    #[tokio::test]
    async fn test_teams_macro_v2() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"update_ts": 1600000000000, "teams": {"TeamA": {"elo": 1500, "capital": {"k_id": 5, "region_id": "A0", "cont_idx": 1}}}}"#;

        server
            .mock("GET", "/api/v2/atlas/teams/metadata/macro")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let teams = requester(&server.url(), Some("api/v2"))
            .teams_macro(5, "realm")
            .await
            .unwrap();
        let TeamsMacro::V2(v2) = &teams else {
            panic!("expected v2 teams");
        };
        assert_eq!(v2.timestamp.unwrap().unix_seconds(), 1_600_000_000);
        assert_eq!(teams.capitals(5).unwrap()["TeamA"], "5-A0-1");
    }

    #[tokio::test]
    async fn test_teams_macro_v1() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"update_ts": "1600000000", "teams": {"TeamA": {"capital": "A0-1", "activeness": {"score": "0.5", "label": "high"}}}}"#;

        server
            .mock("GET", "/api/v1/atlas/teams/metadata/macro")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let teams = requester(&server.url(), None)
            .teams_macro(5, "realm")
            .await
            .unwrap();
        let TeamsMacro::V1(v1) = &teams else {
            panic!("expected v1 teams");
        };
        assert_eq!(v1.teams["TeamA"].activeness.score, 0.5);
        assert_eq!(teams.capitals(5).unwrap()["TeamA"], "5-A0-1");
    }

    #[tokio::test]
    async fn test_teams_metadata() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"teams": {"Team \"A\"": {"team_name": "Team \"A\"", "alliance": "Dragons", "roster": [{"player_name": "Alice", "level": 100}]}}}"#;

        signed(server.mock("POST", "/api/v1/atlas/teams/metadata"), "default_key")
            .match_body(Matcher::Json(serde_json::json!({
                "teams": ["Team \"A\"", "TeamB"],
                "k_id": 5,
                "realm_name": "realm",
            })))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let teams = vec!["Team \"A\"".to_string(), "TeamB".to_string()];
        let metadata = requester(&server.url(), None)
            .teams_metadata(5, "realm", &teams)
            .await
            .unwrap();
        assert_eq!(metadata.teams["Team \"A\""].roster[0].player_name, "Alice");
    }

    #[tokio::test]
    async fn test_monthly_kill_count() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/v1/atlas/teams/monthly_kill_count")
            .match_body(Matcher::Json(serde_json::json!({"teams": ["TeamA"]})))
            .with_status(200)
            .with_body(r#"{"ReqTeams": {"TeamA": {"ts": 1600000000, "total_kills": 42}}}"#)
            .create_async()
            .await;

        let kills = requester(&server.url(), None)
            .monthly_kill_count(&["TeamA".to_string()])
            .await
            .unwrap();
        assert_eq!(kills.teams["TeamA"].total_kills, 42);
    }

    #[tokio::test]
    async fn test_player_endpoints_use_player_key() {
        let mut server = mockito::Server::new_async().await;

        signed(server.mock("GET", "/api/v1/atlas/player/event/score"), "player_key")
            .with_status(200)
            .with_body(r#"{"events": {"e1": {"score": 10, "player_name": "Alice"}}}"#)
            .create_async()
            .await;
        signed(server.mock("GET", "/api/v1/atlas/team/troop_count"), "player_key")
            .with_status(200)
            .with_body(r#"{"troop_count": {"TeamA": {"total": 3, "members": {"Alice": 3}}}}"#)
            .create_async()
            .await;

        let requester = requester(&server.url(), None);
        let score = requester.event_score("player_key").await.unwrap();
        let troops = requester.troop_count("player_key").await.unwrap();
        assert_eq!(score.events["e1"].score, 10);
        assert_eq!(troops.troop_count["TeamA"].members["Alice"], 3);
    }

    #[tokio::test]
    async fn test_battles_v1() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"cursor": "next", "more": true, "reports": {
            "ts": 1600000000,
            "place_id": {"k_id": 5, "region_id": "A0", "cont_idx": 1},
            "attacker": {"name": "Alice"},
            "defender": {"name": "Bob"}
        }}"#;

        signed(server.mock("GET", "/api/v1/atlas/team/battles"), "player_key")
            .match_query(Matcher::UrlEncoded("cursor".to_owned(), "abc".to_owned()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let battles = requester(&server.url(), None)
            .battles("player_key", "abc")
            .await
            .unwrap();
        assert_eq!(battles.cursor(), "next");
        assert!(battles.more());
        let Battles::V1(v1) = battles else {
            panic!("expected v1 battles");
        };
        assert_eq!(v1.reports.unwrap().attacker.name, "Alice");
    }

    #[tokio::test]
    async fn test_battles_v2() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"cursor": "", "more": false, "reports": [{
            "ts": "1600000000000",
            "place_id": {"k_id": 5, "region_id": "A0", "cont_idx": 1},
            "attacker": {"name": "Alice"},
            "defender": {"name": "Bob"}
        }]}"#;

        server
            .mock("GET", "/api/v2/atlas/team/battles")
            .match_query(Matcher::UrlEncoded("cursor".to_owned(), "".to_owned()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let battles = requester(&server.url(), Some("v2"))
            .battles("player_key", "")
            .await
            .unwrap();
        let Battles::V2(v2) = battles else {
            panic!("expected v2 battles");
        };
        assert_eq!(v2.reports[0].timestamp.unix_seconds(), 1_600_000_000);
        assert_eq!(v2.reports[0].defender.name, "Bob");
    }

    #[tokio::test]
    async fn test_battles_v1_rejects_v2_schema() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"cursor": "", "more": false, "reports": [1, 2]}"#;

        server
            .mock("GET", "/api/v1/atlas/team/battles")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        match requester(&server.url(), None).battles("key", "").await {
            Err(ApiError::Decode(failure)) => assert_eq!(failure.body_text(), body),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_plain() {
        let mut server = mockito::Server::new_async().await;

        signed(server.mock("PUT", "/custom"), "player_key")
            .match_body("payload")
            .with_status(202)
            .with_body("not even json")
            .create_async()
            .await;

        let url = format!("{}/custom", server.url());
        let body = requester(&server.url(), None)
            .get_plain(Method::PUT, &url, Some("payload".to_string()), "player_key")
            .await
            .unwrap();
        assert_eq!(body, b"not even json");
    }

    #[tokio::test]
    async fn test_verbose_does_not_change_result() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/api/v1/atlas/alliances/teams")
            .with_status(200)
            .with_body("garbage")
            .expect(2)
            .create_async()
            .await;

        let quiet = requester(&server.url(), None).alliances().await;
        let verbose = requester(&server.url(), None)
            .with_verbose(true)
            .alliances()
            .await;
        match (quiet, verbose) {
            (Err(ApiError::Decode(a)), Err(ApiError::Decode(b))) => assert_eq!(a, b),
            other => panic!("unexpected results {:?}", other),
        }
    }
}
