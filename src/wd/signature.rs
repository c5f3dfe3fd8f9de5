//! Request signature for the War Dragons API.
//!
//! Every authenticated request carries the api key, the send timestamp and a
//! signature binding both to the application secret.

use reqwest::header::{
    ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue,
};
use sha2::{Digest, Sha256};

// Header names are lowercase as `http` requires for static names, the server
// documents them as `X-WarDragons-APIKey`, `X-WarDragons-Request-Timestamp`
// and `X-WarDragons-Signature`.

/// Header holding the api key.
pub const API_KEY_HEADER: &str = "x-wardragons-apikey";
/// Header holding the request timestamp, in seconds since the Unix epoch.
pub const TIMESTAMP_HEADER: &str = "x-wardragons-request-timestamp";
/// Header holding the hex encoded signature.
pub const SIGNATURE_HEADER: &str = "x-wardragons-signature";

/// Computes the signature of a request.
///
/// The signature is the hex encoded SHA-256 digest of `secret:key:timestamp`.
///
/// # Arguments
///
/// * `secret` - The application secret shared with the server
/// * `key` - The api key sent with the request
/// * `timestamp` - Send time in whole seconds since the Unix epoch
///
/// # Examples
///
/// ```
/// let sig = wdapi::wd::signature("secret", "key", 1_700_000_000);
/// assert_eq!(sig.len(), 64);
/// ```
pub fn signature(secret: &str, key: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", secret, key, timestamp).as_bytes());
    hex::encode(hasher.finalize())
}

/// Builds the authentication headers of a request sent at `timestamp`.
///
/// Fails if the api key contains characters which are not allowed in a header.
pub fn auth_headers(
    secret: &str,
    key: &str,
    timestamp: i64,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let json = HeaderValue::from_str(mime::APPLICATION_JSON.as_ref())?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(API_KEY_HEADER),
        HeaderValue::from_str(key)?,
    );
    headers.insert(
        HeaderName::from_static(TIMESTAMP_HEADER),
        HeaderValue::from(timestamp),
    );
    headers.insert(
        HeaderName::from_static(SIGNATURE_HEADER),
        HeaderValue::from_str(&signature(secret, key, timestamp))?,
    );
    headers.insert(ACCEPT, json.clone());
    headers.insert(CONTENT_TYPE, json);
    Ok(headers)
}
