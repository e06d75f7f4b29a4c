//! OAuth 1.0a request signing for the X API.
//!
//! The X API v2 write endpoints require OAuth 1.0a user context: every
//! request carries an `Authorization: OAuth ...` header whose signature is
//! an HMAC-SHA1 over the normalised request parameters.
//!
//! Request bodies sent as JSON or multipart are excluded from the signature
//! base string per the OAuth 1.0a specification; only query parameters and
//! the `oauth_*` parameters participate.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Environment variable holding the OAuth consumer key.
pub const ENV_API_KEY: &str = "TWITTER_API_KEY";
/// Environment variable holding the OAuth consumer secret.
pub const ENV_API_SECRET: &str = "TWITTER_API_SECRET";
/// Environment variable holding the OAuth access token.
pub const ENV_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
/// Environment variable holding the OAuth access token secret.
pub const ENV_ACCESS_SECRET: &str = "TWITTER_ACCESS_SECRET";

/// OAuth 1.0a user-context credentials.
///
/// Four strings, all sourced from the process environment. Missing
/// variables become empty strings: startup never fails on absent
/// credentials, but every remote call will then be rejected by the API
/// and surface as an internal error.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Consumer key (app key).
    pub api_key: String,
    /// Consumer secret (app secret).
    pub api_secret: String,
    /// Access token for the acting user.
    pub access_token: String,
    /// Access token secret for the acting user.
    pub access_secret: String,
}

impl Credentials {
    /// Reads credentials from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(ENV_API_KEY).unwrap_or_default(),
            api_secret: std::env::var(ENV_API_SECRET).unwrap_or_default(),
            access_token: std::env::var(ENV_ACCESS_TOKEN).unwrap_or_default(),
            access_secret: std::env::var(ENV_ACCESS_SECRET).unwrap_or_default(),
        }
    }

    /// Whether all four credential strings are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty()
            && !self.api_secret.is_empty()
            && !self.access_token.is_empty()
            && !self.access_secret.is_empty()
    }
}

/// Builds the `Authorization` header value for one request.
///
/// `extra_params` must contain exactly the query parameters the request
/// will be sent with; they participate in the signature base string.
#[must_use]
pub fn authorization_header(
    method: &str,
    url: &str,
    credentials: &Credentials,
    extra_params: &[(&str, &str)],
) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();

    let nonce: String = (0..32).map(|_| format!("{:x}", rand::random::<u8>() & 0xf)).collect();

    sign_request(method, url, credentials, extra_params, &timestamp, &nonce)
}

/// Deterministic core of the header construction, split out for testing.
fn sign_request(
    method: &str,
    url: &str,
    credentials: &Credentials,
    extra_params: &[(&str, &str)],
    timestamp: &str,
    nonce: &str,
) -> String {
    let mut params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];
    params.extend_from_slice(extra_params);

    // Signature base string: parameters sorted by encoded key, then joined.
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    );

    let signing_key = format!(
        "{}&{}",
        percent_encode(&credentials.api_secret),
        percent_encode(&credentials.access_secret)
    );

    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(base_string.as_bytes());
    let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

    let header_params = [
        ("oauth_consumer_key", credentials.api_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature", signature.as_str()),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp),
        ("oauth_token", credentials.access_token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let header = header_params
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {header}")
}

/// RFC 3986 percent-encoding as required by OAuth 1.0a.
///
/// Only unreserved characters pass through; everything else becomes
/// uppercase `%XX` escapes.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}
