//! X API v2 client.
//!
//! [`TwitterApi`] is the seam between the action dispatcher and the remote
//! side: four operations, each resolving with the response's `data` payload
//! or failing with a typed [`ApiError`]. [`XApiClient`] is the production
//! implementation; tests substitute their own.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::twitter::auth::{authorization_header, Credentials};
use crate::twitter::error::ApiError;

/// Base URL for the X API v2.
const API_BASE: &str = "https://api.twitter.com";

/// v1.1 media upload endpoint (v2 has no upload surface).
const UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";

/// Options for a home timeline fetch.
#[derive(Debug, Clone)]
pub struct TimelineOptions {
    /// Number of tweets to request from the remote side.
    pub max_results: u32,
}

/// A tweet creation request.
///
/// Covers plain text, a single media attachment, and replies; the three
/// concerns are orthogonal on the wire.
#[derive(Debug, Clone)]
pub struct TweetRequest {
    /// Tweet text (at most 280 characters, validated by the dispatcher).
    pub text: String,
    /// Media handle from a prior upload, attached to this tweet.
    pub media_id: Option<String>,
    /// Tweet ID this tweet replies to.
    pub in_reply_to: Option<String>,
}

/// A media upload request.
#[derive(Debug)]
pub struct MediaUpload {
    /// Full file content.
    pub bytes: Vec<u8>,
    /// Content type derived from the file extension.
    pub content_type: String,
    /// Long-form video hint (source larger than 15 MiB). Selects the
    /// amplify_video upload category; purely a request hint.
    pub long_video: bool,
}

/// The remote X API surface consumed by the dispatcher.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Fetches the authenticated user's reverse-chronological home timeline.
    async fn home_timeline(&self, options: &TimelineOptions) -> Result<Value, ApiError>;

    /// Creates a tweet (optionally with media and/or as a reply).
    async fn post_tweet(&self, request: &TweetRequest) -> Result<Value, ApiError>;

    /// Deletes a tweet by ID.
    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value, ApiError>;

    /// Uploads media and returns the opaque media ID for attachment.
    async fn upload_media(&self, upload: MediaUpload) -> Result<String, ApiError>;
}

/// Production client for the X API v2 with OAuth 1.0a signing.
pub struct XApiClient {
    http: reqwest::Client,
    credentials: Credentials,
    /// Authenticated user ID, resolved lazily via `/2/users/me` and cached
    /// for the process lifetime.
    user_id: OnceCell<String>,
}

impl XApiClient {
    /// Creates a client with the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            user_id: OnceCell::new(),
        }
    }

    /// Resolves and caches the authenticated user's ID.
    async fn authenticated_user_id(&self) -> Result<&str, ApiError> {
        self.user_id
            .get_or_try_init(|| async {
                let url = format!("{API_BASE}/2/users/me");
                let auth = authorization_header("GET", &url, &self.credentials, &[]);
                let response = self.http.get(&url).header(AUTHORIZATION, auth).send().await?;
                let data = extract_data(response).await?;
                data.get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::Malformed("user lookup response missing id".to_string()))
            })
            .await
            .map(String::as_str)
    }
}

#[async_trait]
impl TwitterApi for XApiClient {
    async fn home_timeline(&self, options: &TimelineOptions) -> Result<Value, ApiError> {
        let user_id = self.authenticated_user_id().await?;
        let url = format!("{API_BASE}/2/users/{user_id}/timelines/reverse_chronological");

        let max_results = options.max_results.to_string();
        let query = [
            ("expansions", "author_id,referenced_tweets.id"),
            ("max_results", max_results.as_str()),
            ("tweet.fields", "author_id,created_at,referenced_tweets"),
        ];

        let auth = authorization_header("GET", &url, &self.credentials, &query);
        tracing::debug!(max_results = options.max_results, "Fetching home timeline");

        let response = self
            .http
            .get(&url)
            .query(&query)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;

        extract_data(response).await
    }

    async fn post_tweet(&self, request: &TweetRequest) -> Result<Value, ApiError> {
        let url = format!("{API_BASE}/2/tweets");

        let mut body = json!({ "text": request.text });
        if let Some(media_id) = &request.media_id {
            body["media"] = json!({ "media_ids": [media_id] });
        }
        if let Some(tweet_id) = &request.in_reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": tweet_id });
        }

        // JSON bodies are excluded from the OAuth signature base string.
        let auth = authorization_header("POST", &url, &self.credentials, &[]);
        tracing::debug!(
            has_media = request.media_id.is_some(),
            is_reply = request.in_reply_to.is_some(),
            "Posting tweet"
        );

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;

        extract_data(response).await
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value, ApiError> {
        let url = format!("{API_BASE}/2/tweets/{tweet_id}");
        let auth = authorization_header("DELETE", &url, &self.credentials, &[]);
        tracing::debug!(tweet_id, "Deleting tweet");

        let response = self
            .http
            .delete(&url)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;

        extract_data(response).await
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<String, ApiError> {
        let category = if upload.long_video {
            "amplify_video"
        } else if upload.content_type.starts_with("video/") {
            "tweet_video"
        } else {
            "tweet_image"
        };

        let part = reqwest::multipart::Part::bytes(upload.bytes)
            .file_name("media")
            .mime_str(&upload.content_type)
            .map_err(|e| ApiError::Malformed(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("media", part)
            .text("media_category", category);

        // Multipart bodies are excluded from the OAuth signature base string.
        let auth = authorization_header("POST", UPLOAD_URL, &self.credentials, &[]);
        tracing::debug!(category, "Uploading media");

        let response = self
            .http
            .post(UPLOAD_URL)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;

        // The v1.1 upload endpoint answers with a bare object, no `data`
        // envelope; the media ID arrives as media_id_string.
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Malformed(format!("invalid JSON: {e}")))?;
        payload
            .get("media_id_string")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Malformed("upload response missing media_id_string".to_string()))
    }
}

/// Reads a v2 response and extracts its `data` payload.
async fn extract_data(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_detail(&body),
        });
    }

    let payload: Value =
        serde_json::from_str(&body).map_err(|e| ApiError::Malformed(format!("invalid JSON: {e}")))?;
    payload
        .get("data")
        .cloned()
        .ok_or_else(|| ApiError::Malformed("response missing data payload".to_string()))
}

/// Pulls the human-readable detail out of an error body.
///
/// The v2 API reports `{"errors": [{"detail": ...}]}` or `{"detail": ...}`;
/// anything else falls back to the truncated raw body.
fn error_detail(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        if let Some(detail) = payload
            .get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("detail"))
            .and_then(Value::as_str)
        {
            return detail.to_string();
        }
        if let Some(detail) = payload.get("detail").and_then(Value::as_str) {
            return detail.to_string();
        }
        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            return title.to_string();
        }
    }

    let mut detail = body.to_string();
    if detail.len() > 200 {
        // Cut on a char boundary; a blind truncate panics mid-codepoint.
        let mut cut = 200;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
    }
    detail
}
