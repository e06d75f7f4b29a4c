//! Integration tests for the action dispatcher.
//!
//! The remote side is replaced by a recording mock, so these tests verify
//! the full flow from parsed action to remote call: validation ordering,
//! the fetch cap, the media pipeline, and the rate-limit error mapping.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use twitter_mcp::error::ToolError;
use twitter_mcp::rate_limit::{EndpointGroup, RateLimiter};
use twitter_mcp::tools::{Dispatcher, ToolAction, HOME_TIMELINE_FETCH_CAP};
use twitter_mcp::twitter::{ApiError, MediaUpload, TimelineOptions, TweetRequest, TwitterApi};

/// Records every remote call; optionally fails each with a fixed status.
#[derive(Default)]
struct MockApi {
    calls: Mutex<Vec<String>>,
    timeline_max: Mutex<Option<u32>>,
    last_tweet: Mutex<Option<TweetRequest>>,
    last_upload_category: Mutex<Option<String>>,
    fail_status: Option<u16>,
    fail_upload: bool,
}

impl MockApi {
    fn failing_with(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    fn failing_uploads() -> Self {
        Self {
            fail_upload: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        if let Some(status) = self.fail_status {
            return Err(ApiError::Status {
                status,
                message: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TwitterApi for MockApi {
    async fn home_timeline(&self, options: &TimelineOptions) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push("home_timeline".to_string());
        *self.timeline_max.lock().unwrap() = Some(options.max_results);
        self.check_failure()?;
        Ok(json!([{"id": "1", "text": "first tweet"}]))
    }

    async fn post_tweet(&self, request: &TweetRequest) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push("post_tweet".to_string());
        *self.last_tweet.lock().unwrap() = Some(request.clone());
        self.check_failure()?;
        Ok(json!({"id": "9001", "text": request.text}))
    }

    async fn delete_tweet(&self, tweet_id: &str) -> Result<Value, ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("delete_tweet:{tweet_id}"));
        self.check_failure()?;
        Ok(json!({"deleted": true}))
    }

    async fn upload_media(&self, upload: MediaUpload) -> Result<String, ApiError> {
        self.calls.lock().unwrap().push("upload_media".to_string());
        *self.last_upload_category.lock().unwrap() = Some(upload.content_type);
        if self.fail_upload {
            return Err(ApiError::Status {
                status: 400,
                message: "media type unrecognized".to_string(),
            });
        }
        self.check_failure()?;
        Ok("media-42".to_string())
    }
}

fn dispatcher_over(api: Arc<MockApi>) -> Dispatcher {
    Dispatcher::new(api, RateLimiter::default())
}

#[tokio::test]
async fn timeline_fetch_is_capped() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse("get_home_timeline", &json!({"limit": 100})).unwrap();
    dispatcher.dispatch(action).await.unwrap();

    assert_eq!(
        *api.timeline_max.lock().unwrap(),
        Some(HOME_TIMELINE_FETCH_CAP)
    );
}

#[tokio::test]
async fn timeline_default_limit_is_also_capped() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse("get_home_timeline", &Value::Null).unwrap();
    dispatcher.dispatch(action).await.unwrap();

    assert_eq!(
        *api.timeline_max.lock().unwrap(),
        Some(HOME_TIMELINE_FETCH_CAP)
    );
}

#[tokio::test]
async fn timeline_limit_out_of_range_is_rejected_before_any_call() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    for limit in [0, 101] {
        let action = ToolAction::parse("get_home_timeline", &json!({"limit": limit})).unwrap();
        let error = dispatcher.dispatch(action).await.unwrap_err();
        let ToolError::InvalidRequest(msg) = error else {
            panic!("Expected InvalidRequest");
        };
        assert!(msg.contains("between 1 and 100"));
    }

    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn overlong_text_is_rejected_before_any_call() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action =
        ToolAction::parse("create_tweet", &json!({"text": "x".repeat(281)})).unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    assert!(matches!(error, ToolError::InvalidRequest(_)));
    assert!(error.to_string().contains("280"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn both_attachments_are_rejected_before_any_call() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse(
        "create_tweet",
        &json!({
            "text": "hello",
            "image_path": "/tmp/a.png",
            "video_path": "/tmp/b.mp4"
        }),
    )
    .unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    assert!(error.to_string().contains("not both"));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn create_tweet_with_image_uploads_then_posts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    std::fs::write(&path, b"jpeg bytes").unwrap();

    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse(
        "create_tweet",
        &json!({"text": "with picture", "image_path": path.to_str().unwrap()}),
    )
    .unwrap();
    let data = dispatcher.dispatch(action).await.unwrap();

    assert_eq!(data["id"], "9001");
    assert_eq!(api.calls(), vec!["upload_media", "post_tweet"]);
    assert_eq!(
        api.last_upload_category.lock().unwrap().as_deref(),
        Some("image/jpeg")
    );

    let tweet = api.last_tweet.lock().unwrap().clone().unwrap();
    assert_eq!(tweet.media_id.as_deref(), Some("media-42"));
    assert!(tweet.in_reply_to.is_none());
}

#[tokio::test]
async fn failed_upload_fails_the_action_without_posting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    std::fs::write(&path, b"png bytes").unwrap();

    let api = Arc::new(MockApi::failing_uploads());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse(
        "create_tweet",
        &json!({"text": "with picture", "image_path": path.to_str().unwrap()}),
    )
    .unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    let ToolError::InvalidRequest(msg) = error else {
        panic!("Expected InvalidRequest");
    };
    assert!(msg.starts_with("Failed to upload image: "));
    assert!(msg.contains("media type unrecognized"));
    // The tweet text is never posted without its attachment.
    assert_eq!(api.calls(), vec!["upload_media"]);
}

#[tokio::test]
async fn failed_validation_never_posts_bare_text() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse(
        "create_tweet",
        &json!({"text": "with picture", "image_path": "/nowhere/missing.png"}),
    )
    .unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    assert!(matches!(error, ToolError::InvalidRequest(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn reply_threads_onto_the_target_tweet() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse(
        "reply_to_tweet",
        &json!({"tweet_id": "777", "text": "agreed"}),
    )
    .unwrap();
    dispatcher.dispatch(action).await.unwrap();

    let tweet = api.last_tweet.lock().unwrap().clone().unwrap();
    assert_eq!(tweet.in_reply_to.as_deref(), Some("777"));
    assert_eq!(tweet.text, "agreed");
}

#[tokio::test]
async fn delete_returns_the_remote_payload() {
    let api = Arc::new(MockApi::default());
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse("delete_tweet", &json!({"tweet_id": "555"})).unwrap();
    let data = dispatcher.dispatch(action).await.unwrap();

    assert_eq!(data, json!({"deleted": true}));
    assert_eq!(api.calls(), vec!["delete_tweet:555"]);
}

#[tokio::test]
async fn remote_429_maps_to_a_rate_limit_message() {
    let api = Arc::new(MockApi::failing_with(429));
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse("create_tweet", &json!({"text": "hello"})).unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    let ToolError::InvalidRequest(msg) = error else {
        panic!("Expected InvalidRequest");
    };
    assert!(msg.contains("tweet"));
    assert!(msg.contains("15 minutes"));
    assert!(dispatcher
        .limiter()
        .reset_at(EndpointGroup::Tweet)
        .await
        .is_some());
}

#[tokio::test]
async fn other_remote_failures_map_to_internal() {
    let api = Arc::new(MockApi::failing_with(500));
    let dispatcher = dispatcher_over(Arc::clone(&api));

    let action = ToolAction::parse("delete_tweet", &json!({"tweet_id": "555"})).unwrap();
    let error = dispatcher.dispatch(action).await.unwrap_err();

    let ToolError::Internal(msg) = error else {
        panic!("Expected Internal");
    };
    assert!(msg.contains("mock failure"));
    assert!(dispatcher
        .limiter()
        .reset_at(EndpointGroup::Delete)
        .await
        .is_none());
}
