//! Tool actions and the dispatcher that executes them.
//!
//! Every inbound `tools/call` is parsed into a [`ToolAction`] — a closed
//! enum with one variant per tool, each carrying its own typed argument
//! record — then handed to the [`Dispatcher`], which runs per-action
//! validation, the optional media pipeline, and the rate-limited remote
//! call.
//!
//! Actions are stateless and independent; the only shared state is the
//! rate limiter's per-group reset instants.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ToolError;
use crate::media::{self, MediaClass, MediaUploader};
use crate::rate_limit::{EndpointGroup, RateLimiter};
use crate::twitter::{TimelineOptions, TweetRequest, TwitterApi};

/// Maximum tweet text length in characters.
pub const MAX_TWEET_CHARS: usize = 280;

/// Hard ceiling on the number of timeline entries requested from the
/// remote side, regardless of the requested limit. Keeps a single fetch
/// from draining the free-tier read quota.
pub const HOME_TIMELINE_FETCH_CAP: u32 = 5;

/// Default timeline limit when the caller does not pass one.
const DEFAULT_TIMELINE_LIMIT: u32 = 20;

/// Arguments for `get_home_timeline`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineArgs {
    /// Requested number of tweets (1-100). Defaults to 20.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Arguments for `create_tweet`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetArgs {
    /// Tweet text, at most 280 characters.
    pub text: String,
    /// Local path to an image attachment.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Local path to a video attachment. Mutually exclusive with
    /// `image_path`.
    #[serde(default)]
    pub video_path: Option<String>,
}

/// Arguments for `reply_to_tweet`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyArgs {
    /// ID of the tweet being replied to.
    pub tweet_id: String,
    /// Reply text, at most 280 characters.
    pub text: String,
    /// Local path to an image attachment.
    #[serde(default)]
    pub image_path: Option<String>,
    /// Local path to a video attachment. Mutually exclusive with
    /// `image_path`.
    #[serde(default)]
    pub video_path: Option<String>,
}

/// Arguments for `delete_tweet`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteArgs {
    /// ID of the tweet to delete.
    pub tweet_id: String,
}

/// The closed set of tool actions this server provides.
#[derive(Debug, Clone)]
pub enum ToolAction {
    /// Fetch the authenticated user's home timeline.
    GetHomeTimeline(TimelineArgs),
    /// Post a new tweet, optionally with one attachment.
    CreateTweet(CreateTweetArgs),
    /// Reply to an existing tweet, optionally with one attachment.
    ReplyToTweet(ReplyArgs),
    /// Delete a tweet by ID.
    DeleteTweet(DeleteArgs),
}

impl ToolAction {
    /// Parses a tool invocation into an action.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for names outside the fixed set
    /// and [`ToolError::InvalidRequest`] when the argument bag does not
    /// deserialise into the action's record.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        fn record<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
            let arguments = match arguments {
                Value::Null => Value::Object(serde_json::Map::new()),
                other => other.clone(),
            };
            serde_json::from_value(arguments)
                .map_err(|e| ToolError::InvalidRequest(format!("Invalid arguments: {e}")))
        }

        match name {
            "get_home_timeline" => Ok(Self::GetHomeTimeline(record(arguments)?)),
            "create_tweet" => Ok(Self::CreateTweet(record(arguments)?)),
            "reply_to_tweet" => Ok(Self::ReplyToTweet(record(arguments)?)),
            "delete_tweet" => Ok(Self::DeleteTweet(record(arguments)?)),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Tool name this action was invoked under.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetHomeTimeline(_) => "get_home_timeline",
            Self::CreateTweet(_) => "create_tweet",
            Self::ReplyToTweet(_) => "reply_to_tweet",
            Self::DeleteTweet(_) => "delete_tweet",
        }
    }

    /// Rate-limit group this action's remote call belongs to.
    #[must_use]
    pub const fn group(&self) -> EndpointGroup {
        match self {
            Self::GetHomeTimeline(_) => EndpointGroup::HomeTimeline,
            Self::CreateTweet(_) => EndpointGroup::Tweet,
            Self::ReplyToTweet(_) => EndpointGroup::Reply,
            Self::DeleteTweet(_) => EndpointGroup::Delete,
        }
    }
}

/// Executes tool actions against the remote client.
pub struct Dispatcher {
    client: Arc<dyn TwitterApi>,
    limiter: RateLimiter,
    uploader: MediaUploader,
}

impl Dispatcher {
    /// Creates a dispatcher over the given client and rate limiter.
    #[must_use]
    pub fn new(client: Arc<dyn TwitterApi>, limiter: RateLimiter) -> Self {
        let uploader = MediaUploader::new(Arc::clone(&client));
        Self {
            client,
            limiter,
            uploader,
        }
    }

    /// The dispatcher's rate limiter (read access for inspection).
    #[must_use]
    pub const fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Runs one action to completion and returns the remote data payload.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] per the taxonomy: validation, upload and
    /// rate-limit failures as invalid-request; anything else as internal.
    pub async fn dispatch(&self, action: ToolAction) -> Result<Value, ToolError> {
        tracing::debug!(tool = action.name(), "Dispatching tool action");
        match action {
            ToolAction::GetHomeTimeline(args) => self.home_timeline(args).await,
            ToolAction::CreateTweet(args) => self.create_tweet(args).await,
            ToolAction::ReplyToTweet(args) => self.reply_to_tweet(args).await,
            ToolAction::DeleteTweet(args) => self.delete_tweet(args).await,
        }
    }

    async fn home_timeline(&self, args: TimelineArgs) -> Result<Value, ToolError> {
        let limit = args.limit.unwrap_or(DEFAULT_TIMELINE_LIMIT);
        if !(1..=100).contains(&limit) {
            return Err(ToolError::InvalidRequest(format!(
                "limit must be between 1 and 100, got {limit}"
            )));
        }

        let options = TimelineOptions {
            max_results: limit.min(HOME_TIMELINE_FETCH_CAP),
        };
        let client = Arc::clone(&self.client);
        let data = self
            .limiter
            .throttle(EndpointGroup::HomeTimeline, || async move {
                client.home_timeline(&options).await
            })
            .await?;
        Ok(data)
    }

    async fn create_tweet(&self, args: CreateTweetArgs) -> Result<Value, ToolError> {
        validate_text(&args.text)?;
        let media_id = self
            .resolve_attachment(args.image_path.as_deref(), args.video_path.as_deref())
            .await?;

        let request = TweetRequest {
            text: args.text,
            media_id,
            in_reply_to: None,
        };
        let client = Arc::clone(&self.client);
        let data = self
            .limiter
            .throttle(EndpointGroup::Tweet, || async move {
                client.post_tweet(&request).await
            })
            .await?;
        Ok(data)
    }

    async fn reply_to_tweet(&self, args: ReplyArgs) -> Result<Value, ToolError> {
        validate_text(&args.text)?;
        let media_id = self
            .resolve_attachment(args.image_path.as_deref(), args.video_path.as_deref())
            .await?;

        let request = TweetRequest {
            text: args.text,
            media_id,
            in_reply_to: Some(args.tweet_id),
        };
        let client = Arc::clone(&self.client);
        let data = self
            .limiter
            .throttle(EndpointGroup::Reply, || async move {
                client.post_tweet(&request).await
            })
            .await?;
        Ok(data)
    }

    async fn delete_tweet(&self, args: DeleteArgs) -> Result<Value, ToolError> {
        let client = Arc::clone(&self.client);
        let tweet_id = args.tweet_id;
        let data = self
            .limiter
            .throttle(EndpointGroup::Delete, || async move {
                client.delete_tweet(&tweet_id).await
            })
            .await?;
        Ok(data)
    }

    /// Validates and uploads the optional attachment, returning a media ID.
    ///
    /// Runs before any remote call: both paths set is rejected outright,
    /// and a failed validation or upload fails the whole action. Text is
    /// never posted without its attachment.
    async fn resolve_attachment(
        &self,
        image_path: Option<&str>,
        video_path: Option<&str>,
    ) -> Result<Option<String>, ToolError> {
        let (path, class) = match (image_path, video_path) {
            (Some(_), Some(_)) => {
                return Err(ToolError::InvalidRequest(
                    "Provide either image_path or video_path, not both".to_string(),
                ));
            }
            (Some(path), None) => (path, MediaClass::Image),
            (None, Some(path)) => (path, MediaClass::Video),
            (None, None) => return Ok(None),
        };

        let file = media::validate(path, class).await?;
        let media_id = self
            .uploader
            .upload(&file, class)
            .await
            .map_err(|e| ToolError::InvalidRequest(format!("Failed to upload {class}: {e}")))?;
        Ok(Some(media_id))
    }
}

fn validate_text(text: &str) -> Result<(), ToolError> {
    let chars = text.chars().count();
    if chars > MAX_TWEET_CHARS {
        return Err(ToolError::InvalidRequest(format!(
            "Tweet text exceeds {MAX_TWEET_CHARS} characters (got {chars})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_each_action() {
        let action = ToolAction::parse("get_home_timeline", &json!({"limit": 10})).unwrap();
        assert!(matches!(
            action,
            ToolAction::GetHomeTimeline(TimelineArgs { limit: Some(10) })
        ));
        assert_eq!(action.name(), "get_home_timeline");
        assert_eq!(action.group(), EndpointGroup::HomeTimeline);

        let action = ToolAction::parse("create_tweet", &json!({"text": "hello"})).unwrap();
        assert!(matches!(action, ToolAction::CreateTweet(_)));
        assert_eq!(action.group(), EndpointGroup::Tweet);

        let action = ToolAction::parse(
            "reply_to_tweet",
            &json!({"tweet_id": "123", "text": "hi"}),
        )
        .unwrap();
        assert!(matches!(action, ToolAction::ReplyToTweet(_)));
        assert_eq!(action.group(), EndpointGroup::Reply);

        let action = ToolAction::parse("delete_tweet", &json!({"tweet_id": "123"})).unwrap();
        assert!(matches!(action, ToolAction::DeleteTweet(_)));
        assert_eq!(action.group(), EndpointGroup::Delete);
    }

    #[test]
    fn parse_unknown_tool() {
        let error = ToolAction::parse("post_toot", &json!({})).unwrap_err();
        assert!(matches!(error, ToolError::UnknownTool(_)));
    }

    #[test]
    fn parse_missing_required_argument() {
        let error = ToolAction::parse("create_tweet", &json!({})).unwrap_err();
        assert!(matches!(error, ToolError::InvalidRequest(_)));
    }

    #[test]
    fn parse_null_arguments_as_empty() {
        let action = ToolAction::parse("get_home_timeline", &Value::Null).unwrap();
        assert!(matches!(
            action,
            ToolAction::GetHomeTimeline(TimelineArgs { limit: None })
        ));
    }

    #[test]
    fn text_validation_boundary() {
        assert!(validate_text(&"x".repeat(280)).is_ok());
        assert!(validate_text(&"x".repeat(281)).is_err());
        // Character count, not byte count.
        assert!(validate_text(&"ü".repeat(280)).is_ok());
    }
}
