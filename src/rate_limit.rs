//! Per-endpoint-group rate limiting.
//!
//! The X API free tier grants a small fixed quota per 15-minute window per
//! endpoint category, and it does not tell the client how much quota is
//! left. This limiter assumes every successful call spends the whole
//! window: after a success (or a remote 429) the group is unusable until
//! the cooldown elapses. Over-throttling is preferred to a hard remote
//! block.
//!
//! Each group's state sits behind its own mutex, held across the guarded
//! operation, so at most one call per group is in flight and the
//! read-then-write on the reset instant cannot race.
//!
//! State is process-local and never persisted.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::twitter::ApiError;

/// The default cooldown window: the X API free-tier quota window.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Default extra wait on top of a group's reset instant.
pub const DEFAULT_WAIT_BUFFER: Duration = Duration::from_secs(1);

/// The fixed set of throttled endpoint groups, one per tool action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointGroup {
    /// Home timeline fetches.
    HomeTimeline,
    /// Tweet creation.
    Tweet,
    /// Replies.
    Reply,
    /// Tweet deletion.
    Delete,
}

impl EndpointGroup {
    /// All groups, in slot order.
    pub const ALL: [Self; 4] = [Self::HomeTimeline, Self::Tweet, Self::Reply, Self::Delete];

    /// Short name used in log lines and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HomeTimeline => "home",
            Self::Tweet => "tweet",
            Self::Reply => "reply",
            Self::Delete => "delete",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::HomeTimeline => 0,
            Self::Tweet => 1,
            Self::Reply => 2,
            Self::Delete => 3,
        }
    }
}

impl fmt::Display for EndpointGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by [`RateLimiter::throttle`].
#[derive(Error, Debug)]
pub enum ThrottleError {
    /// The remote side answered 429; the group is now in cooldown.
    #[error("Rate limit reached for {group}. Try again in {window_minutes} minutes.")]
    RateLimited {
        /// The endpoint group that was throttled.
        group: EndpointGroup,
        /// Length of the cooldown window in minutes.
        window_minutes: u64,
    },

    /// Any other remote failure, propagated unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Serialises and throttles remote calls per endpoint group.
///
/// Owned by the server root and injected into the dispatcher; tests build
/// isolated instances per scenario.
pub struct RateLimiter {
    /// Not-usable-before instant per group, `None` meaning unset.
    /// Monotonically non-decreasing per group: successes and 429s only
    /// push it forward.
    slots: [Mutex<Option<Instant>>; 4],
    cooldown: Duration,
    wait_buffer: Duration,
}

impl RateLimiter {
    /// Creates a limiter with the given cooldown window and wait buffer.
    #[must_use]
    pub fn new(cooldown: Duration, wait_buffer: Duration) -> Self {
        Self {
            slots: std::array::from_fn(|_| Mutex::new(None)),
            cooldown,
            wait_buffer,
        }
    }

    /// Runs `operation` under the group's throttle policy.
    ///
    /// If the group is inside its cooldown window, the call suspends until
    /// the window (plus the wait buffer) elapses; it is never rejected up
    /// front. After a successful call the group's reset instant moves to
    /// now + cooldown unconditionally. A remote 429 also starts a cooldown
    /// and surfaces as [`ThrottleError::RateLimited`]; any other failure
    /// propagates unchanged and leaves the group's state untouched.
    ///
    /// The group's mutex is held for the whole call, so concurrent
    /// invocations against one group execute one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::RateLimited`] on a remote 429 and
    /// [`ThrottleError::Api`] for every other remote failure.
    pub async fn throttle<T, F, Fut>(
        &self,
        group: EndpointGroup,
        operation: F,
    ) -> Result<T, ThrottleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut slot = self.slots[group.slot()].lock().await;

        if let Some(reset) = *slot {
            let now = Instant::now();
            if now < reset {
                let wake = reset + self.wait_buffer;
                tracing::info!(
                    group = %group,
                    wait_secs = (wake - now).as_secs(),
                    "Endpoint group in cooldown, deferring call"
                );
                tokio::time::sleep_until(wake).await;
            }
        }

        match operation().await {
            Ok(value) => {
                // Assume the call spent the window's quota.
                *slot = Some(Instant::now() + self.cooldown);
                Ok(value)
            }
            Err(err) if err.is_rate_limited() => {
                *slot = Some(Instant::now() + self.cooldown);
                tracing::warn!(group = %group, "Remote rate limit hit, starting cooldown");
                Err(ThrottleError::RateLimited {
                    group,
                    window_minutes: self.cooldown.as_secs() / 60,
                })
            }
            Err(err) => Err(ThrottleError::Api(err)),
        }
    }

    /// The group's current not-usable-before instant, if set.
    pub async fn reset_at(&self, group: EndpointGroup) -> Option<Instant> {
        *self.slots[group.slot()].lock().await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_WAIT_BUFFER)
    }
}
