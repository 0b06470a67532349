//! Retry policy
//!
//! Decides, for a failed attempt, whether to retry and how long to wait.
//! Every decision is a pure function of the attempt counts and the failure
//! itself, which keeps the policy independently testable; the caller owns
//! the sleep.
//!
//! Rate-limit responses (429) draw on their own attempt budget so a slow
//! but well-behaved API does not exhaust the transient-failure budget.

use crate::config::Tunables;
use crate::error::Error;
use crate::http::PageResponse;
use rand::Rng;
use std::time::Duration;

/// What a single attempt produced, as the policy sees it
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The server answered with a non-2xx status
    Status {
        status: u16,
        retry_after: Option<u64>,
        body: String,
    },
    /// The request never completed
    Transport { timeout: bool, message: String },
}

impl AttemptOutcome {
    /// Build from a non-success response
    pub fn from_response(response: &PageResponse) -> Self {
        let body = match &response.body {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::Status {
            status: response.status,
            retry_after: response.retry_after(),
            body,
        }
    }

    /// Build from a transport-level error
    pub fn transport(error: &Error) -> Self {
        Self::Transport {
            timeout: matches!(error, Error::Timeout { .. }),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, .. } => write!(f, "HTTP {status}"),
            Self::Transport { timeout: true, .. } => write!(f, "timeout"),
            Self::Transport { message, .. } => write!(f, "{message}"),
        }
    }
}

/// The policy's verdict for one failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting this long
    RetryAfter(Duration),
    /// The failure is permanent or the budget is spent
    GiveUp,
}

/// Per-call attempt bookkeeping
///
/// Created for each page fetch, destroyed when the call settles.
/// Transient failures and rate limits are counted separately.
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    transient_attempts: u32,
    rate_limit_attempts: u32,
}

impl RetryContext {
    /// Create a fresh context
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed transient attempts recorded so far
    pub fn transient_attempts(&self) -> u32 {
        self.transient_attempts
    }

    /// Rate-limited attempts recorded so far
    pub fn rate_limit_attempts(&self) -> u32 {
        self.rate_limit_attempts
    }

    /// All failed attempts recorded so far
    pub fn total_attempts(&self) -> u32 {
        self.transient_attempts + self.rate_limit_attempts
    }

    /// Record a failed attempt against the matching budget
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Status { status: 429, .. } => self.rate_limit_attempts += 1,
            _ => self.transient_attempts += 1,
        }
    }

    /// Convert the final failure into the terminal error for the call
    pub fn into_error(self, outcome: &AttemptOutcome) -> Error {
        match outcome {
            AttemptOutcome::Status {
                status: status @ (401 | 403),
                body,
                ..
            } => Error::auth(*status, body.clone()),
            AttemptOutcome::Status {
                status: 429,
                retry_after,
                ..
            } => Error::RateLimited {
                retry_after_seconds: retry_after.unwrap_or(60),
            },
            AttemptOutcome::Status { status, body, .. } if (400..500).contains(status) => {
                Error::http_status(*status, body.clone())
            }
            _ => Error::RetriesExhausted {
                attempts: self.total_attempts() + 1,
                last_error: outcome.to_string(),
            },
        }
    }
}

/// Retry policy: exponential backoff with cap, server-directed waits for
/// rate limits, immediate give-up on permanent failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts for transient failures (first try included)
    pub max_attempts: u32,
    /// Maximum attempts for rate-limited responses
    pub rate_limit_max_attempts: u32,
    /// Initial backoff delay
    pub base: Duration,
    /// Backoff cap
    pub cap: Duration,
    /// Apply jitter to waits
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1), Duration::from_secs(60))
    }
}

impl RetryPolicy {
    /// Create a policy with the given transient budget and backoff bounds
    pub fn new(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            rate_limit_max_attempts: max_attempts.saturating_mul(2),
            base,
            cap,
            jitter: true,
        }
    }

    /// Build a policy from the sync tunables
    pub fn from_tunables(tunables: &Tunables) -> Self {
        Self::new(
            tunables.max_attempts,
            tunables.backoff_initial,
            tunables.backoff_cap,
        )
    }

    /// Disable jitter (deterministic waits, for tests)
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Decide what to do about a failed attempt
    ///
    /// Pure: depends only on the context's counters and the outcome.
    pub fn decide(&self, ctx: &RetryContext, outcome: &AttemptOutcome) -> RetryDecision {
        match outcome {
            // Permanent: bad credentials or a malformed request
            AttemptOutcome::Status {
                status: 401 | 403, ..
            } => RetryDecision::GiveUp,

            AttemptOutcome::Status {
                status: 429,
                retry_after,
                ..
            } => {
                if ctx.rate_limit_attempts + 1 >= self.rate_limit_max_attempts {
                    RetryDecision::GiveUp
                } else {
                    let wait = retry_after
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| self.backoff(ctx.rate_limit_attempts));
                    RetryDecision::RetryAfter(wait)
                }
            }

            AttemptOutcome::Status { status, .. } if (500..600).contains(status) => {
                self.transient(ctx)
            }

            // Remaining 4xx are client errors; retrying cannot help
            AttemptOutcome::Status { .. } => RetryDecision::GiveUp,

            AttemptOutcome::Transport { .. } => self.transient(ctx),
        }
    }

    fn transient(&self, ctx: &RetryContext) -> RetryDecision {
        if ctx.transient_attempts + 1 >= self.max_attempts {
            RetryDecision::GiveUp
        } else {
            RetryDecision::RetryAfter(self.backoff(ctx.transient_attempts))
        }
    }

    /// Backoff for a given attempt: `min(cap, base * 2^attempt)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.base.saturating_mul(factor), self.cap)
    }

    /// Apply jitter to a decided wait (half to full duration)
    pub fn jittered(&self, wait: Duration) -> Duration {
        if !self.jitter || wait.is_zero() {
            return wait;
        }
        let half = wait / 2;
        let extra = rand::thread_rng().gen_range(0..=half.as_nanos() as u64);
        half + Duration::from_nanos(extra)
    }
}
