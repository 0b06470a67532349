//! HTTP client adapter
//!
//! Issues single requests with auth and rate limiting applied. Retries are
//! not handled here; the [`crate::retry`] module decides them and
//! [`send_with_retry`] drives the loop.

mod client;
mod rate_limit;


pub use client::{send_with_retry, HttpClient, HttpClientConfig, PageRequest, PageResponse};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
