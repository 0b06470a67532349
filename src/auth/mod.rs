//! Authentication for source API requests
//!
//! Resolves the definition's auth scheme against the flat runtime config
//! and applies credentials to outgoing requests.

mod authenticator;
mod types;


pub use authenticator::Authenticator;
pub use types::AuthConfig;
