//! Authenticator implementation
//!
//! Applies resolved credentials to request builders.

use super::types::AuthConfig;
use crate::config::AuthLocation;
use reqwest::RequestBuilder;

/// Applies authentication to HTTP requests
#[derive(Debug, Clone)]
pub struct Authenticator {
    config: AuthConfig,
}

impl Authenticator {
    /// Create a new authenticator with the given resolved config
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Apply authentication to a request builder
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.config {
            AuthConfig::None => req,

            AuthConfig::ApiKey {
                location,
                header_name,
                query_param,
                prefix,
                value,
            } => {
                let val = format!("{}{}", prefix.as_deref().unwrap_or(""), value);
                match location {
                    AuthLocation::Header => {
                        let header = header_name.as_deref().unwrap_or("Authorization");
                        req.header(header, val)
                    }
                    AuthLocation::Query => {
                        let param = query_param.as_deref().unwrap_or("api_key");
                        req.query(&[(param, val)])
                    }
                }
            }

            AuthConfig::Basic { username, password } => req.basic_auth(username, Some(password)),

            AuthConfig::Bearer { token } => req.bearer_auth(token),
        }
    }
}
