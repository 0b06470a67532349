//! Resolved authentication configuration

use crate::config::{AuthDef, AuthLocation, RuntimeConfig};
use crate::error::Result;

/// Authentication configuration with secrets resolved
///
/// Built from an [`AuthDef`] by looking up the named keys in the runtime
/// config. Secret values live only here; they are never logged.
#[derive(Clone)]
pub enum AuthConfig {
    /// No authentication
    None,

    /// API key in a header or query parameter
    ApiKey {
        location: AuthLocation,
        header_name: Option<String>,
        query_param: Option<String>,
        prefix: Option<String>,
        value: String,
    },

    /// Bearer token
    Bearer { token: String },

    /// Basic authentication
    Basic { username: String, password: String },
}

impl AuthConfig {
    /// Resolve an auth definition against the runtime config
    pub fn resolve(def: &AuthDef, config: &RuntimeConfig) -> Result<Self> {
        Ok(match def {
            AuthDef::None => Self::None,
            AuthDef::ApiKey {
                location,
                header_name,
                query_param,
                prefix,
                key,
            } => Self::ApiKey {
                location: *location,
                header_name: header_name.clone(),
                query_param: query_param.clone(),
                prefix: prefix.clone(),
                value: config.require(key)?.to_string(),
            },
            AuthDef::Bearer { key } => Self::Bearer {
                token: config.require(key)?.to_string(),
            },
            AuthDef::Basic {
                username_key,
                password_key,
            } => Self::Basic {
                username: config.require(username_key)?.to_string(),
                password: config.require(password_key)?.to_string(),
            },
        })
    }
}

// Redact secrets from debug output
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "AuthConfig::None"),
            Self::ApiKey { location, .. } => f
                .debug_struct("AuthConfig::ApiKey")
                .field("location", location)
                .finish_non_exhaustive(),
            Self::Bearer { .. } => write!(f, "AuthConfig::Bearer {{ .. }}"),
            Self::Basic { .. } => write!(f, "AuthConfig::Basic {{ .. }}"),
        }
    }
}
