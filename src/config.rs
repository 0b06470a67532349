//! Configuration types for sync definitions
//!
//! Two layers of configuration, loaded once at sync start and immutable
//! thereafter:
//!
//! - A YAML *sync definition* declaring the source and the tables to sync
//!   (endpoints, primary keys, pagination strategy, incremental cursor).
//! - A flat string-keyed *runtime config* supplying credentials and
//!   tunables, validated into [`Tunables`] before any network activity.

use crate::error::{Error, Result};
use crate::types::Method;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Sync Definition (YAML)
// ============================================================================

/// Complete sync definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDefinition {
    /// Kind of definition (always "sync")
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Definition version
    #[serde(default = "default_version")]
    pub version: String,

    /// Definition metadata
    pub metadata: DefinitionMetadata,

    /// Source API description
    pub source: SourceConfig,

    /// Tables to sync
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

fn default_kind() -> String {
    "sync".to_string()
}

fn default_version() -> String {
    "1".to_string()
}

/// Definition metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionMetadata {
    /// Unique definition name (e.g., "pipedrive")
    pub name: String,

    /// Description of the source
    #[serde(default)]
    pub description: Option<String>,
}

/// Source API description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL for API requests
    pub base_url: String,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthDef,

    /// Default headers for all requests
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Default query parameters for all requests
    #[serde(default)]
    pub params: HashMap<String, String>,
}

// ============================================================================
// Auth Definition
// ============================================================================

/// Authentication configuration from YAML
///
/// Secret values are never written in the definition; each variant names
/// the runtime config key that holds the secret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthDef {
    /// No authentication
    #[default]
    None,

    /// API Key authentication
    ApiKey {
        /// Where to put the key
        #[serde(default)]
        location: AuthLocation,
        /// Header name (for header location)
        #[serde(default)]
        header_name: Option<String>,
        /// Query parameter name (for query location)
        #[serde(default)]
        query_param: Option<String>,
        /// Prefix to add before the value (e.g., "Bearer ")
        #[serde(default)]
        prefix: Option<String>,
        /// Runtime config key holding the API key
        key: String,
    },

    /// Bearer token authentication
    Bearer {
        /// Runtime config key holding the token
        key: String,
    },

    /// Basic authentication
    Basic {
        /// Runtime config key holding the username
        username_key: String,
        /// Runtime config key holding the password
        password_key: String,
    },
}

impl AuthDef {
    /// Runtime config keys this auth scheme reads
    pub fn referenced_keys(&self) -> Vec<&str> {
        match self {
            AuthDef::None => Vec::new(),
            AuthDef::ApiKey { key, .. } | AuthDef::Bearer { key } => vec![key.as_str()],
            AuthDef::Basic {
                username_key,
                password_key,
            } => vec![username_key.as_str(), password_key.as_str()],
        }
    }
}

/// Location for API key
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthLocation {
    #[default]
    Header,
    Query,
}

// ============================================================================
// Table Config
// ============================================================================

/// Declaration of one destination table and how to fetch it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Destination table name
    pub name: String,

    /// API endpoint path
    pub endpoint: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Query parameters specific to this table
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// Additional headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Path to the record array within the response envelope
    /// (dot notation, e.g. "$.data"; wildcards supported)
    #[serde(default)]
    pub record_path: Option<String>,

    /// Primary key columns (on the flattened row)
    pub primary_key: Vec<String>,

    /// Optional column type hints for the destination
    #[serde(default)]
    pub column_types: HashMap<String, ColumnType>,

    /// Pagination configuration
    #[serde(default)]
    pub pagination: PaginationDef,

    /// Incremental sync configuration
    #[serde(default)]
    pub incremental: Option<IncrementalDef>,

    /// Reconcile deletions by diffing the full key set against known keys
    #[serde(default)]
    pub soft_delete: bool,

    /// Array fields broken out into child tables
    #[serde(default)]
    pub breakout: Vec<BreakoutDef>,
}

/// Column type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Integer,
    Number,
    Boolean,
    Timestamp,
    Json,
}

/// Pagination configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationDef {
    /// Single request, no pagination
    #[default]
    None,

    /// Numeric offset advanced by the page size
    Offset {
        offset_param: String,
        limit_param: String,
    },

    /// Page counter
    PageNumber {
        page_param: String,
        #[serde(default = "default_start_page")]
        start_page: u32,
        #[serde(default)]
        page_size_param: Option<String>,
        /// Path to an explicit has-more flag, if the API provides one
        #[serde(default)]
        has_more_path: Option<String>,
    },

    /// Cursor token extracted from the response
    Cursor {
        cursor_param: String,
        cursor_path: String,
    },

    /// Literal next-page URL from the response
    ///
    /// `path` points into the body; when absent, the `Link` header's
    /// `rel="next"` entry is followed instead.
    NextLink {
        #[serde(default)]
        path: Option<String>,
    },
}

fn default_start_page() -> u32 {
    1
}

/// Incremental sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncrementalDef {
    /// Field on the flattened row to use as cursor
    pub cursor_field: String,

    /// Query parameter carrying the cursor on requests
    pub cursor_param: String,
}

/// One array field broken out into a child table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakoutDef {
    /// Array field on the parent record
    pub field: String,

    /// Destination child table name
    pub table: String,

    /// Column on child rows referencing the parent primary key
    pub parent_key_column: String,
}

impl SyncDefinition {
    /// Validate the definition, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.source.base_url.is_empty() {
            return Err(Error::config("source.base_url must not be empty"));
        }
        url::Url::parse(&self.source.base_url)?;

        if self.tables.is_empty() {
            return Err(Error::config("definition declares no tables"));
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(Error::config(format!(
                    "duplicate table name '{}'",
                    table.name
                )));
            }
            if table.primary_key.is_empty() {
                return Err(Error::config(format!(
                    "table '{}' declares no primary key columns",
                    table.name
                )));
            }
            for breakout in &table.breakout {
                if breakout.table == table.name {
                    return Err(Error::config(format!(
                        "breakout table '{}' collides with its parent",
                        breakout.table
                    )));
                }
            }
            if table.soft_delete && table.incremental.is_some() {
                return Err(Error::config(format!(
                    "table '{}': soft_delete requires a full key-set pass and \
                     cannot be combined with incremental",
                    table.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Result<&TableConfig> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::TableNotFound {
                table: name.to_string(),
            })
    }
}

/// Load a sync definition from a YAML file
pub fn load_definition(path: impl AsRef<Path>) -> Result<SyncDefinition> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    load_definition_from_str(&contents)
}

/// Load a sync definition from a YAML string
pub fn load_definition_from_str(yaml: &str) -> Result<SyncDefinition> {
    let definition: SyncDefinition = serde_yaml::from_str(yaml)?;
    definition.validate()?;
    Ok(definition)
}

// ============================================================================
// Runtime Config (flat string map)
// ============================================================================

/// Flat string-keyed runtime configuration
///
/// Supplies credentials and tunables. Loaded once at sync start; nested
/// objects and arrays are rejected.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    values: HashMap<String, String>,
}

impl RuntimeConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an existing string map
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Load from a JSON file containing a flat string-keyed object
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Parse from a JSON string containing a flat string-keyed object
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value
            .as_object()
            .ok_or_else(|| Error::config("runtime config must be a JSON object"))?;

        let mut values = HashMap::new();
        for (key, val) in object {
            let string = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(Error::InvalidConfigValue {
                        key: key.clone(),
                        message: "must be a scalar (flat config, no nesting)".to_string(),
                    })
                }
            };
            values.insert(key.clone(), string);
        }
        Ok(Self { values })
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Get a required value
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::missing_key(key))
    }

    /// Insert a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Iterate over keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

// ============================================================================
// Tunables
// ============================================================================

/// Typed sync tunables parsed from the runtime config
///
/// All fields have defaults; unknown config keys (keys that are neither
/// tunables nor referenced by the definition's auth) are rejected up front.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Records requested per page
    pub page_size: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum attempts per HTTP call (first try included)
    pub max_attempts: u32,
    /// Initial backoff delay
    pub backoff_initial: Duration,
    /// Backoff cap
    pub backoff_cap: Duration,
    /// Checkpoint after this many emitted rows (in addition to per page)
    pub checkpoint_rows: usize,
    /// Outbound requests per second
    pub requests_per_second: u32,
    /// Tables synced concurrently
    pub table_concurrency: usize,
    /// Optional sync-level deadline
    pub deadline: Option<Duration>,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            page_size: 100,
            request_timeout: Duration::from_secs(30),
            max_attempts: 5,
            backoff_initial: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(60),
            checkpoint_rows: 1000,
            requests_per_second: 10,
            table_concurrency: 1,
            deadline: None,
        }
    }
}

const TUNABLE_KEYS: &[&str] = &[
    "page_size",
    "request_timeout_seconds",
    "max_attempts",
    "backoff_initial_ms",
    "backoff_cap_ms",
    "checkpoint_rows",
    "requests_per_second",
    "table_concurrency",
    "deadline_seconds",
];

impl Tunables {
    /// Parse tunables from the runtime config, rejecting unknown keys
    ///
    /// `definition` supplies the set of credential keys the auth scheme is
    /// allowed to read; anything else unrecognized is an error, reported
    /// before any network activity.
    pub fn from_config(config: &RuntimeConfig, definition: &SyncDefinition) -> Result<Self> {
        let allowed: HashSet<&str> = TUNABLE_KEYS
            .iter()
            .copied()
            .chain(definition.source.auth.referenced_keys())
            .collect();

        for key in config.keys() {
            if !allowed.contains(key) {
                return Err(Error::UnknownConfigKey {
                    key: key.to_string(),
                });
            }
        }
        for key in definition.source.auth.referenced_keys() {
            config.require(key)?;
        }

        let mut tunables = Self::default();
        if let Some(v) = config.get("page_size") {
            tunables.page_size = parse_key("page_size", v)?;
            if tunables.page_size == 0 {
                return Err(Error::InvalidConfigValue {
                    key: "page_size".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if let Some(v) = config.get("request_timeout_seconds") {
            tunables.request_timeout = Duration::from_secs(parse_key("request_timeout_seconds", v)?);
        }
        if let Some(v) = config.get("max_attempts") {
            tunables.max_attempts = parse_key("max_attempts", v)?;
            if tunables.max_attempts == 0 {
                return Err(Error::InvalidConfigValue {
                    key: "max_attempts".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if let Some(v) = config.get("backoff_initial_ms") {
            tunables.backoff_initial = Duration::from_millis(parse_key("backoff_initial_ms", v)?);
        }
        if let Some(v) = config.get("backoff_cap_ms") {
            tunables.backoff_cap = Duration::from_millis(parse_key("backoff_cap_ms", v)?);
        }
        if let Some(v) = config.get("checkpoint_rows") {
            tunables.checkpoint_rows = parse_key("checkpoint_rows", v)?;
        }
        if let Some(v) = config.get("requests_per_second") {
            tunables.requests_per_second = parse_key("requests_per_second", v)?;
        }
        if let Some(v) = config.get("table_concurrency") {
            tunables.table_concurrency = parse_key("table_concurrency", v)?;
            if tunables.table_concurrency == 0 {
                return Err(Error::InvalidConfigValue {
                    key: "table_concurrency".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if let Some(v) = config.get("deadline_seconds") {
            let secs: u64 = parse_key("deadline_seconds", v)?;
            tunables.deadline = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(tunables)
    }
}

fn parse_key<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidConfigValue {
        key: key.to_string(),
        message: format!("could not parse '{value}'"),
    })
}
