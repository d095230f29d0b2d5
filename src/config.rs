//! Configuration management for athena-mcp.
//!
//! Two layers live here:
//! - [`ExecutionContext`], the AWS identity and Athena defaults resolved once
//!   from a [`ConfigSource`] (normally the process environment).
//! - [`Config`], the optional TOML file controlling the poll policy and the
//!   AWS CLI location.

use crate::error::{AthenaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_CATALOG: &str = "AwsDataCatalog";
pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_WORKGROUP: &str = "TFP-Primary";

/// A read-only view of key/value configuration state.
pub trait ConfigSource {
    /// Returns the value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns the first non-empty value among `keys`.
    fn first_non_empty(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.is_empty())
    }
}

/// Reads configuration from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory configuration source.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    vars: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Explicit AWS credentials.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl Credentials {
    /// True when both the key id and the secret are configured.
    pub fn is_complete(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .finish()
    }
}

/// Resolved connection and identity parameters shared by every tool call.
///
/// Built once at startup; never mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub region: String,
    pub credentials: Credentials,
    pub catalog: String,
    pub database: String,
    pub workgroup: String,
    pub output_location: Option<String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            credentials: Credentials::default(),
            catalog: DEFAULT_CATALOG.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            workgroup: DEFAULT_WORKGROUP.to_string(),
            output_location: None,
        }
    }
}

impl ExecutionContext {
    /// Resolves the context from `source`, applying the fixed defaults.
    ///
    /// Empty values count as unset. A configured output location must be an
    /// `s3://` URL.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let output_location = source.first_non_empty(&["ATHENA_OUTPUT_LOCATION"]);
        if let Some(location) = &output_location {
            validate_output_location(location)?;
        }

        Ok(Self {
            region: source
                .first_non_empty(&["AWS_REGION", "AWS_DEFAULT_REGION"])
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credentials: Credentials {
                access_key_id: source.first_non_empty(&["AWS_ACCESS_KEY_ID"]),
                secret_access_key: source.first_non_empty(&["AWS_SECRET_ACCESS_KEY"]),
                session_token: source.first_non_empty(&["AWS_SESSION_TOKEN"]),
            },
            catalog: source
                .first_non_empty(&["ATHENA_CATALOG"])
                .unwrap_or_else(|| DEFAULT_CATALOG.to_string()),
            database: source
                .first_non_empty(&["ATHENA_DATABASE"])
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            workgroup: source
                .first_non_empty(&["ATHENA_WORKGROUP"])
                .unwrap_or_else(|| DEFAULT_WORKGROUP.to_string()),
            output_location,
        })
    }

    /// Returns the environment for an AWS CLI subprocess.
    ///
    /// Starts from `ambient` and overlays the resolved identity and region.
    /// Credentials are only written when configured, so ambient credentials
    /// (profiles, SSO exports) survive an unset field.
    pub fn subprocess_env<I, K, V>(&self, ambient: I) -> HashMap<OsString, OsString>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut env: HashMap<OsString, OsString> = ambient
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let creds = &self.credentials;
        let overlay = [
            ("AWS_ACCESS_KEY_ID", creds.access_key_id.as_deref()),
            ("AWS_SECRET_ACCESS_KEY", creds.secret_access_key.as_deref()),
            ("AWS_SESSION_TOKEN", creds.session_token.as_deref()),
            ("AWS_REGION", Some(self.region.as_str())),
            ("AWS_DEFAULT_REGION", Some(self.region.as_str())),
        ];
        for (key, value) in overlay {
            if let Some(value) = value {
                env.insert(key.into(), value.into());
            }
        }

        env
    }

    /// Returns a secret-free summary for display.
    pub fn summary(&self) -> ContextSummary {
        ContextSummary {
            region: self.region.clone(),
            default_catalog: self.catalog.clone(),
            default_database: self.database.clone(),
            default_workgroup: self.workgroup.clone(),
            default_output_location: self.output_location.clone(),
            has_credentials: self.credentials.is_complete(),
        }
    }
}

/// Display-safe view of the execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub region: String,
    pub default_catalog: String,
    pub default_database: String,
    pub default_workgroup: String,
    pub default_output_location: Option<String>,
    pub has_credentials: bool,
}

fn validate_output_location(location: &str) -> Result<()> {
    let url = Url::parse(location).map_err(|e| {
        AthenaError::config(format!("Invalid ATHENA_OUTPUT_LOCATION '{location}': {e}"))
    })?;

    if url.scheme() != "s3" {
        return Err(AthenaError::config(format!(
            "Invalid scheme '{}' in ATHENA_OUTPUT_LOCATION. Expected 's3'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AthenaError::config(format!(
            "ATHENA_OUTPUT_LOCATION '{location}' has no bucket"
        )));
    }

    Ok(())
}

/// Settings file for athena-mcp.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query polling settings.
    #[serde(default)]
    pub query: QueryConfig,

    /// AWS CLI settings.
    #[serde(default)]
    pub aws: AwsCliConfig,
}

/// Query polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Delay between status checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of status checks before giving up.
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    60
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl QueryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// AWS CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsCliConfig {
    /// Path or name of the `aws` executable.
    #[serde(default = "default_cli_path")]
    pub cli_path: PathBuf,
}

fn default_cli_path() -> PathBuf {
    PathBuf::from("aws")
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-mcp")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AthenaError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            AthenaError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        if config.query.max_poll_attempts == 0 {
            return Err(AthenaError::config(format!(
                "max_poll_attempts in {} must be at least 1",
                path.display()
            )));
        }

        Ok(config)
    }
}
