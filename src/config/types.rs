//! Configuration types.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where audit records, events and alerts are written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Structured log lines through `tracing`.
    #[default]
    Console,
    /// In-process buffer, mostly useful for tests.
    Memory,
    /// `SQLite` database at [`LoggingConfig::database_path`].
    Database,
}

impl StorageKind {
    /// Returns the string representation used in config files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::Memory => "memory",
            Self::Database => "database",
        }
    }
}

/// Redaction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Top-level parameter names whose values are never logged in plaintext.
    pub sensitive_fields: Vec<String>,
    /// Replace sensitive values with a digest tag.
    pub encrypt_sensitive_data: bool,
    /// Digest used for redaction tags. Only SHA-256 is supported.
    pub hash_algorithm: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: ["password", "api_key", "token", "secret"]
                .into_iter()
                .map(String::from)
                .collect(),
            encrypt_sensitive_data: true,
            hash_algorithm: "SHA256".to_string(),
        }
    }
}

/// Log level and storage destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, e.g. `info` or `api_hook=debug`.
    pub level: String,
    /// Storage destination.
    pub storage: StorageKind,
    /// Database file, required when `storage = "database"`.
    pub database_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            storage: StorageKind::Console,
            database_path: None,
        }
    }
}

/// Anomaly rule thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Calls slower than this raise a `Slow Response Time` alert.
    pub slow_call_threshold_ms: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            slow_call_threshold_ms: 5000.0,
        }
    }
}

/// Values stamped into every record's security context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityContextConfig {
    pub authentication_method: String,
    pub authorization_level: String,
}

impl Default for SecurityContextConfig {
    fn default() -> Self {
        Self {
            authentication_method: "OAuth2".to_string(),
            authorization_level: "User".to_string(),
        }
    }
}

/// Complete hook configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub security_context: SecurityContextConfig,
}

impl HookConfig {
    /// Check the configuration for values the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_sha256(&self.security.hash_algorithm) {
            return Err(ConfigError::Invalid(format!(
                "unsupported hash algorithm '{}', expected SHA256",
                self.security.hash_algorithm
            )));
        }

        let threshold = self.performance.slow_call_threshold_ms;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "slow_call_threshold_ms must be a positive number, got {threshold}"
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.security.sensitive_fields {
            if field.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "sensitive field names must not be empty".to_string(),
                ));
            }
            if !seen.insert(field.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate sensitive field '{field}'"
                )));
            }
        }

        if self.logging.storage == StorageKind::Database && self.logging.database_path.is_none() {
            return Err(ConfigError::Invalid(
                "storage = \"database\" requires logging.database_path".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_sha256(name: &str) -> bool {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_uppercase();
    normalized == "SHA256"
}
