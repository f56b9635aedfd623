//! Caller identity extraction from call arguments.

use crate::audit::Parameters;

/// Identity used when the extractor finds no caller.
pub const DEFAULT_USER_ID: &str = "anonymous";
/// Origin used when the extractor finds no address.
pub const DEFAULT_SOURCE_IP: &str = "0.0.0.0";
/// Method used when the extractor finds no method label.
pub const DEFAULT_METHOD: &str = "GET";

/// Caller metadata derived from a call's arguments. Missing values fall back
/// to [`DEFAULT_USER_ID`], [`DEFAULT_SOURCE_IP`] and [`DEFAULT_METHOD`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerInfo {
    pub user_id: Option<String>,
    pub source_ip: Option<String>,
    pub method: Option<String>,
}

impl CallerInfo {
    #[must_use]
    pub fn user_id_or_default(&self) -> &str {
        self.user_id.as_deref().unwrap_or(DEFAULT_USER_ID)
    }

    #[must_use]
    pub fn source_ip_or_default(&self) -> &str {
        self.source_ip.as_deref().unwrap_or(DEFAULT_SOURCE_IP)
    }

    #[must_use]
    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_METHOD)
    }
}

/// Strategy for deriving caller metadata, chosen when the interceptor is built.
pub trait CallerExtractor: Send + Sync {
    fn extract(&self, parameters: &Parameters) -> CallerInfo;
}

impl<F> CallerExtractor for F
where
    F: Fn(&Parameters) -> CallerInfo + Send + Sync,
{
    fn extract(&self, parameters: &Parameters) -> CallerInfo {
        self(parameters)
    }
}

/// Reads caller metadata from string-valued parameter keys.
///
/// Defaults to `user_id`, `source_ip` and `method`. Non-string values are
/// treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExtractor {
    user_id_key: String,
    source_ip_key: String,
    method_key: String,
}

impl KeyExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user_id_key: "user_id".to_string(),
            source_ip_key: "source_ip".to_string(),
            method_key: "method".to_string(),
        }
    }

    /// Use a different key for the caller identity.
    #[must_use]
    pub fn user_id_key(mut self, key: impl Into<String>) -> Self {
        self.user_id_key = key.into();
        self
    }

    /// Use a different key for the origin address.
    #[must_use]
    pub fn source_ip_key(mut self, key: impl Into<String>) -> Self {
        self.source_ip_key = key.into();
        self
    }

    /// Use a different key for the method label.
    #[must_use]
    pub fn method_key(mut self, key: impl Into<String>) -> Self {
        self.method_key = key.into();
        self
    }
}

impl Default for KeyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CallerExtractor for KeyExtractor {
    fn extract(&self, parameters: &Parameters) -> CallerInfo {
        let get = |key: &str| {
            parameters
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        CallerInfo {
            user_id: get(&self.user_id_key),
            source_ip: get(&self.source_ip_key),
            method: get(&self.method_key),
        }
    }
}
