//! Masking of sensitive call parameters.
//!
//! Only top-level keys are inspected. A sensitive key nested inside another
//! mapping (`{"user": {"password": "..."}}`) passes through untouched.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::SecurityConfig;

use super::types::Parameters;

/// Prefix of every redaction tag.
pub const REDACTED_PREFIX: &str = "REDACTED:";

/// Number of hex characters of the digest kept in a tag.
pub const DIGEST_PREFIX_LEN: usize = 16;

/// Replaces sensitive parameter values with a digest-derived tag.
#[derive(Debug, Clone)]
pub struct Redactor {
    sensitive_fields: Vec<String>,
    enabled: bool,
}

impl Redactor {
    /// Create an enabled redactor for the given field names. Repeated names
    /// are kept once, in first-seen order.
    pub fn new<I, S>(sensitive_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields: Vec<String> = Vec::new();
        for field in sensitive_fields {
            let field = field.into();
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Self {
            sensitive_fields: fields,
            enabled: true,
        }
    }

    /// Build a redactor from the security section of the config.
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            enabled: config.encrypt_sensitive_data,
            ..Self::new(config.sensitive_fields.iter().cloned())
        }
    }

    /// Returns the configured sensitive field names.
    #[must_use]
    pub fn sensitive_fields(&self) -> &[String] {
        &self.sensitive_fields
    }

    /// Whether redaction is applied at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return a copy of `parameters` with every sensitive top-level value
    /// replaced by `REDACTED:<16 hex chars>`.
    ///
    /// Running this over already sanitized output hashes the existing tag
    /// again, so the result changes but never exposes the original value.
    #[must_use]
    pub fn sanitize(&self, parameters: &Parameters) -> Parameters {
        let mut sanitized = parameters.clone();
        if !self.enabled {
            return sanitized;
        }

        for field in &self.sensitive_fields {
            if let Some(value) = sanitized.get_mut(field) {
                *value = Value::String(redaction_tag(value));
            }
        }

        sanitized
    }

    /// Sanitize an arbitrary JSON value. Objects are sanitized at the top
    /// level; anything else is returned unchanged.
    #[must_use]
    pub fn sanitize_value(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.sanitize(map)),
            other => other.clone(),
        }
    }
}

/// Tag for a single value: strings hash their raw text, everything else
/// hashes its compact JSON form.
#[must_use]
pub fn redaction_tag(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    format!("{REDACTED_PREFIX}{}", &digest[..DIGEST_PREFIX_LEN])
}
