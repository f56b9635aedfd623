//! Assembly of audit records from call metadata.

use uuid::Uuid;

use crate::config::SecurityContextConfig;

use super::redactor::Redactor;
use super::types::{now_millis, round2, AuditRecord, Outcome, Parameters, SecurityContext};

/// Metadata of one handled call, fixed at call start.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub request_id: Uuid,
    pub user_id: String,
    pub source_ip: String,
    pub endpoint: String,
    pub method: String,
    /// Raw, unredacted parameters. Empty when parameter logging is off.
    pub parameters: Parameters,
}

impl CallContext {
    /// Create a context with a fresh request id and the fallback identity.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: "anonymous".to_string(),
            source_ip: "0.0.0.0".to_string(),
            endpoint: endpoint.into(),
            method: "GET".to_string(),
            parameters: Parameters::new(),
        }
    }

    /// Set the caller identity.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Set the origin address.
    #[must_use]
    pub fn source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }

    /// Set the method label.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Set the raw parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Builds immutable [`AuditRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    redactor: Redactor,
    security_context: SecurityContextConfig,
}

impl RecordBuilder {
    #[must_use]
    pub fn new(redactor: Redactor, security_context: SecurityContextConfig) -> Self {
        Self {
            redactor,
            security_context,
        }
    }

    /// Returns the redactor applied to parameters and responses.
    #[must_use]
    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// Build the record for a finished call.
    ///
    /// The elapsed time is rounded to two decimals with ties away from zero.
    #[must_use]
    pub fn build(
        &self,
        context: &CallContext,
        response_code: u16,
        elapsed_ms: f64,
        outcome: Outcome,
        error_message: Option<String>,
    ) -> AuditRecord {
        AuditRecord {
            timestamp: now_millis(),
            request_id: context.request_id,
            user_id: context.user_id.clone(),
            source_ip: context.source_ip.clone(),
            method: context.method.clone(),
            endpoint: context.endpoint.clone(),
            parameters: self.redactor.sanitize(&context.parameters),
            response_code,
            response_time_ms: round2(elapsed_ms),
            security_context: SecurityContext {
                authentication_method: self.security_context.authentication_method.clone(),
                authorization_level: self.security_context.authorization_level.clone(),
                session_id: context.request_id,
            },
            outcome,
            error_message,
            response: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> RecordBuilder {
        RecordBuilder::new(
            Redactor::new(["password"]),
            SecurityContextConfig::default(),
        )
    }

    #[test]
    fn test_call_context_defaults() {
        let ctx = CallContext::new("/api/v1/users");
        assert!(!ctx.request_id.is_nil());
        assert_eq!(ctx.user_id, "anonymous");
        assert_eq!(ctx.source_ip, "0.0.0.0");
        assert_eq!(ctx.method, "GET");
        assert!(ctx.parameters.is_empty());
    }

    #[test]
    fn test_call_context_fresh_request_ids() {
        let a = CallContext::new("/a");
        let b = CallContext::new("/a");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_build_success_record() {
        let mut params = Parameters::new();
        params.insert("username".to_string(), json!("john_doe"));
        params.insert("password".to_string(), json!("secret123"));

        let ctx = CallContext::new("/api/v1/users")
            .user_id("user123")
            .source_ip("192.168.1.100")
            .method("POST")
            .parameters(params);

        let record = builder().build(&ctx, 200, 125.456, Outcome::Success, None);

        assert_eq!(record.request_id, ctx.request_id);
        assert_eq!(record.user_id, "user123");
        assert_eq!(record.source_ip, "192.168.1.100");
        assert_eq!(record.method, "POST");
        assert_eq!(record.endpoint, "/api/v1/users");
        assert_eq!(record.parameters["username"], "john_doe");
        assert!(record.parameters["password"]
            .as_str()
            .unwrap()
            .starts_with("REDACTED:"));
        assert_eq!(record.response_code, 200);
        assert!((record.response_time_ms - 125.46).abs() < f64::EPSILON);
        assert_eq!(record.outcome, Outcome::Success);
        assert!(record.error_message.is_none());
        assert!(record.response.is_none());
    }

    #[test]
    fn test_security_context_shape() {
        let ctx = CallContext::new("/x");
        let record = builder().build(&ctx, 500, 1.0, Outcome::Error, Some("boom".to_string()));

        assert_eq!(record.security_context.authentication_method, "OAuth2");
        assert_eq!(record.security_context.authorization_level, "User");
        assert_eq!(record.security_context.session_id, ctx.request_id);
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_security_context_override() {
        let builder = RecordBuilder::new(
            Redactor::new(Vec::<String>::new()),
            SecurityContextConfig {
                authentication_method: "mTLS".to_string(),
                authorization_level: "Admin".to_string(),
            },
        );
        let record = builder.build(&CallContext::new("/x"), 200, 0.0, Outcome::Success, None);
        assert_eq!(record.security_context.authentication_method, "mTLS");
        assert_eq!(record.security_context.authorization_level, "Admin");
    }
}
