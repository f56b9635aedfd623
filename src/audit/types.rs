//! Audit record, event and alert types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key/value arguments of a handled call.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Outcome of a handled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The operation returned normally.
    Success,
    /// The operation signaled a failure.
    Error,
}

impl Outcome {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INFO" => Some(Self::Info),
            "WARNING" => Some(Self::Warning),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Severity of a manually recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventSeverity {
    /// Returns the string representation for database storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Whether an event of this severity also raises an alert.
    #[must_use]
    pub fn raises_alert(&self) -> bool {
        matches!(self, Self::Error | Self::Critical)
    }
}

impl From<EventSeverity> for Severity {
    fn from(severity: EventSeverity) -> Self {
        match severity {
            EventSeverity::Info => Self::Info,
            EventSeverity::Warning => Self::Warning,
            EventSeverity::Error => Self::Error,
            EventSeverity::Critical => Self::Critical,
        }
    }
}

/// Fixed-shape security context attached to every audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub authentication_method: String,
    pub authorization_level: String,
    /// Always the request id of the record's call.
    pub session_id: Uuid,
}

/// One audit record per handled call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the record was built, millisecond precision.
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub user_id: String,
    pub source_ip: String,
    pub method: String,
    pub endpoint: String,
    /// Parameters after redaction.
    pub parameters: Parameters,
    pub response_code: u16,
    /// Elapsed wall time, rounded to two decimals.
    pub response_time_ms: f64,
    pub security_context: SecurityContext,
    #[serde(rename = "result")]
    pub outcome: Outcome,
    pub error_message: Option<String>,
    /// Redacted response body, only when response logging is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl AuditRecord {
    /// Attach an already redacted response body.
    #[must_use]
    pub fn with_response(mut self, response: Option<serde_json::Value>) -> Self {
        self.response = response;
        self
    }

    /// Whether the call failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.outcome == Outcome::Error
    }
}

/// A manually recorded event not tied to a handled call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub severity: EventSeverity,
    pub message: String,
    pub metadata: Parameters,
}

/// An alert raised by the rule engine or by a severe event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub alert_name: String,
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    /// Create an alert stamped with the current time.
    pub fn new(alert_name: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            timestamp: now_millis(),
            alert_name: alert_name.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Aggregate counters over stored audit records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Audit records plus manual events.
    pub total_logs: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Mean `response_time_ms` over audit records, rounded to two decimals.
    pub avg_response_time: f64,
}

/// Current UTC time truncated to milliseconds.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    use chrono::SubsecRound;
    Utc::now().trunc_subsecs(3)
}

/// Round to two decimals, ties away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
