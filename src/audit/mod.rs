//! Audit records, redaction and anomaly rules.

mod builder;
mod error;
mod redactor;
mod rules;
mod types;

pub use builder::{CallContext, RecordBuilder};
pub use error::SinkError;
pub use redactor::{redaction_tag, Redactor, DIGEST_PREFIX_LEN, REDACTED_PREFIX};
pub use rules::{RuleEngine, API_ERROR, SLOW_RESPONSE_TIME, UNAUTHORIZED_ACCESS};
pub use types::{
    now_millis, round2, Alert, AuditRecord, EventRecord, EventSeverity, Outcome, Parameters,
    SecurityContext, Severity, Stats,
};
