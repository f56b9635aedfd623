//! API Hook - call interception with redacted audit records and anomaly alerts.
//!
//! Wrap an operation with [`hook::Monitored::call`] and every invocation is
//! timed, its parameters redacted, an [`audit::AuditRecord`] written to a
//! [`sink::Sink`], and the record checked against the anomaly rules. The
//! operation's own result or error is returned unchanged.

pub mod audit;
pub mod config;
pub mod hook;
pub mod sink;
pub mod telemetry;

pub use audit::{Alert, AuditRecord, EventRecord, EventSeverity, Outcome, Parameters, Severity};
pub use config::{ConfigLoader, HookConfig};
pub use hook::{ApiHook, HookError, MonitorOptions, Monitored, SecurityLevel};
pub use sink::{ConsoleSink, MemorySink, Sink, SqliteSink};
