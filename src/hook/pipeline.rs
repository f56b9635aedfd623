//! Shared emission path: record, rules, alerts.

use std::sync::Arc;

use crate::audit::{Alert, AuditRecord, EventRecord, RecordBuilder, Redactor, RuleEngine};
use crate::config::{ConfigError, HookConfig};
use crate::sink::Sink;

/// Read-only state shared by every call and event.
///
/// Sink failures are logged and swallowed here so they never change what the
/// wrapped operation's caller observes.
#[derive(Debug)]
pub struct Pipeline {
    builder: RecordBuilder,
    rules: RuleEngine,
    sink: Arc<dyn Sink>,
}

impl Pipeline {
    fn new(builder: RecordBuilder, rules: RuleEngine, sink: Arc<dyn Sink>) -> Self {
        Self {
            builder,
            rules,
            sink,
        }
    }

    /// Validate `config` and assemble a pipeline from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration is rejected.
    pub fn from_config(config: &HookConfig, sink: Arc<dyn Sink>) -> Result<Self, ConfigError> {
        config.validate()?;
        let builder = RecordBuilder::new(
            Redactor::from_config(&config.security),
            config.security_context.clone(),
        );
        let rules = RuleEngine::new(config.performance.slow_call_threshold_ms);
        Ok(Self::new(builder, rules, sink))
    }

    #[must_use]
    pub fn builder(&self) -> &RecordBuilder {
        &self.builder
    }

    #[must_use]
    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Write the record, evaluate the rules on it, then write every alert.
    /// Returns the alerts that were raised.
    pub async fn emit_record(&self, record: &AuditRecord) -> Vec<Alert> {
        if let Err(e) = self.sink.write_record(record).await {
            tracing::error!(
                request_id = %record.request_id,
                endpoint = %record.endpoint,
                error = %e,
                "Failed to write audit record"
            );
        }

        let alerts = self.rules.evaluate(record);
        for alert in &alerts {
            self.emit_alert(alert).await;
        }
        alerts
    }

    /// Write a manual event.
    pub async fn emit_event(&self, event: &EventRecord) {
        if let Err(e) = self.sink.write_event(event).await {
            tracing::error!(event_type = %event.event_type, error = %e, "Failed to write event");
        }
    }

    /// Write a single alert.
    pub async fn emit_alert(&self, alert: &Alert) {
        tracing::debug!(
            alert = %alert.alert_name,
            severity = alert.severity.as_str(),
            "Alert raised"
        );
        if let Err(e) = self.sink.write_alert(alert).await {
            tracing::error!(alert = %alert.alert_name, error = %e, "Failed to write alert");
        }
    }
}
