//! Sink that writes JSON lines through `tracing`.

use async_trait::async_trait;

use crate::audit::{Alert, AuditRecord, EventRecord, SinkError};

use super::Sink;

/// Emits each write as one JSON log line on the `api_hook::audit` target.
///
/// Records and events go out at `info`, alerts at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn write_record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record)?;
        tracing::info!(target: "api_hook::audit", request_id = %record.request_id, "API Log: {json}");
        Ok(())
    }

    async fn write_event(&self, event: &EventRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(event)?;
        tracing::info!(target: "api_hook::audit", event_type = %event.event_type, "Event: {json}");
        Ok(())
    }

    async fn write_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        let json = serde_json::to_string(alert)?;
        tracing::warn!(target: "api_hook::audit", severity = alert.severity.as_str(), "ALERT: {json}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{EventSeverity, Parameters, Severity};

    #[tokio::test]
    async fn test_console_sink_accepts_writes() {
        let sink = ConsoleSink::new();
        let alert = Alert::new("Security", "Suspicious login pattern detected", Severity::Critical);
        sink.write_alert(&alert).await.unwrap();

        let event = EventRecord {
            timestamp: crate::audit::now_millis(),
            event_type: "security".to_string(),
            severity: EventSeverity::Critical,
            message: "Suspicious login pattern detected".to_string(),
            metadata: Parameters::new(),
        };
        sink.write_event(&event).await.unwrap();
    }
}
