//! Manual event recording.

use std::sync::Arc;

use crate::audit::{now_millis, Alert, EventRecord, EventSeverity, Parameters};

use super::pipeline::Pipeline;

/// Records events that are not tied to a wrapped call.
///
/// Events of severity `error` or `critical` also raise one alert named after
/// the capitalized event type.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    pipeline: Arc<Pipeline>,
}

impl EventRecorder {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Emit an event and, for severe events, its alert. Metadata is redacted
    /// the same way call parameters are. Returns the alert raised, if any.
    pub async fn record(
        &self,
        event_type: &str,
        severity: EventSeverity,
        message: &str,
        metadata: Option<Parameters>,
    ) -> Option<Alert> {
        let metadata = metadata.unwrap_or_default();
        let event = EventRecord {
            timestamp: now_millis(),
            event_type: event_type.to_string(),
            severity,
            message: message.to_string(),
            metadata: self.pipeline.builder().redactor().sanitize(&metadata),
        };
        tracing::debug!(event_type, severity = severity.as_str(), "Recording event");
        self.pipeline.emit_event(&event).await;

        if !severity.raises_alert() {
            return None;
        }

        let alert = Alert::new(capitalize(event_type), message, severity.into());
        self.pipeline.emit_alert(&alert).await;
        Some(alert)
    }
}

/// Upper-case the first character, leaving the rest as is.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
