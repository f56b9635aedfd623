//! In-process sink.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::audit::{round2, Alert, AuditRecord, EventRecord, Outcome, SinkError, Stats};

use super::Sink;

/// One write, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Record(AuditRecord),
    Event(EventRecord),
    Alert(Alert),
}

/// Sink that keeps every write in memory.
///
/// Clones share the same buffer, so a test can hand one clone to the
/// pipeline and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push(&self, entry: Entry) {
        self.lock().push(entry);
    }

    /// All writes in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.lock().clone()
    }

    /// Audit records in arrival order.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Entry::Record(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Manual events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Entry::Event(ev) => Some(ev.clone()),
                _ => None,
            })
            .collect()
    }

    /// Alerts in arrival order.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Entry::Alert(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drop everything written so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Aggregate counters over the buffered writes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> Stats {
        let entries = self.lock();
        let mut stats = Stats::default();
        let mut total_time = 0.0;
        let mut records = 0u64;

        for entry in entries.iter() {
            match entry {
                Entry::Record(r) => {
                    stats.total_logs += 1;
                    records += 1;
                    total_time += r.response_time_ms;
                    match r.outcome {
                        Outcome::Success => stats.success_count += 1,
                        Outcome::Error => stats.error_count += 1,
                    }
                }
                Entry::Event(_) => stats.total_logs += 1,
                Entry::Alert(_) => {}
            }
        }

        if records > 0 {
            stats.avg_response_time = round2(total_time / records as f64);
        }
        stats
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write_record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.push(Entry::Record(record.clone()));
        Ok(())
    }

    async fn write_event(&self, event: &EventRecord) -> Result<(), SinkError> {
        self.push(Entry::Event(event.clone()));
        Ok(())
    }

    async fn write_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        self.push(Entry::Alert(alert.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{CallContext, EventSeverity, Parameters, RecordBuilder, Redactor, Severity};
    use crate::config::SecurityContextConfig;

    fn record(outcome: Outcome, elapsed_ms: f64) -> AuditRecord {
        RecordBuilder::new(Redactor::new(["password"]), SecurityContextConfig::default()).build(
            &CallContext::new("/api"),
            200,
            elapsed_ms,
            outcome,
            None,
        )
    }

    fn event() -> EventRecord {
        EventRecord {
            timestamp: crate::audit::now_millis(),
            event_type: "security".to_string(),
            severity: EventSeverity::Info,
            message: "m".to_string(),
            metadata: Parameters::new(),
        }
    }

    #[tokio::test]
    async fn test_writes_keep_arrival_order() {
        let sink = MemorySink::new();
        let r = record(Outcome::Success, 1.0);
        let a = Alert::new("API Error", "x", Severity::Error);

        sink.write_record(&r).await.unwrap();
        sink.write_alert(&a).await.unwrap();

        assert_eq!(sink.entries(), vec![Entry::Record(r), Entry::Alert(a)]);
    }

    #[tokio::test]
    async fn test_clones_share_buffer() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        clone.write_event(&event()).await.unwrap();
        assert_eq!(sink.events().len(), 1);

        sink.clear();
        assert!(clone.entries().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let sink = MemorySink::new();
        assert_eq!(sink.stats(), Stats::default());

        sink.write_record(&record(Outcome::Success, 125.5)).await.unwrap();
        sink.write_record(&record(Outcome::Error, 50.2)).await.unwrap();
        sink.write_event(&event()).await.unwrap();
        sink.write_alert(&Alert::new("n", "m", Severity::Error))
            .await
            .unwrap();

        let stats = sink.stats();
        assert_eq!(stats.total_logs, 3);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 1);
        assert!((stats.avg_response_time - 87.85).abs() < f64::EPSILON);
        assert_eq!(sink.records().len(), 2);
        assert_eq!(sink.alerts().len(), 1);
    }
}
