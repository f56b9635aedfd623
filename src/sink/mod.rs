//! Destinations for audit records, events and alerts.

mod console;
mod memory;
mod schema;
mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::audit::{Alert, AuditRecord, EventRecord, SinkError};
use crate::config::{LoggingConfig, StorageKind};

pub use console::ConsoleSink;
pub use memory::{Entry, MemorySink};
pub use schema::{apply_schema, SCHEMA, SCHEMA_VERSION};
pub use sqlite::{default_database_path, SqliteSink};

/// Durable destination for everything the pipeline emits.
///
/// Each write must be atomic with respect to concurrent writes from other
/// calls. Writes issued by one call arrive in order: the audit record first,
/// then its alerts.
#[async_trait]
pub trait Sink: Send + Sync + std::fmt::Debug {
    /// Persist the audit record of a handled call.
    async fn write_record(&self, record: &AuditRecord) -> Result<(), SinkError>;

    /// Persist a manually recorded event.
    async fn write_event(&self, event: &EventRecord) -> Result<(), SinkError>;

    /// Persist an alert.
    async fn write_alert(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Open the sink selected by the logging configuration.
///
/// # Errors
///
/// Returns an error if the database sink cannot be opened.
pub async fn open_sink(config: &LoggingConfig) -> Result<Arc<dyn Sink>, SinkError> {
    let sink: Arc<dyn Sink> = match config.storage {
        StorageKind::Console => Arc::new(ConsoleSink::new()),
        StorageKind::Memory => Arc::new(MemorySink::new()),
        StorageKind::Database => Arc::new(SqliteSink::open(resolve_database_path(config)).await?),
    };
    tracing::debug!(storage = config.storage.as_str(), "Opened audit sink");
    Ok(sink)
}

/// Path used when a database sink is selected without an explicit path.
#[must_use]
pub fn resolve_database_path(config: &LoggingConfig) -> PathBuf {
    config
        .database_path
        .clone()
        .unwrap_or_else(default_database_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_console_sink() {
        let sink = open_sink(&LoggingConfig::default()).await.unwrap();
        assert!(format!("{sink:?}").contains("ConsoleSink"));
    }

    #[tokio::test]
    async fn test_open_memory_sink() {
        let config = LoggingConfig {
            storage: StorageKind::Memory,
            ..LoggingConfig::default()
        };
        let sink = open_sink(&config).await.unwrap();
        assert!(format!("{sink:?}").contains("MemorySink"));
    }

    #[tokio::test]
    async fn test_open_database_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let config = LoggingConfig {
            storage: StorageKind::Database,
            database_path: Some(path.clone()),
            ..LoggingConfig::default()
        };
        assert_eq!(resolve_database_path(&config), path);

        let sink = open_sink(&config).await.unwrap();
        assert!(format!("{sink:?}").contains("SqliteSink"));
        assert!(path.exists());
    }

    #[test]
    fn test_resolve_database_path_default() {
        let path = resolve_database_path(&LoggingConfig::default());
        assert!(path.ends_with("api-hook/audit.db"));
    }
}
