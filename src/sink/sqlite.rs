//! `SQLite` sink with async operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::audit::{
    round2, Alert, AuditRecord, EventRecord, Outcome, Severity, SinkError, Stats,
};

use super::schema::apply_schema;
use super::Sink;

/// Returns the default path for the audit database.
///
/// This is `~/.local/share/api-hook/audit.db` on Unix systems.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("api-hook")
        .join("audit.db")
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn corrupt(column: &'static str, value: &str) -> SinkError {
    SinkError::Corrupt {
        column,
        value: value.to_string(),
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, SinkError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| corrupt("timestamp", s))
}

/// Raw `api_logs` row before JSON columns are decoded.
struct RecordRow {
    request_id: String,
    timestamp: String,
    user_id: String,
    source_ip: String,
    method: String,
    endpoint: String,
    parameters: String,
    response_code: u16,
    response_time_ms: f64,
    security_context: String,
    result: String,
    error_message: Option<String>,
    response: Option<String>,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            request_id: row.get(0)?,
            timestamp: row.get(1)?,
            user_id: row.get(2)?,
            source_ip: row.get(3)?,
            method: row.get(4)?,
            endpoint: row.get(5)?,
            parameters: row.get(6)?,
            response_code: row.get(7)?,
            response_time_ms: row.get(8)?,
            security_context: row.get(9)?,
            result: row.get(10)?,
            error_message: row.get(11)?,
            response: row.get(12)?,
        })
    }

    fn into_record(self) -> Result<AuditRecord, SinkError> {
        Ok(AuditRecord {
            timestamp: parse_ts(&self.timestamp)?,
            request_id: Uuid::parse_str(&self.request_id)
                .map_err(|_| corrupt("request_id", &self.request_id))?,
            user_id: self.user_id,
            source_ip: self.source_ip,
            method: self.method,
            endpoint: self.endpoint,
            parameters: serde_json::from_str(&self.parameters)?,
            response_code: self.response_code,
            response_time_ms: self.response_time_ms,
            security_context: serde_json::from_str(&self.security_context)?,
            outcome: Outcome::parse(&self.result).ok_or_else(|| corrupt("result", &self.result))?,
            error_message: self.error_message,
            response: self
                .response
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
        })
    }
}

/// Sink backed by a `SQLite` database.
///
/// Uses `spawn_blocking` for every statement; the connection mutex makes
/// each write atomic with respect to concurrent calls.
#[derive(Debug, Clone)]
pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteSink {
    /// Open a database at the specified path.
    ///
    /// Creates parent directories if they don't exist and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| SinkError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, SinkError> {
            let conn =
                Connection::open(&path_clone).map_err(|source| SinkError::DatabaseOpen {
                    path: path_clone,
                    source,
                })?;
            apply_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|_| SinkError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self, SinkError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, SinkError> {
            let conn = Connection::open_in_memory()?;
            apply_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|_| SinkError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, SinkError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, SinkError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(|_| SinkError::TaskCancelled)?
    }

    /// Get the most recent audit records, newest first, optionally for one
    /// endpoint only.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored JSON column is corrupt.
    pub async fn get_records(
        &self,
        endpoint: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>, SinkError> {
        let endpoint = endpoint.map(str::to_string);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT request_id, timestamp, user_id, source_ip, method, endpoint, parameters,
                        response_code, response_time_ms, security_context, result, error_message, response
                 FROM api_logs WHERE (?1 IS NULL OR endpoint = ?1)
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![endpoint, limit], RecordRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(RecordRow::into_record).collect()
        })
        .await
    }

    /// Get the most recent alerts, newest first, optionally of one severity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_alerts(
        &self,
        severity: Option<Severity>,
        limit: usize,
    ) -> Result<Vec<Alert>, SinkError> {
        let severity = severity.map(|s| s.as_str().to_string());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, alert_name, message, severity
                 FROM alerts WHERE (?1 IS NULL OR severity = ?1)
                 ORDER BY id DESC LIMIT ?2",
            )?;

            let alerts = stmt
                .query_map(params![severity, limit], |row| {
                    let timestamp: String = row.get(0)?;
                    let alert_name: String = row.get(1)?;
                    let message: String = row.get(2)?;
                    let severity: String = row.get(3)?;
                    Ok((timestamp, alert_name, message, severity))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            alerts
                .into_iter()
                .map(|(timestamp, alert_name, message, severity)| -> Result<Alert, SinkError> {
                    Ok(Alert {
                        timestamp: parse_ts(&timestamp)?,
                        alert_name,
                        message,
                        severity: Severity::parse(&severity)
                            .ok_or_else(|| corrupt("severity", &severity))?,
                    })
                })
                .collect()
        })
        .await
    }

    /// Count stored audit records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_records(&self) -> Result<u64, SinkError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM api_logs", [], |row| row.get(0))?;
            Ok(count.unsigned_abs())
        })
        .await
    }

    /// Count alerts of one severity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_alerts(&self, severity: Severity) -> Result<u64, SinkError> {
        let severity = severity.as_str().to_string();
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM alerts WHERE severity = ?1",
                params![severity],
                |row| row.get(0),
            )?;
            Ok(count.unsigned_abs())
        })
        .await
    }

    /// Returns the schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn schema_version(&self) -> Result<Option<u32>, SinkError> {
        self.with_conn(|conn| {
            let version: Option<u32> =
                conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
            Ok(version)
        })
        .await
    }

    /// Aggregate counters over stored records and events.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn stats(&self) -> Result<Stats, SinkError> {
        self.with_conn(|conn| {
            let (records, success, error, avg): (i64, i64, i64, Option<f64>) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(result = 'success'), 0),
                        COALESCE(SUM(result = 'error'), 0),
                        AVG(response_time_ms)
                 FROM api_logs",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
            let events: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;

            Ok(Stats {
                total_logs: records.unsigned_abs() + events.unsigned_abs(),
                success_count: success.unsigned_abs(),
                error_count: error.unsigned_abs(),
                avg_response_time: avg.map_or(0.0, round2),
            })
        })
        .await
    }
}

#[async_trait]
impl Sink for SqliteSink {
    async fn write_record(&self, record: &AuditRecord) -> Result<(), SinkError> {
        let request_id = record.request_id.to_string();
        let timestamp = format_ts(&record.timestamp);
        let user_id = record.user_id.clone();
        let source_ip = record.source_ip.clone();
        let method = record.method.clone();
        let endpoint = record.endpoint.clone();
        let parameters = serde_json::to_string(&record.parameters)?;
        let response_code = record.response_code;
        let response_time_ms = record.response_time_ms;
        let security_context = serde_json::to_string(&record.security_context)?;
        let result = record.outcome.as_str();
        let error_message = record.error_message.clone();
        let response = record
            .response
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO api_logs (request_id, timestamp, user_id, source_ip, method, endpoint, parameters,
                                       response_code, response_time_ms, security_context, result, error_message, response)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    request_id,
                    timestamp,
                    user_id,
                    source_ip,
                    method,
                    endpoint,
                    parameters,
                    response_code,
                    response_time_ms,
                    security_context,
                    result,
                    error_message,
                    response
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn write_event(&self, event: &EventRecord) -> Result<(), SinkError> {
        let timestamp = format_ts(&event.timestamp);
        let event_type = event.event_type.clone();
        let severity = event.severity.as_str();
        let message = event.message.clone();
        let metadata = serde_json::to_string(&event.metadata)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO events (timestamp, event_type, severity, message, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, event_type, severity, message, metadata],
            )?;
            Ok(())
        })
        .await
    }

    async fn write_alert(&self, alert: &Alert) -> Result<(), SinkError> {
        let timestamp = format_ts(&alert.timestamp);
        let alert_name = alert.alert_name.clone();
        let message = alert.message.clone();
        let severity = alert.severity.as_str();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO alerts (timestamp, alert_name, message, severity)
                 VALUES (?1, ?2, ?3, ?4)",
                params![timestamp, alert_name, message, severity],
            )?;
            Ok(())
        })
        .await
    }
}
