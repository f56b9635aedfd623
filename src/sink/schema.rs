//! Database schema for the `SQLite` sink.

use rusqlite::Connection;

/// Current schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the audit database.
pub const SCHEMA: &str = r"
-- Enable WAL mode for better concurrent read/write performance
PRAGMA journal_mode = WAL;

-- One row per handled call
CREATE TABLE IF NOT EXISTS api_logs (
    request_id TEXT PRIMARY KEY NOT NULL,
    timestamp TEXT NOT NULL,
    user_id TEXT NOT NULL,
    source_ip TEXT NOT NULL,
    method TEXT NOT NULL,
    endpoint TEXT NOT NULL,
    parameters TEXT NOT NULL,
    response_code INTEGER NOT NULL,
    response_time_ms REAL NOT NULL,
    security_context TEXT NOT NULL,
    result TEXT NOT NULL,
    error_message TEXT,
    response TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Manually recorded events
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    message TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Alerts raised by rules and severe events
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    alert_name TEXT NOT NULL,
    message TEXT NOT NULL,
    severity TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Schema version table for migrations
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_api_logs_endpoint ON api_logs(endpoint);
CREATE INDEX IF NOT EXISTS idx_api_logs_timestamp ON api_logs(timestamp);
CREATE INDEX IF NOT EXISTS idx_api_logs_result ON api_logs(result);
CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);
CREATE INDEX IF NOT EXISTS idx_alerts_severity ON alerts(severity);
";

/// Apply [`SCHEMA`] and record [`SCHEMA_VERSION`]. Safe to run on every open.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_schema_version() {
        assert_eq!(SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        for table in ["api_logs", "events", "alerts", "schema_version"] {
            assert!(table_exists(&conn, table), "Table {table} should exist");
        }
    }

    #[test]
    fn test_schema_creates_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let expected_indexes = [
            "idx_api_logs_endpoint",
            "idx_api_logs_timestamp",
            "idx_api_logs_result",
            "idx_events_event_type",
            "idx_alerts_severity",
        ];

        for index_name in expected_indexes {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name=?",
                    [index_name],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Index {index_name} should exist");
        }
    }

    #[test]
    fn test_schema_request_id_unique() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let insert = "INSERT INTO api_logs (request_id, timestamp, user_id, source_ip, method, endpoint, parameters, response_code, response_time_ms, security_context, result)
                      VALUES ('r1', datetime('now'), 'u', '0.0.0.0', 'GET', '/x', '{}', 200, 1.0, '{}', 'success')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Apply schema twice - should not error due to IF NOT EXISTS
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        assert!(table_exists(&conn, "api_logs"));
    }

    #[test]
    fn test_apply_schema_records_version_once() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let versions: Vec<u32> = conn
            .prepare("SELECT version FROM schema_version")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(versions, vec![SCHEMA_VERSION]);
    }
}
