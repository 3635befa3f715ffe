//! v003: daily file metric rollups and the event log.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS file_metric_daily (
    path TEXT NOT NULL,
    day INTEGER NOT NULL,
    samples INTEGER NOT NULL,
    min_lines INTEGER NOT NULL,
    max_lines INTEGER NOT NULL,
    avg_lines REAL NOT NULL,
    max_debt INTEGER NOT NULL,
    PRIMARY KEY (path, day)
);

CREATE TABLE IF NOT EXISTS event_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    at INTEGER NOT NULL,
    name TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_event_log_at ON event_log(at);
"#;
