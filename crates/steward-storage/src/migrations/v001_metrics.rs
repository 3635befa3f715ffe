//! v001: metric time series, violations, SLO samples, heartbeats.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS file_metrics (
    path TEXT NOT NULL,
    sampled_at INTEGER NOT NULL,
    line_count INTEGER NOT NULL,
    char_count INTEGER NOT NULL,
    link_count INTEGER NOT NULL,
    header_count INTEGER NOT NULL,
    debt_marker_count INTEGER NOT NULL,
    max_header_depth INTEGER NOT NULL,
    format_issue_count INTEGER NOT NULL,
    has_title INTEGER NOT NULL,
    content_hash INTEGER NOT NULL,
    PRIMARY KEY (path, sampled_at)
);
CREATE INDEX IF NOT EXISTS idx_file_metrics_sampled ON file_metrics(sampled_at);

CREATE TABLE IF NOT EXISTS system_metrics (
    sampled_at INTEGER PRIMARY KEY,
    file_count INTEGER NOT NULL,
    total_lines INTEGER NOT NULL,
    duplication_ratio REAL NOT NULL,
    cognitive_steps REAL NOT NULL,
    compliance_ratio REAL NOT NULL,
    debt_marker_total INTEGER NOT NULL,
    scan_duration_ms INTEGER NOT NULL,
    skipped_files INTEGER NOT NULL,
    root_document_present INTEGER NOT NULL,
    cycle_errors INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS violations (
    id TEXT PRIMARY KEY,
    detected_at INTEGER NOT NULL,
    kind TEXT NOT NULL,
    severity TEXT NOT NULL,
    subject_key TEXT NOT NULL,
    subject TEXT NOT NULL,
    current_value REAL NOT NULL,
    threshold_value REAL NOT NULL,
    predictive INTEGER NOT NULL,
    confidence REAL NOT NULL,
    time_to_breach REAL,
    message TEXT NOT NULL DEFAULT '',
    closed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_violations_open ON violations(closed_at);
CREATE INDEX IF NOT EXISTS idx_violations_detected ON violations(detected_at);

CREATE TABLE IF NOT EXISTS slo_samples (
    metric TEXT NOT NULL,
    sampled_at INTEGER NOT NULL,
    value REAL NOT NULL,
    target REAL NOT NULL,
    compliant INTEGER NOT NULL,
    deviation REAL NOT NULL,
    PRIMARY KEY (metric, sampled_at)
);

CREATE TABLE IF NOT EXISTS heartbeats (
    worker TEXT PRIMARY KEY,
    last_beat_at INTEGER NOT NULL,
    status TEXT NOT NULL,
    error_count INTEGER NOT NULL,
    uptime_seconds REAL NOT NULL,
    restart_count INTEGER NOT NULL DEFAULT 0
);
"#;
