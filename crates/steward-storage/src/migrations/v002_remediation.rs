//! v002: plans, actions, and the backup registry.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    overall_confidence REAL NOT NULL,
    status TEXT NOT NULL,
    rollback_sequence TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS actions (
    id TEXT PRIMARY KEY,
    plan_id TEXT NOT NULL,
    seq INTEGER NOT NULL DEFAULT 0,
    violation_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    subjects TEXT NOT NULL,
    confidence REAL NOT NULL,
    estimated_duration_s REAL NOT NULL,
    prerequisites TEXT NOT NULL,
    success_criteria TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    finished_at INTEGER,
    diagnostics TEXT,
    post_metrics TEXT
);
CREATE INDEX IF NOT EXISTS idx_actions_status ON actions(status);
CREATE INDEX IF NOT EXISTS idx_actions_finished ON actions(finished_at);
CREATE INDEX IF NOT EXISTS idx_actions_plan ON actions(plan_id, seq);

CREATE TABLE IF NOT EXISTS backups (
    action_id TEXT PRIMARY KEY,
    created_at INTEGER NOT NULL,
    location TEXT NOT NULL,
    file_count INTEGER NOT NULL,
    total_bytes INTEGER NOT NULL,
    pruned_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_backups_created ON backups(created_at);
"#;
