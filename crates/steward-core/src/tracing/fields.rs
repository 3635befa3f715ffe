//! Structured field names used in spans and events across Steward.
//!
//! Consistent names keep log queries and dashboards stable.

/// Scanner: files measured in the cycle.
pub const SCAN_FILE_COUNT: &str = "scan_file_count";

/// Scanner: files skipped after read, encoding, or timeout errors.
pub const SCAN_SKIPPED: &str = "scan_skipped";

/// Scanner: cycle duration in milliseconds.
pub const SCAN_DURATION_MS: &str = "scan_duration_ms";

/// Monitor: violations emitted by one evaluation.
pub const MONITOR_VIOLATIONS: &str = "monitor_violations";

/// Detector: predictive violations emitted by one pass.
pub const DETECTOR_VIOLATIONS: &str = "detector_violations";

/// Storage: batch write time in milliseconds.
pub const BATCH_WRITE_TIME: &str = "batch_write_time";

/// Executor: action wall-clock time in milliseconds.
pub const ACTION_DURATION_MS: &str = "action_duration_ms";

/// SLO: deviation from target.
pub const SLO_DEVIATION: &str = "slo_deviation";

/// Orchestrator: overall health in [0, 1].
pub const OVERALL_HEALTH: &str = "overall_health";
