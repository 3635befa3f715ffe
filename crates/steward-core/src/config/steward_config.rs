//! Top-level Steward configuration with layered resolution.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::orchestrator_config::parse_hh_mm;
use super::{
    BackupConfig, DetectorConfig, EmergencyConfig, ExecutorConfig, OrchestratorConfig,
    PlannerConfig, ScanConfig, SloConfig, StorageConfig, SupervisionConfig, ThresholdConfig,
};
use crate::constants::PROJECT_CONFIG_FILE;
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. CLI flags (applied via `apply_cli_overrides`)
/// 2. Environment variables (`STEWARD_*`)
/// 3. Project config (`steward.toml` in the working root)
/// 4. User config (`~/.steward/config.toml`)
/// 5. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StewardConfig {
    pub scan: ScanConfig,
    pub thresholds: ThresholdConfig,
    pub detector: DetectorConfig,
    pub executor: ExecutorConfig,
    pub planner: PlannerConfig,
    pub backup: BackupConfig,
    pub orchestrator: OrchestratorConfig,
    pub supervision: SupervisionConfig,
    pub emergency: EmergencyConfig,
    pub slo: SloConfig,
    pub storage: StorageConfig,
}

/// CLI override arguments that can be applied to a config.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub roots: Vec<String>,
    pub results_root: Option<String>,
    pub auto_execute: Option<bool>,
    pub scan_interval_s: Option<u64>,
    /// Explicit project config file, replacing `<root>/steward.toml`. Must exist.
    pub config_file: Option<PathBuf>,
}

impl StewardConfig {
    /// Load configuration for the working root `root`.
    pub fn load(root: &Path, cli_overrides: Option<&CliOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(user_config_path) = user_config_path() {
            if user_config_path.exists() {
                match Self::merge_toml_file(&mut config, &user_config_path) {
                    Ok(()) => {}
                    Err(e @ ConfigError::ParseError { .. }) => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "ignoring unreadable user config");
                    }
                }
            }
        }

        match cli_overrides.and_then(|c| c.config_file.as_deref()) {
            Some(explicit) => Self::merge_toml_file(&mut config, explicit)?,
            None => {
                let project_config_path = root.join(PROJECT_CONFIG_FILE);
                if project_config_path.exists() {
                    Self::merge_toml_file(&mut config, &project_config_path)?;
                }
            }
        }

        Self::apply_env_overrides(&mut config);

        if let Some(cli) = cli_overrides {
            Self::apply_cli_overrides(&mut config, cli);
        }

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: StewardConfig = toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate the configuration values.
    pub fn validate(config: &StewardConfig) -> Result<(), ConfigError> {
        let t = &config.thresholds;
        check_unit("thresholds.duplication", t.duplication)?;
        check_unit("thresholds.min_compliance", t.min_compliance)?;
        if let Some(steps) = t.max_cognitive_steps {
            if steps < 1.0 {
                return Err(invalid("thresholds.max_cognitive_steps", "must be at least 1.0"));
            }
        }
        if t.max_file_lines == Some(0) {
            return Err(invalid("thresholds.max_file_lines", "must be greater than 0"));
        }

        let d = &config.detector;
        if let Some(c) = d.contamination {
            if !(c > 0.0 && c < 0.5) {
                return Err(invalid("detector.contamination", "must be in (0.0, 0.5)"));
            }
        }
        check_unit("detector.correlation_threshold", d.correlation_threshold)?;
        check_unit("detector.cluster_edge_threshold", d.cluster_edge_threshold)?;

        check_unit("executor.confidence_gate", config.executor.confidence_gate)?;
        if config.executor.max_concurrent == Some(0) {
            return Err(invalid("executor.max_concurrent", "must be greater than 0"));
        }
        if let Some(t) = config.executor.per_action_timeout_s {
            if t <= 0.0 {
                return Err(invalid("executor.per_action_timeout_s", "must be positive"));
            }
        }

        let o = &config.orchestrator;
        for (field, value) in [
            ("orchestrator.scan_interval_s", o.scan_interval_s),
            ("orchestrator.pattern_interval_s", o.pattern_interval_s),
            ("orchestrator.slo_interval_s", o.slo_interval_s),
            ("orchestrator.heartbeat_interval_s", o.heartbeat_interval_s),
        ] {
            if value == Some(0) {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        if let Some(ref at) = o.daily_report_at {
            if parse_hh_mm(at).is_none() {
                return Err(invalid("orchestrator.daily_report_at", "expected HH:MM"));
            }
        }

        check_unit("emergency.min_health", config.emergency.min_health)?;
        if let Some(f) = config.emergency.response_time_factor {
            if f < 1.0 {
                return Err(invalid("emergency.response_time_factor", "must be at least 1.0"));
            }
        }
        Ok(())
    }

    /// Merge a TOML file into the existing config.
    /// Unknown keys are silently ignored.
    fn merge_toml_file(config: &mut StewardConfig, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let file_config: StewardConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.merge(&file_config);
        Ok(())
    }

    /// Overlay the `Some` values of `other`.
    pub fn merge(&mut self, other: &StewardConfig) {
        self.scan.merge(&other.scan);
        self.thresholds.merge(&other.thresholds);
        self.detector.merge(&other.detector);
        self.executor.merge(&other.executor);
        self.planner.merge(&other.planner);
        self.backup.merge(&other.backup);
        self.orchestrator.merge(&other.orchestrator);
        self.supervision.merge(&other.supervision);
        self.emergency.merge(&other.emergency);
        self.slo.merge(&other.slo);
        self.storage.merge(&other.storage);
    }

    /// Apply environment variable overrides.
    /// Pattern: `STEWARD_<SECTION>_<FIELD>`, e.g. `STEWARD_THRESHOLDS_MAX_FILE_LINES`.
    fn apply_env_overrides(config: &mut StewardConfig) {
        if let Ok(val) = std::env::var("STEWARD_SCAN_ROOTS") {
            let roots: Vec<String> = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !roots.is_empty() {
                config.scan.roots = roots;
            }
        }
        env_override("STEWARD_THRESHOLDS_MAX_FILE_LINES", &mut config.thresholds.max_file_lines);
        env_override("STEWARD_THRESHOLDS_DUPLICATION", &mut config.thresholds.duplication);
        env_override(
            "STEWARD_THRESHOLDS_MAX_DEBT_MARKERS",
            &mut config.thresholds.max_debt_markers,
        );
        env_override(
            "STEWARD_THRESHOLDS_MAX_COGNITIVE_STEPS",
            &mut config.thresholds.max_cognitive_steps,
        );
        env_override("STEWARD_THRESHOLDS_MIN_COMPLIANCE", &mut config.thresholds.min_compliance);
        env_override("STEWARD_DETECTOR_CONTAMINATION", &mut config.detector.contamination);
        env_override(
            "STEWARD_DETECTOR_CORRELATION_THRESHOLD",
            &mut config.detector.correlation_threshold,
        );
        env_override("STEWARD_EXECUTOR_MAX_CONCURRENT", &mut config.executor.max_concurrent);
        env_override(
            "STEWARD_EXECUTOR_PER_ACTION_TIMEOUT_S",
            &mut config.executor.per_action_timeout_s,
        );
        env_override("STEWARD_EXECUTOR_CONFIDENCE_GATE", &mut config.executor.confidence_gate);
        env_override("STEWARD_PLANNER_AUTO_EXECUTE", &mut config.planner.auto_execute);
        env_override("STEWARD_BACKUP_RETENTION_DAYS", &mut config.backup.retention_days);
        env_override(
            "STEWARD_ORCHESTRATOR_SCAN_INTERVAL_S",
            &mut config.orchestrator.scan_interval_s,
        );
        env_override(
            "STEWARD_ORCHESTRATOR_PATTERN_INTERVAL_S",
            &mut config.orchestrator.pattern_interval_s,
        );
        env_override(
            "STEWARD_ORCHESTRATOR_SLO_INTERVAL_S",
            &mut config.orchestrator.slo_interval_s,
        );
        if let Ok(val) = std::env::var("STEWARD_ORCHESTRATOR_RESULTS_ROOT") {
            config.orchestrator.results_root = Some(val);
        }
        env_override("STEWARD_SUPERVISION_MAX_RESTARTS", &mut config.supervision.max_restarts);
        env_override(
            "STEWARD_SUPERVISION_RESTART_WINDOW_S",
            &mut config.supervision.restart_window_s,
        );
        env_override(
            "STEWARD_EMERGENCY_MAX_OPEN_CRITICAL",
            &mut config.emergency.max_open_critical,
        );
        env_override("STEWARD_EMERGENCY_MIN_HEALTH", &mut config.emergency.min_health);
    }

    /// Apply CLI overrides (highest priority).
    pub fn apply_cli_overrides(config: &mut StewardConfig, cli: &CliOverrides) {
        if !cli.roots.is_empty() {
            config.scan.roots = cli.roots.clone();
        }
        if let Some(ref v) = cli.results_root {
            config.orchestrator.results_root = Some(v.clone());
        }
        if let Some(v) = cli.auto_execute {
            config.planner.auto_execute = Some(v);
        }
        if let Some(v) = cli.scan_interval_s {
            config.orchestrator.scan_interval_s = Some(v);
        }
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: "<serialization>".to_string(),
            message: e.to_string(),
        })
    }
}

fn env_override<T: FromStr>(name: &str, slot: &mut Option<T>) {
    if let Ok(val) = std::env::var(name) {
        match val.trim().parse::<T>() {
            Ok(v) => *slot = Some(v),
            Err(_) => tracing::warn!(var = name, value = %val, "ignoring unparsable override"),
        }
    }
}

fn check_unit(field: &str, value: Option<f64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(invalid(field, "must be between 0.0 and 1.0")),
        _ => Ok(()),
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// `~/.steward/config.toml`.
fn user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|h| PathBuf::from(h).join(".steward").join("config.toml"))
}
