//! Configuration system for Steward.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

/// Copies every `Some` field of `$other` onto `$base`.
macro_rules! merge_options {
    ($base:expr, $other:expr; $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $base.$field = $other.$field.clone();
            }
        )+
    };
}

pub(crate) use merge_options;

pub mod detector_config;
pub mod executor_config;
pub mod orchestrator_config;
pub mod scan_config;
pub mod slo_config;
pub mod steward_config;
pub mod threshold_config;

pub use detector_config::DetectorConfig;
pub use executor_config::{BackupConfig, ExecutorConfig, PlannerConfig};
pub use orchestrator_config::{EmergencyConfig, OrchestratorConfig, SupervisionConfig};
pub use scan_config::ScanConfig;
pub use slo_config::{SloConfig, StorageConfig};
pub use steward_config::{CliOverrides, StewardConfig};
pub use threshold_config::ThresholdConfig;
