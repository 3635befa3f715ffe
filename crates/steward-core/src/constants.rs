//! Shared constants.

/// Engine version.
pub const STEWARD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project config file name, looked up in the working root.
pub const PROJECT_CONFIG_FILE: &str = "steward.toml";

/// Environment variable controlling log filters.
pub const LOG_ENV_VAR: &str = "STEWARD_LOG";

/// Ignore file honored by the corpus walker, in addition to `.gitignore`.
pub const IGNORE_FILE_NAME: &str = ".stewardignore";

/// Database file name under the results root.
pub const DATABASE_FILE: &str = "steward.db";

/// Default results root, relative to the working directory.
pub const DEFAULT_RESULTS_ROOT: &str = ".steward-results";

/// Default root navigation document.
pub const DEFAULT_ROOT_DOCUMENT: &str = "README.md";

/// Debt markers recognized by the scanner (matched case-insensitively, whole word).
pub const DEBT_MARKERS: &[&str] = &["TODO", "FIXME", "HACK", "XXX", "BUG"];

/// Delimiters of the generated quick-navigation block.
pub const QUICK_NAV_START: &str = "<!-- steward:quick-nav:start -->";
pub const QUICK_NAV_END: &str = "<!-- steward:quick-nav:end -->";

/// Seconds in a day, used to express trend slopes per day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Fixed seed for the isolation forest so anomaly detection is reproducible.
pub const ANOMALY_SEED: u64 = 0x5EED;

/// Default bounded queue capacity between pipeline stages.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
