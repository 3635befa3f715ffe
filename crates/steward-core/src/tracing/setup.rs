//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::LOG_ENV_VAR;

static INIT: Once = Once::new();

/// Initialize the Steward logging system.
///
/// Reads `STEWARD_LOG` for per-subsystem levels, e.g.
/// `STEWARD_LOG=steward_analysis=debug,steward_storage=warn`.
/// Falls back to `steward=info` when unset or invalid. Idempotent.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(default_directives()));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

fn default_directives() -> &'static str {
    "steward_core=info,steward_storage=info,steward_analysis=info,\
     steward_remediation=info,steward_runtime=info,steward=info"
}
