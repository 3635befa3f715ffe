//! Observability for Steward.
//! `tracing` with `EnvFilter`, per-subsystem log levels via `STEWARD_LOG`.

pub mod fields;
pub mod setup;

pub use setup::init_tracing;
