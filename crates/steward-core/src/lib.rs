//! Steward core: shared types, errors, configuration, events, tracing, and traits
//! for the growth governance engine.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod paths;
pub mod tracing;
pub mod traits;
pub mod types;

pub use config::StewardConfig;
pub use errors::{GovernanceError, StewardErrorCode};
pub use paths::AllowedRoots;
