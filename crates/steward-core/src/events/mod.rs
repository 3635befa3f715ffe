//! Governance event system: typed events, handler trait, synchronous dispatcher.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::GovernanceEventHandler;
pub use types::*;
