//! Fast hash collections.

pub use rustc_hash::{FxHashMap, FxHashSet};
