//! Backup registry record.

use serde::{Deserialize, Serialize};

/// Store-side record of an action's backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub action_id: String,
    pub created_at: i64,
    /// Absolute path of the backup directory.
    pub location: String,
    pub file_count: u32,
    pub total_bytes: u64,
    pub pruned_at: Option<i64>,
}
