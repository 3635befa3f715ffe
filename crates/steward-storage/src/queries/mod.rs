//! Query modules: free functions over a `&Connection`.

pub mod actions;
pub mod backups;
pub mod events;
pub mod file_metrics;
pub mod heartbeats;
pub mod slo;
pub mod system_metrics;
pub mod violations;

use rusqlite::types::Type;
use rusqlite::Row;

/// Read a text column and parse it into a closed enum.
pub(crate) fn enum_col<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown value '{raw}'").into(),
        )
    })
}

/// Read a JSON text column.
pub(crate) fn json_col<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
