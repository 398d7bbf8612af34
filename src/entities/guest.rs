// 🎤 Guest Entity
//
// Guests own their appearances with the same cascade as episodes.

use rusqlite::Row;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guest {
    /// Store-assigned identity
    pub id: i64,

    pub name: String,

    /// Free text, may be absent (serialized as null)
    pub occupation: Option<String>,
}

impl Guest {
    pub(crate) const COLUMNS: &'static str = "id, name, occupation";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Guest {
            id: row.get(0)?,
            name: row.get(1)?,
            occupation: row.get(2)?,
        })
    }
}
