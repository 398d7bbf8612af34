// 📺 Episode Entity
//
// An episode owns its appearances: deleting it removes every appearance
// that references it (enforced by the store, see db::delete_episode).

use rusqlite::Row;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Episode {
    /// Store-assigned identity
    pub id: i64,

    /// Air date as entered, e.g. "1/11/99" (never parsed)
    pub date: String,

    /// Episode number within the show
    pub number: i64,
}

impl Episode {
    /// Column list matching `from_row`
    pub(crate) const COLUMNS: &'static str = "id, date, number";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Episode {
            id: row.get(0)?,
            date: row.get(1)?,
            number: row.get(2)?,
        })
    }
}
