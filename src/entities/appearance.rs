// ⭐ Appearance Entity - links one guest to one episode with a rating
//
// The rating range is a property of the type: a `Rating` can only be built
// through `Rating::new` (or read back from a column, which goes through it
// too), so an out-of-range value never reaches the store.
// The appearances table carries the same bound as a CHECK constraint.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// RATING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Rating must be between {min} and {max}, got {value}", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    pub value: i64,
}

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(RatingError { value })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl ToSql for Rating {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.0)))
    }
}

impl FromSql for Rating {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        Rating::new(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// ============================================================================
// APPEARANCE ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Appearance {
    /// Store-assigned identity
    pub id: i64,

    pub rating: Rating,

    /// Must resolve to a live episode (FK, ON DELETE CASCADE)
    pub episode_id: i64,

    /// Must resolve to a live guest (FK, ON DELETE CASCADE)
    pub guest_id: i64,
}

impl Appearance {
    pub(crate) const COLUMNS: &'static str = "id, rating, episode_id, guest_id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Appearance {
            id: row.get(0)?,
            rating: row.get(1)?,
            episode_id: row.get(2)?,
            guest_id: row.get(3)?,
        })
    }
}
