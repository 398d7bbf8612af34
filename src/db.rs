use crate::entities::{Appearance, Episode, Guest, Rating};
use crate::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    // Enable WAL mode for crash recovery (no-op for in-memory databases)
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Cascades below only fire with foreign keys on, and the pragma is per connection
    conn.pragma_update(None, "foreign_keys", true)?;

    create_tables(conn)
}

/// Create tables and indexes if missing. Safe inside a transaction.
fn create_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS episodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            number INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS guests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            occupation TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Appearances (link table, owned by both parents)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appearances (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            episode_id INTEGER NOT NULL
                REFERENCES episodes(id) ON DELETE CASCADE,
            guest_id INTEGER NOT NULL
                REFERENCES guests(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appearances_episode ON appearances(episode_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appearances_guest ON appearances(guest_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_episodes_number ON episodes(number)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_guests_name ON guests(name)",
        [],
    )?;

    Ok(())
}

/// Drop every table and recreate the empty schema.
/// Connection pragmas are left alone, so this can run inside a transaction.
pub fn reset_database(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS appearances;
         DROP TABLE IF EXISTS guests;
         DROP TABLE IF EXISTS episodes;",
    )?;

    create_tables(conn)
}

// ============================================================================
// EPISODES
// ============================================================================

pub fn insert_episode(conn: &Connection, date: &str, number: i64) -> StoreResult<Episode> {
    conn.execute(
        "INSERT INTO episodes (date, number) VALUES (?1, ?2)",
        params![date, number],
    )?;

    Ok(Episode {
        id: conn.last_insert_rowid(),
        date: date.to_string(),
        number,
    })
}

/// All episodes, ascending by episode number
pub fn list_episodes(conn: &Connection) -> StoreResult<Vec<Episode>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM episodes ORDER BY number, id",
        Episode::COLUMNS
    ))?;

    let episodes = stmt
        .query_map([], Episode::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(episodes)
}

pub fn get_episode(conn: &Connection, id: i64) -> StoreResult<Option<Episode>> {
    let episode = conn
        .query_row(
            &format!("SELECT {} FROM episodes WHERE id = ?1", Episode::COLUMNS),
            [id],
            Episode::from_row,
        )
        .optional()?;

    Ok(episode)
}

/// Delete an episode together with its appearances.
///
/// Both deletes run in one transaction: a reader never sees the episode gone
/// while its appearances remain. Returns how many appearances went with it.
pub fn delete_episode(conn: &mut Connection, id: i64) -> StoreResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let removed = remove_episode(&tx, id)?;
    tx.commit()?;

    info!(episode_id = id, appearances_removed = removed, "deleted episode");
    Ok(removed)
}

/// Cascade delete without its own transaction; callers supply one
fn remove_episode(conn: &Connection, id: i64) -> StoreResult<usize> {
    if get_episode(conn, id)?.is_none() {
        return Err(StoreError::EpisodeNotFound { id });
    }

    let removed = conn.execute("DELETE FROM appearances WHERE episode_id = ?1", [id])?;
    conn.execute("DELETE FROM episodes WHERE id = ?1", [id])?;

    Ok(removed)
}

// ============================================================================
// GUESTS
// ============================================================================

pub fn insert_guest(
    conn: &Connection,
    name: &str,
    occupation: Option<&str>,
) -> StoreResult<Guest> {
    conn.execute(
        "INSERT INTO guests (name, occupation) VALUES (?1, ?2)",
        params![name, occupation],
    )?;

    Ok(Guest {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        occupation: occupation.map(str::to_string),
    })
}

/// All guests, ascending by name
pub fn list_guests(conn: &Connection) -> StoreResult<Vec<Guest>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM guests ORDER BY name, id",
        Guest::COLUMNS
    ))?;

    let guests = stmt
        .query_map([], Guest::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(guests)
}

pub fn get_guest(conn: &Connection, id: i64) -> StoreResult<Option<Guest>> {
    let guest = conn
        .query_row(
            &format!("SELECT {} FROM guests WHERE id = ?1", Guest::COLUMNS),
            [id],
            Guest::from_row,
        )
        .optional()?;

    Ok(guest)
}

/// Delete a guest together with its appearances (same cascade as episodes).
/// Not routed over HTTP.
pub fn delete_guest(conn: &mut Connection, id: i64) -> StoreResult<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if get_guest(&tx, id)?.is_none() {
        return Err(StoreError::GuestNotFound { id });
    }

    let removed = tx.execute("DELETE FROM appearances WHERE guest_id = ?1", [id])?;
    tx.execute("DELETE FROM guests WHERE id = ?1", [id])?;
    tx.commit()?;

    info!(guest_id = id, appearances_removed = removed, "deleted guest");
    Ok(removed)
}

// ============================================================================
// APPEARANCES
// ============================================================================

/// All appearances in insertion order
pub fn list_appearances(conn: &Connection) -> StoreResult<Vec<Appearance>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM appearances ORDER BY id",
        Appearance::COLUMNS
    ))?;

    let appearances = stmt
        .query_map([], Appearance::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(appearances)
}

pub fn list_appearances_for_episode(
    conn: &Connection,
    episode_id: i64,
) -> StoreResult<Vec<Appearance>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM appearances WHERE episode_id = ?1 ORDER BY id",
        Appearance::COLUMNS
    ))?;

    let appearances = stmt
        .query_map([episode_id], Appearance::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(appearances)
}

/// Create an appearance linking an existing episode and guest.
///
/// The rating is checked before the store is touched. The existence checks
/// and the insert share one immediate transaction, so a parent deleted
/// concurrently makes this fail instead of leaving a dangling row.
pub fn create_appearance(
    conn: &mut Connection,
    rating: i64,
    episode_id: i64,
    guest_id: i64,
) -> StoreResult<Appearance> {
    let rating = Rating::new(rating)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let appearance = insert_appearance(&tx, rating, episode_id, guest_id)?;
    tx.commit()?;

    debug!(appearance_id = appearance.id, episode_id, guest_id, "created appearance");
    Ok(appearance)
}

/// Check both references, then insert. Runs inside the caller's transaction
/// (`create_appearance`, or the seeder's). The episode is checked first.
pub fn insert_appearance(
    conn: &Connection,
    rating: Rating,
    episode_id: i64,
    guest_id: i64,
) -> StoreResult<Appearance> {
    if get_episode(conn, episode_id)?.is_none() {
        return Err(StoreError::EpisodeNotFound { id: episode_id });
    }

    if get_guest(conn, guest_id)?.is_none() {
        return Err(StoreError::GuestNotFound { id: guest_id });
    }

    conn.execute(
        "INSERT INTO appearances (rating, episode_id, guest_id) VALUES (?1, ?2, ?3)",
        params![rating, episode_id, guest_id],
    )?;

    Ok(Appearance {
        id: conn.last_insert_rowid(),
        rating,
        episode_id,
        guest_id,
    })
}

// ============================================================================
// STATS
// ============================================================================

/// Row counts per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub episodes: i64,
    pub guests: i64,
    pub appearances: i64,
}

pub fn counts(conn: &Connection) -> StoreResult<TableCounts> {
    let count = |table: &str| -> rusqlite::Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
    };

    Ok(TableCounts {
        episodes: count("episodes")?,
        guests: count("guests")?,
        appearances: count("appearances")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ErrorCode;
    use std::time::Duration;

    /// In-memory database with two episodes, two guests and three appearances
    fn create_test_db() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        insert_episode(&conn, "1/12/99", 2).unwrap(); // id 1
        insert_episode(&conn, "1/11/99", 1).unwrap(); // id 2
        insert_guest(&conn, "Robin Williams", Some("comedian")).unwrap(); // id 1
        insert_guest(&conn, "Michael J. Fox", Some("actor")).unwrap(); // id 2

        create_appearance(&mut conn, 4, 1, 1).unwrap();
        create_appearance(&mut conn, 5, 1, 2).unwrap();
        create_appearance(&mut conn, 2, 2, 1).unwrap();

        conn
    }

    #[test]
    fn test_list_episodes_ordered_by_number() {
        let conn = create_test_db();

        let episodes = list_episodes(&conn).unwrap();
        let numbers: Vec<i64> = episodes.iter().map(|e| e.number).collect();

        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(episodes[0].id, 2);
    }

    #[test]
    fn test_list_guests_ordered_by_name() {
        let conn = create_test_db();

        let names: Vec<String> = list_guests(&conn)
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();

        assert_eq!(names, vec!["Michael J. Fox", "Robin Williams"]);
    }

    #[test]
    fn test_get_missing_rows_is_none() {
        let conn = create_test_db();

        assert!(get_episode(&conn, 999).unwrap().is_none());
        assert!(get_guest(&conn, 999).unwrap().is_none());
        assert_eq!(get_episode(&conn, 1).unwrap().unwrap().date, "1/12/99");
    }

    #[test]
    fn test_create_appearance_assigns_id() {
        let mut conn = create_test_db();

        let appearance = create_appearance(&mut conn, 3, 2, 2).unwrap();

        assert_eq!(appearance.id, 4);
        assert_eq!(appearance.rating.get(), 3);
        assert_eq!(list_appearances(&conn).unwrap().len(), 4);
    }

    #[test]
    fn test_create_appearance_rejects_bad_rating() {
        let mut conn = create_test_db();

        for rating in [0, 6, -3] {
            let err = create_appearance(&mut conn, rating, 1, 1).unwrap_err();
            assert!(matches!(err, StoreError::InvalidRating(_)), "got {:?}", err);
        }

        assert_eq!(counts(&conn).unwrap().appearances, 3);
    }

    #[test]
    fn test_create_appearance_rejects_dangling_references() {
        let mut conn = create_test_db();

        let err = create_appearance(&mut conn, 3, 999, 1).unwrap_err();
        assert!(matches!(err, StoreError::EpisodeNotFound { id: 999 }));

        let err = create_appearance(&mut conn, 3, 1, 999).unwrap_err();
        assert!(matches!(err, StoreError::GuestNotFound { id: 999 }));

        // Episode is reported first when both are missing
        let err = create_appearance(&mut conn, 3, 998, 999).unwrap_err();
        assert!(matches!(err, StoreError::EpisodeNotFound { id: 998 }));
        assert!(err.is_not_found());

        assert_eq!(counts(&conn).unwrap().appearances, 3);
    }

    #[test]
    fn test_check_constraint_backs_rating_invariant() {
        let conn = create_test_db();

        let result = conn.execute(
            "INSERT INTO appearances (rating, episode_id, guest_id) VALUES (9, 1, 1)",
            [],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_keys_reject_dangling_insert() {
        let conn = create_test_db();

        let result = conn.execute(
            "INSERT INTO appearances (rating, episode_id, guest_id) VALUES (3, 42, 1)",
            [],
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_delete_episode_cascades() {
        let mut conn = create_test_db();

        let removed = delete_episode(&mut conn, 1).unwrap();

        assert_eq!(removed, 2);
        assert!(get_episode(&conn, 1).unwrap().is_none());

        let remaining = list_appearances(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].episode_id, 2);

        // Guests are untouched
        assert_eq!(counts(&conn).unwrap().guests, 2);
        assert_eq!(counts(&conn).unwrap().episodes, 1);
    }

    #[test]
    fn test_delete_unknown_episode_mutates_nothing() {
        let mut conn = create_test_db();
        let before = counts(&conn).unwrap();

        let err = delete_episode(&mut conn, 999).unwrap_err();

        assert!(matches!(err, StoreError::EpisodeNotFound { id: 999 }));
        assert_eq!(counts(&conn).unwrap(), before);
    }

    #[test]
    fn test_delete_guest_cascades() {
        let mut conn = create_test_db();

        let removed = delete_guest(&mut conn, 1).unwrap();

        assert_eq!(removed, 2);
        let remaining = list_appearances(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].guest_id, 2);
        assert_eq!(counts(&conn).unwrap().episodes, 2);

        assert!(matches!(
            delete_guest(&mut conn, 1).unwrap_err(),
            StoreError::GuestNotFound { id: 1 }
        ));
    }

    #[test]
    fn test_sql_cascade_without_explicit_delete() {
        let conn = create_test_db();

        conn.execute("DELETE FROM episodes WHERE id = 1", []).unwrap();

        assert!(list_appearances_for_episode(&conn, 1).unwrap().is_empty());
        assert_eq!(counts(&conn).unwrap().appearances, 1);
    }

    #[test]
    fn test_reset_database_empties_tables() {
        let conn = create_test_db();

        reset_database(&conn).unwrap();

        assert_eq!(
            counts(&conn).unwrap(),
            TableCounts {
                episodes: 0,
                guests: 0,
                appearances: 0,
            }
        );
    }

    fn is_busy(err: &StoreError) -> bool {
        matches!(
            err,
            StoreError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::DatabaseBusy
        )
    }

    #[test]
    fn test_insert_appearance_rolls_back_with_transaction() {
        let mut conn = create_test_db();

        let tx = conn.transaction().unwrap();
        let rating = Rating::new(3).unwrap();
        insert_appearance(&tx, rating, 2, 2).unwrap();
        assert!(insert_appearance(&tx, rating, 2, 999).is_err());
        drop(tx);

        assert_eq!(counts(&conn).unwrap().appearances, 3);
    }

    #[test]
    fn test_delete_cascade_is_atomic_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late_show.db");

        let mut writer = Connection::open(&path).unwrap();
        setup_database(&writer).unwrap();
        let episode = insert_episode(&writer, "1/11/99", 1).unwrap();
        let guest = insert_guest(&writer, "Whoopi Goldberg", Some("actress")).unwrap();
        create_appearance(&mut writer, 4, episode.id, guest.id).unwrap();
        create_appearance(&mut writer, 5, episode.id, guest.id).unwrap();

        let mut reader = Connection::open(&path).unwrap();
        setup_database(&reader).unwrap();
        reader.busy_timeout(Duration::ZERO).unwrap();

        // Cascade in flight on the writer, not yet committed
        let tx = writer
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();
        assert_eq!(remove_episode(&tx, episode.id).unwrap(), 2);

        assert!(get_episode(&reader, episode.id).unwrap().is_some());
        assert_eq!(list_appearances_for_episode(&reader, episode.id).unwrap().len(), 2);

        // A create against the episode being deleted cannot slip in
        let err = create_appearance(&mut reader, 3, episode.id, guest.id).unwrap_err();
        assert!(is_busy(&err), "got {:?}", err);

        tx.commit().unwrap();

        assert!(get_episode(&reader, episode.id).unwrap().is_none());
        assert!(list_appearances_for_episode(&reader, episode.id).unwrap().is_empty());
        assert_eq!(counts(&reader).unwrap().appearances, 0);

        let err = create_appearance(&mut reader, 3, episode.id, guest.id).unwrap_err();
        assert!(matches!(err, StoreError::EpisodeNotFound { .. }));
        assert_eq!(counts(&reader).unwrap().appearances, 0);
    }

    #[test]
    fn test_uncommitted_delete_rolls_back() {
        let mut conn = create_test_db();
        let before = counts(&conn).unwrap();

        let tx = conn.transaction().unwrap();
        remove_episode(&tx, 1).unwrap();
        drop(tx);

        assert_eq!(counts(&conn).unwrap(), before);
        assert_eq!(list_appearances_for_episode(&conn, 1).unwrap().len(), 2);
    }
}
