// 🌱 Sample data loader
//
// Rebuilds the schema from scratch and loads the sample show data through the
// regular store functions, so seeded appearances obey the same rating and
// reference rules as API-created ones.

use crate::db::{self, TableCounts};
use crate::entities::Rating;
use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, TransactionBehavior};
use tracing::info;

/// (date, number)
pub const SAMPLE_EPISODES: [(&str, i64); 5] = [
    ("1/11/99", 1),
    ("1/12/99", 2),
    ("1/13/99", 3),
    ("1/14/99", 4),
    ("1/15/99", 5),
];

/// (name, occupation)
pub const SAMPLE_GUESTS: [(&str, &str); 5] = [
    ("Michael J. Fox", "actor"),
    ("Sandra Bernhard", "Comedian"),
    ("Tracey Ullman", "television actress"),
    ("Robin Williams", "comedian"),
    ("Whoopi Goldberg", "actress"),
];

/// (rating, episode index, guest index), indices into the arrays above
pub const SAMPLE_APPEARANCES: [(i64, usize, usize); 8] = [
    (4, 0, 0),
    (5, 1, 1),
    (3, 1, 2),
    (5, 2, 0),
    (2, 3, 3),
    (4, 4, 4),
    (5, 0, 3),
    (3, 2, 4),
];

/// Drop all tables, recreate them and load the sample data.
///
/// Schema reset and every insert share one transaction: if any row is
/// rejected the database keeps whatever it held before the call.
pub fn seed_database(conn: &mut Connection) -> Result<TableCounts> {
    load_data(conn, &SAMPLE_EPISODES, &SAMPLE_GUESTS, &SAMPLE_APPEARANCES)
}

fn load_data(
    conn: &mut Connection,
    episodes: &[(&str, i64)],
    guests: &[(&str, &str)],
    appearances: &[(i64, usize, usize)],
) -> Result<TableCounts> {
    db::setup_database(conn).context("Failed to prepare database")?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("Failed to start seed transaction")?;

    db::reset_database(&tx).context("Failed to reset schema")?;

    let mut episode_ids = Vec::with_capacity(episodes.len());
    for &(date, number) in episodes {
        let episode = db::insert_episode(&tx, date, number)
            .with_context(|| format!("Failed to insert episode #{}", number))?;
        episode_ids.push(episode.id);
    }

    let mut guest_ids = Vec::with_capacity(guests.len());
    for &(name, occupation) in guests {
        let guest = db::insert_guest(&tx, name, Some(occupation))
            .with_context(|| format!("Failed to insert guest {}", name))?;
        guest_ids.push(guest.id);
    }

    for &(rating, episode_idx, guest_idx) in appearances {
        let context = || {
            format!(
                "Failed to insert appearance (episode {}, guest {})",
                episode_idx + 1,
                guest_idx + 1
            )
        };
        let rating = Rating::new(rating).with_context(context)?;
        let episode_id = *episode_ids
            .get(episode_idx)
            .ok_or_else(|| anyhow!("no sample episode at index {}", episode_idx))
            .with_context(context)?;
        let guest_id = *guest_ids
            .get(guest_idx)
            .ok_or_else(|| anyhow!("no sample guest at index {}", guest_idx))
            .with_context(context)?;

        db::insert_appearance(&tx, rating, episode_id, guest_id).with_context(context)?;
    }

    let counts = db::counts(&tx)?;
    tx.commit().context("Failed to commit seed data")?;

    info!(
        episodes = counts.episodes,
        guests = counts.guests,
        appearances = counts.appearances,
        "database seeded"
    );

    Ok(counts)
}
