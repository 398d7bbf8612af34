// 🔭 Query/Projection Layer
// Shapes stored entities into the JSON views the API returns.
//
// Builders are pure functions over already-loaded entities; the `load_*`
// helpers fetch what a builder needs. An appearance whose parent row cannot
// be resolved is left out of the result and logged, never fatal.

use crate::db;
use crate::entities::{Appearance, Episode, Guest, Rating};
use crate::error::StoreResult;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

// ============================================================================
// VIEWS
// ============================================================================
//
// Flat episode and guest views are the entities themselves: `Episode` and
// `Guest` serialize to `{id, date, number}` and `{id, name, occupation}`.

/// Appearance nested under an episode: carries its guest only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeAppearance {
    pub id: i64,
    pub rating: Rating,
    pub episode_id: i64,
    pub guest_id: i64,
    pub guest: Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeDetail {
    pub id: i64,
    pub date: String,
    pub number: i64,
    pub appearances: Vec<EpisodeAppearance>,
}

/// Appearance with both parents expanded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppearanceDetail {
    pub id: i64,
    pub rating: Rating,
    pub episode_id: i64,
    pub guest_id: i64,
    pub episode: Episode,
    pub guest: Guest,
}

// ============================================================================
// BUILDERS
// ============================================================================

pub fn build_episode_detail(
    episode: &Episode,
    appearances: &[Appearance],
    guests: &HashMap<i64, Guest>,
) -> EpisodeDetail {
    let appearances = appearances
        .iter()
        .filter(|a| a.episode_id == episode.id)
        .filter_map(|a| match guests.get(&a.guest_id) {
            Some(guest) => Some(EpisodeAppearance {
                id: a.id,
                rating: a.rating,
                episode_id: a.episode_id,
                guest_id: a.guest_id,
                guest: guest.clone(),
            }),
            None => {
                warn!(
                    appearance_id = a.id,
                    guest_id = a.guest_id,
                    "appearance references missing guest, omitted"
                );
                None
            }
        })
        .collect();

    EpisodeDetail {
        id: episode.id,
        date: episode.date.clone(),
        number: episode.number,
        appearances,
    }
}

pub fn build_appearance_detail(
    appearance: &Appearance,
    episode: &Episode,
    guest: &Guest,
) -> AppearanceDetail {
    AppearanceDetail {
        id: appearance.id,
        rating: appearance.rating,
        episode_id: appearance.episode_id,
        guest_id: appearance.guest_id,
        episode: episode.clone(),
        guest: guest.clone(),
    }
}

/// Expand every appearance; ones with an unresolved parent are dropped
pub fn build_appearance_listing(
    appearances: &[Appearance],
    episodes: &HashMap<i64, Episode>,
    guests: &HashMap<i64, Guest>,
) -> Vec<AppearanceDetail> {
    appearances
        .iter()
        .filter_map(|a| match (episodes.get(&a.episode_id), guests.get(&a.guest_id)) {
            (Some(episode), Some(guest)) => Some(build_appearance_detail(a, episode, guest)),
            _ => {
                warn!(
                    appearance_id = a.id,
                    episode_id = a.episode_id,
                    guest_id = a.guest_id,
                    "appearance references missing episode or guest, omitted"
                );
                None
            }
        })
        .collect()
}

// ============================================================================
// LOADERS
// ============================================================================

/// `None` when the episode does not exist
pub fn load_episode_detail(
    conn: &Connection,
    episode_id: i64,
) -> StoreResult<Option<EpisodeDetail>> {
    let Some(episode) = db::get_episode(conn, episode_id)? else {
        return Ok(None);
    };

    let appearances = db::list_appearances_for_episode(conn, episode_id)?;

    let mut guests = HashMap::new();
    for appearance in &appearances {
        if guests.contains_key(&appearance.guest_id) {
            continue;
        }
        if let Some(guest) = db::get_guest(conn, appearance.guest_id)? {
            guests.insert(guest.id, guest);
        }
    }

    Ok(Some(build_episode_detail(&episode, &appearances, &guests)))
}

pub fn load_appearance_listing(conn: &Connection) -> StoreResult<Vec<AppearanceDetail>> {
    let appearances = db::list_appearances(conn)?;
    let episodes: HashMap<i64, Episode> = db::list_episodes(conn)?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();
    let guests: HashMap<i64, Guest> = db::list_guests(conn)?
        .into_iter()
        .map(|g| (g.id, g))
        .collect();

    Ok(build_appearance_listing(&appearances, &episodes, &guests))
}

/// Expand a single (typically just created) appearance.
/// `None` if either parent has gone missing since.
pub fn load_appearance_detail(
    conn: &Connection,
    appearance: &Appearance,
) -> StoreResult<Option<AppearanceDetail>> {
    let episode = db::get_episode(conn, appearance.episode_id)?;
    let guest = db::get_guest(conn, appearance.guest_id)?;

    Ok(match (episode, guest) {
        (Some(episode), Some(guest)) => {
            Some(build_appearance_detail(appearance, &episode, &guest))
        }
        _ => None,
    })
}
