// Late Show API - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod projection;
pub mod schema;
pub mod seed;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{Config, DatabaseLocation};
pub use db::{
    counts, create_appearance, delete_episode, delete_guest, get_episode, get_guest,
    insert_appearance, insert_episode, insert_guest, list_appearances,
    list_appearances_for_episode, list_episodes, list_guests, reset_database, setup_database,
    TableCounts,
};
pub use entities::{Appearance, Episode, Guest, Rating, RatingError};
pub use error::{StoreError, StoreResult};
pub use projection::{AppearanceDetail, EpisodeAppearance, EpisodeDetail};
pub use schema::{validate_new_appearance, NewAppearance, ValidationError, ValidationResult};
pub use seed::seed_database;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber (`RUST_LOG` overrides the default filter)
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
