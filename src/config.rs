//! Runtime configuration, read from the environment
//!
//! - `DATABASE_URL`: SQLite path, optionally prefixed with `sqlite://`
//!   (default `sqlite:///late_show.db`, i.e. `late_show.db` in the working directory)
//! - `HOST` / `PORT`: server bind address (default `0.0.0.0:5555`)

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:///late_show.db";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5555;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseLocation,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: parse_database_url(DEFAULT_DATABASE_URL),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database = parse_database_url(&url);
        }

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {:?}", port))?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn open_database(&self) -> Result<Connection> {
        let conn = match &self.database {
            DatabaseLocation::Memory => Connection::open_in_memory(),
            DatabaseLocation::File(path) => Connection::open(path),
        }
        .with_context(|| format!("Failed to open database {:?}", self.database))?;

        Ok(conn)
    }
}

/// `sqlite:///late_show.db` → `late_show.db`, `sqlite:////abs/x.db` → `/abs/x.db`
fn parse_database_url(url: &str) -> DatabaseLocation {
    let path = url
        .strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url);

    if path.is_empty() || path == ":memory:" {
        DatabaseLocation::Memory
    } else {
        DatabaseLocation::File(PathBuf::from(path))
    }
}
