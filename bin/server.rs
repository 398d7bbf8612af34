// Late Show API - Web Server

use anyhow::{Context, Result};
use late_show::api::{create_router, AppState};
use late_show::{counts, setup_database, Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    late_show::init_tracing("late_show=info,tower_http=info");

    let config = Config::from_env()?;

    let conn = config.open_database()?;
    setup_database(&conn).context("Failed to set up database")?;
    info!(database = ?config.database, "database opened");

    let counts = counts(&conn)?;
    if counts.episodes == 0 {
        warn!("database has no episodes; run `late-show seed` to load sample data");
    }

    let app = create_router(AppState::new(conn));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🚀 Late Show API running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
