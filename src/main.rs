use anyhow::{Context, Result};
use std::env;

use late_show::{counts, seed_database, setup_database, Config};

fn main() -> Result<()> {
    late_show::init_tracing("late_show=info");

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed(&config),
        None | Some("status") => run_status(&config),
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            eprintln!("   Usage: late-show [seed|status]");
            std::process::exit(2);
        }
    }
}

fn run_seed(config: &Config) -> Result<()> {
    println!("🌱 Seeding database...");

    let mut conn = config.open_database()?;
    let counts = seed_database(&mut conn)?;

    println!("✅ Database seeded successfully!");
    println!("   Created: {} episodes", counts.episodes);
    println!("   Created: {} guests", counts.guests);
    println!("   Created: {} appearances", counts.appearances);

    Ok(())
}

fn run_status(config: &Config) -> Result<()> {
    let conn = config.open_database()?;
    setup_database(&conn).context("Failed to set up database")?;

    let counts = counts(&conn)?;

    println!("📊 Late Show API v{} - {:?}", late_show::VERSION, config.database);
    println!("   Episodes:    {}", counts.episodes);
    println!("   Guests:      {}", counts.guests);
    println!("   Appearances: {}", counts.appearances);

    if counts.episodes == 0 {
        println!("\n   Database is empty. Run: late-show seed");
    }

    Ok(())
}
