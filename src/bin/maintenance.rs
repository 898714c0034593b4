use std::env;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use employee_dialogue::{config::AppConfig, db};

const USAGE: &str = "Usage: maintenance <migrate|pending>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("migrate") => migrate()?,
        Some("pending") => list_pending()?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn connect() -> Result<db::PgPool> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    db::init_pool_with_size(&config.database_url, 1)
}

fn migrate() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let applied = db::run_migrations(&mut conn)?;
    if applied.is_empty() {
        println!("Schema is up to date.");
    } else {
        for version in &applied {
            println!("Applied {version}");
        }
    }
    Ok(())
}

fn list_pending() -> Result<()> {
    let pool = connect()?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let pending = db::pending_migrations(&mut conn)?;
    if pending.is_empty() {
        println!("No pending migrations.");
    } else {
        for name in &pending {
            println!("{name}");
        }
    }
    Ok(())
}
