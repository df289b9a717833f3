//! Init command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::info;

use questline::config::Config;
use questline::notify::LogNotifier;
use questline::progression::Progression;
use questline::store::{ProgressionDb, SqliteStore};

/// Write the config (unless present) and seed its level table into the database
pub fn init_command(config_override: Option<&Path>, force: bool) -> Result<()> {
    let config_path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::global_config_path);

    let config = if config_path.exists() && !force {
        println!("Config already exists at {}", config_path.display());
        Config::from_file(&config_path)?
    } else {
        let config = Config::default();
        config.save_to_file(&config_path)?;
        println!("Wrote config to {}", config_path.display());
        config
    };

    let db_path = config.database_path();
    let db = ProgressionDb::open(&db_path)?;
    let engine = Progression::new(SqliteStore::new(db), Arc::new(LogNotifier));

    let added = engine
        .catalog()
        .seed_levels(&config.levels)
        .map_err(|e| anyhow!("Failed to seed levels: {}", e.public_message(config.errors.debug)))?;

    info!(added, "Level table ready");
    println!(
        "Database ready at {} ({} new level(s))",
        db_path.display(),
        added
    );
    Ok(())
}
