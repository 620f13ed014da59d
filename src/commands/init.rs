//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::ChunkStore;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

/// Write a default config and create the database
pub async fn cmd_init(options: InitOptions) -> Result<Config> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let mut config = Config::default();
    config.paths.db_file = base_dir.join("docqa.db");
    config.paths.base_dir = base_dir;
    config.paths.config_file = config_path;
    config.save()?;

    ChunkStore::connect(&config).await?;
    info!("Initialized database at {:?}", config.paths.db_file);

    Ok(config)
}
