//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{ChunkStore, SourceSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub api_key_present: bool,
    pub chunk_count: usize,
    pub dimension: Option<usize>,
    pub sources: Vec<SourceSummary>,
}

/// Get system status
pub async fn cmd_status(config: &Config, store: &ChunkStore) -> Result<StatusInfo> {
    info!("Getting status");

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        embedding_model: config.embedding.model.clone(),
        generation_model: config.generation.model.clone(),
        api_key_present: config.embedding.api_key().is_some(),
        chunk_count: store.count().await?,
        dimension: store.dimension().await?,
        sources: store.list_sources().await?,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📚 docqa status\n");
    println!("Config:           {}", status.config_path);
    println!("Database:         {}", status.db_path);
    println!("Embedding model:  {}", status.embedding_model);
    println!("Generation model: {}", status.generation_model);
    println!(
        "API key:          {}",
        if status.api_key_present { "set" } else { "missing" }
    );
    println!();
    println!("Chunks:    {}", status.chunk_count);
    match status.dimension {
        Some(d) => println!("Dimension: {}", d),
        None => println!("Dimension: (not fixed yet)"),
    }

    if status.sources.is_empty() {
        println!("\nNo sources ingested yet.");
        return;
    }

    println!("\nSources:");
    for source in &status.sources {
        println!(
            "  [{}] {} ({} chunks, since {})",
            source.source_type, source.source, source.chunk_count, source.first_ingested
        );
    }
}
