//! docqa CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docqa::{
    commands::{
        cmd_events, cmd_ingest, cmd_ingest_pdf, cmd_ingest_url, cmd_init, cmd_query, cmd_status,
        print_events, print_ingest_stats, print_query_response, print_status, IngestRequest,
        InitOptions, QueryOptions,
    },
    config::Config,
    embed::create_embedder,
    error::{Error, Result},
    generate::create_generator,
    progress::LogWriterFactory,
    store::{ChunkStore, SourceType},
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(version, about = "Ask questions about your PDFs and web pages", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docqa configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Ingest a document into the chunk store
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Ask a question about ingested documents
    Ask {
        /// The question
        question: String,

        /// Number of chunks to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show store status
    Status,

    /// Show recent interaction log entries
    Events {
        /// Maximum number of events
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IngestSource {
    /// Ingest a PDF file
    Pdf {
        /// Path to the PDF
        path: PathBuf,
    },

    /// Ingest a single web page
    Url {
        /// URL to fetch
        url: String,

        /// Source type tag recorded with each chunk
        #[arg(long, default_value = "web")]
        source_type: String,
    },

    /// Ingest a plain text file
    Text {
        /// Path to the text file
        path: PathBuf,

        /// Source type tag recorded with each chunk
        #[arg(long, default_value = "text")]
        source_type: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    if matches!(cli.command, Commands::Init { .. }) {
        return handle_init(cli).await;
    }

    // Completions need neither config nor store
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "docqa", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let store = ChunkStore::connect(&config).await?;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Ingest { source } => {
            handle_ingest(&config, &store, source, cli.json).await?;
        }

        Commands::Ask { question, top_k } => {
            let embedder = create_embedder(&config.embedding)?;
            let generator = create_generator(&config.generation)?;
            let options = QueryOptions { top_k };

            let response = cmd_query(
                &config,
                &store,
                embedder.as_ref(),
                generator.as_ref(),
                &question,
                options,
            )
            .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_query_response(&response);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Events { limit } => {
            let events = cmd_events(&store, limit).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else {
                print_events(&events);
            }
        }
    }

    Ok(())
}

async fn handle_init(cli: Cli) -> Result<()> {
    let Commands::Init { force } = cli.command else {
        unreachable!()
    };

    // A --config path may name either the toml file or its directory
    let (base_dir, config_path) = match cli.config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    let config = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })
    .await?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "config": config.paths.config_file,
                "database": config.paths.db_file,
            })
        );
        return Ok(());
    }

    println!("✓ docqa initialized successfully");
    println!("  Config:   {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("\nNext steps:");
    if config.embedding.api_key().is_none() {
        println!("  1. Export {} with your API key", config.embedding.api_key_env);
    } else {
        println!("  1. Edit the config file to customize models and chunk size");
    }
    println!("  2. Ingest a document: docqa ingest pdf /path/to/file.pdf");
    println!("  3. Ask: docqa ask \"What is this document about?\"");

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    Config::load(&config_path)
}

async fn handle_ingest(
    config: &Config,
    store: &ChunkStore,
    source: IngestSource,
    json: bool,
) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;

    let stats = match source {
        IngestSource::Pdf { path } => {
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                Error::SourceUnreadable(format!("Cannot read {}: {}", path.display(), e))
            })?;
            cmd_ingest_pdf(config, store, embedder.as_ref(), &display_name(&path), bytes).await?
        }

        IngestSource::Url { url, source_type } => {
            let source_type: SourceType = source_type.parse()?;
            cmd_ingest_url(config, store, embedder.as_ref(), &url, Some(source_type)).await?
        }

        IngestSource::Text { path, source_type } => {
            let source_type: SourceType = source_type.parse()?;
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                Error::SourceUnreadable(format!("Cannot read {}: {}", path.display(), e))
            })?;
            let request = IngestRequest::new(source_type, display_name(&path), text)
                .with_metadata(serde_json::json!({ "path": path.display().to_string() }));
            cmd_ingest(config, store, embedder.as_ref(), request).await?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_ingest_stats(&stats);
    }

    Ok(())
}

/// File name used as the chunk source identifier
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
