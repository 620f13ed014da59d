//! docqa: question answering over ingested PDFs and web pages
//!
//! Ingestion chunks source text into fixed-width windows, embeds each chunk
//! and appends it to a SQLite-backed store. Queries embed the question, rank
//! every stored chunk by cosine similarity and hand the best matches to a
//! text-generation model, falling back to the raw context when generation
//! fails.

pub mod api_backend;
pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod events;
pub mod extract;
pub mod generate;
pub mod progress;
pub mod rank;
pub mod store;
pub mod synth;

pub use config::Config;
pub use error::{Error, Result};
