//! Text generation
//!
//! The generation collaborator returns a strictly tagged [`Generation`]
//! value instead of an error: every failure mode (transport, HTTP status,
//! malformed body, empty text, timeout) is folded into
//! [`Generation::Failed`] so the synthesizer only ever branches on one enum.

mod http_backend;

pub use http_backend::*;

use crate::config::GenerationConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Generated text (may still be blank; callers decide)
    Text(String),
    /// The collaborator failed; carries a human-readable reason
    Failed(String),
}

/// Trait for text generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Generation;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    let generator = HttpGenerator::new(config)?;
    Ok(Box::new(generator))
}

/// Run one generation call bounded by `timeout`
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    prompt: &str,
    timeout: Duration,
) -> Generation {
    match tokio::time::timeout(timeout, generator.generate(prompt)).await {
        Ok(generation) => generation,
        Err(_) => Generation::Failed(format!(
            "model '{}' timed out after {:?}",
            generator.model_name(),
            timeout
        )),
    }
}
