//! Answer synthesis
//!
//! Builds one prompt from the ranked chunk texts and the question, calls the
//! generation collaborator once, and degrades to returning the raw context
//! when generation fails or comes back blank. A query never fails because of
//! the generator.

use crate::generate::{generate_with_timeout, Generation, Generator};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix placed in front of the raw context when generation fails
pub const FALLBACK_NOTICE: &str = "Answer generation failed; showing raw context instead.\n\n";

/// Separator between chunk texts in the context block
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Result of synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    /// True when `text` is the fallback context rather than a generated answer
    pub degraded: bool,
    /// Why generation was abandoned, when degraded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Join ranked chunk texts, in ranker order, separated by a blank line
pub fn build_context<S: AsRef<str>>(ranked_texts: &[S]) -> String {
    ranked_texts
        .iter()
        .map(|t| t.as_ref())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Prompt asking the model to answer strictly from `context`
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant answering questions about the user's documents.\n\
         Use only the context below. If the context does not contain the answer, \
         say that you are not sure instead of guessing.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\n\
         Answer:",
        context, question
    )
}

/// The degraded answer body: notice followed by the literal context
pub fn fallback_answer(context: &str) -> String {
    format!("{}{}", FALLBACK_NOTICE, context)
}

/// Synthesize an answer from ranked chunk texts
pub async fn synthesize<S: AsRef<str>>(
    generator: &dyn Generator,
    ranked_texts: &[S],
    question: &str,
    timeout: Duration,
) -> Answer {
    let context = build_context(ranked_texts);
    let prompt = build_prompt(&context, question);
    debug!(
        chunks = ranked_texts.len(),
        prompt_chars = prompt.len(),
        "Invoking generator"
    );

    let failure = match generate_with_timeout(generator, &prompt, timeout).await {
        Generation::Text(text) if !text.trim().is_empty() => {
            return Answer {
                text: text.trim().to_string(),
                degraded: false,
                failure: None,
            };
        }
        Generation::Text(_) => "generator returned an empty response".to_string(),
        Generation::Failed(reason) => reason,
    };

    warn!(
        model = generator.model_name(),
        reason = %failure,
        "Answer generation degraded; returning raw context"
    );
    Answer {
        text: fallback_answer(&context),
        degraded: true,
        failure: Some(failure),
    }
}
