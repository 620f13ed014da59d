//! Query command implementation

use crate::config::Config;
use crate::embed::{embed_with_timeout, EmbedTask, Embedder};
use crate::error::{Error, Result};
use crate::events::EventType;
use crate::generate::Generator;
use crate::rank::{rank, RankedResult};
use crate::store::ChunkStore;
use crate::synth::synthesize;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Answer returned when nothing has been ingested yet
pub const NO_DATA_ANSWER: &str = "No data found. Upload PDF first.";

/// Query options
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Number of chunks to use as context
    pub top_k: Option<usize>,
}

/// Query outcome
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryResponse {
    Answered {
        question: String,
        /// Ranked chunk texts in the order they were given to the generator
        context_used: Vec<String>,
        results: Vec<RankedResult>,
        answer: String,
        degraded: bool,
    },
    NoData {
        question: String,
        answer: String,
    },
}

impl QueryResponse {
    pub fn answer(&self) -> &str {
        match self {
            QueryResponse::Answered { answer, .. } | QueryResponse::NoData { answer, .. } => answer,
        }
    }
}

/// Answer `question` from the stored chunks
pub async fn cmd_query(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    question: &str,
    options: QueryOptions,
) -> Result<QueryResponse> {
    info!("Querying: {}", question);

    let k = options.top_k.unwrap_or(config.query.top_k);
    if k == 0 {
        return Err(Error::Config("top_k must be positive".to_string()));
    }

    // Snapshot first: everything below ranks against this view
    let chunks = store.all().await?;
    if chunks.is_empty() {
        info!("Store is empty; returning no-data answer");
        record_question(
            store,
            EventType::Question,
            serde_json::json!({
                "question": question,
                "no_data": true,
                "answer": NO_DATA_ANSWER,
            }),
        )
        .await;
        return Ok(QueryResponse::NoData {
            question: question.to_string(),
            answer: NO_DATA_ANSWER.to_string(),
        });
    }

    let query_vector = match embed_query(config, store, embedder, question).await {
        Ok(vector) => vector,
        Err(e) => {
            record_question(
                store,
                EventType::QuestionFailed,
                serde_json::json!({
                    "question": question,
                    "error_kind": e.kind(),
                    "error": e.to_string(),
                }),
            )
            .await;
            return Err(e);
        }
    };

    let results = rank(&query_vector, &chunks, k);
    debug!(
        searched = chunks.len(),
        returned = results.len(),
        "Ranked stored chunks"
    );

    let context_used: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
    let answer = synthesize(
        generator,
        &context_used,
        question,
        config.generation.timeout(),
    )
    .await;

    record_question(
        store,
        EventType::Question,
        serde_json::json!({
            "question": question,
            "context": context_used,
            "scores": results
                .iter()
                .map(|r| serde_json::json!({ "chunk_id": r.chunk_id, "score": r.score }))
                .collect::<Vec<_>>(),
            "answer": answer.text,
            "degraded": answer.degraded,
            "generation_error": answer.failure,
        }),
    )
    .await;

    Ok(QueryResponse::Answered {
        question: question.to_string(),
        context_used,
        results,
        answer: answer.text,
        degraded: answer.degraded,
    })
}

/// Embed the question and check it against the store's dimension
async fn embed_query(
    config: &Config,
    store: &ChunkStore,
    embedder: &dyn Embedder,
    question: &str,
) -> Result<Vec<f32>> {
    let vector = embed_with_timeout(
        embedder,
        question,
        EmbedTask::Query,
        config.embedding.call_budget(),
    )
    .await?;

    if let Some(expected) = store.dimension().await? {
        if expected != vector.len() {
            return Err(Error::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
    }
    Ok(vector)
}

async fn record_question(store: &ChunkStore, event_type: EventType, payload: serde_json::Value) {
    if let Err(e) = store.events().record(event_type, payload).await {
        warn!("Failed to record {} event: {}", event_type, e);
    }
}

/// Print a query response to console
pub fn print_query_response(response: &QueryResponse) {
    match response {
        QueryResponse::NoData { question, answer } => {
            println!("\n🔍 Question: {}\n", question);
            println!("{}", answer);
        }
        QueryResponse::Answered {
            question,
            results,
            answer,
            degraded,
            ..
        } => {
            println!("\n🔍 Question: {}\n", question);
            if *degraded {
                println!("⚠️  Generation unavailable\n");
            }
            println!("{}\n", answer);

            println!("Context ({} chunks):", results.len());
            for (i, r) in results.iter().enumerate() {
                let preview: String = r.text.chars().take(200).collect();
                let ellipsis = if r.text.chars().count() > 200 { "..." } else { "" };
                println!(
                    "{}. [score: {:.3}] #{} {}{}",
                    i + 1,
                    r.score,
                    r.chunk_id,
                    preview.trim(),
                    ellipsis
                );
            }
        }
    }
}
