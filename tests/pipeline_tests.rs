//! End-to-end ingest and query scenarios against in-process fakes

use async_trait::async_trait;
use docqa::commands::{
    cmd_ingest, cmd_query, IngestRequest, QueryOptions, QueryResponse, NO_DATA_ANSWER,
};
use docqa::embed::{EmbedTask, Embedder};
use docqa::events::EventType;
use docqa::generate::{Generation, Generator};
use docqa::store::{ChunkStore, SourceType};
use docqa::synth::FALLBACK_NOTICE;
use docqa::{Config, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const DIMENSION: usize = 256;

/// Hashed bag-of-words embedder: texts sharing words point the same way
#[derive(Default)]
struct BagOfWordsEmbedder {
    calls: AtomicUsize,
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMENSION as u64) as usize
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[bucket(&word.to_lowercase())] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed(&self, text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }

    fn model_name(&self) -> &str {
        "bag-of-words"
    }
}

/// Generator that answers with a fixed outcome and remembers its prompts
struct RecordingGenerator {
    outcome: Generation,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    fn answering(text: &str) -> Self {
        Self {
            outcome: Generation::Text(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            outcome: Generation::Failed("model unavailable".to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> Generation {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.outcome.clone()
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

async fn setup() -> (TempDir, Config, ChunkStore) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.init_paths(Some(tmp.path().to_path_buf()));
    let store = ChunkStore::connect(&config).await.unwrap();
    (tmp, config, store)
}

async fn ingest_text(
    config: &Config,
    store: &ChunkStore,
    embedder: &BagOfWordsEmbedder,
    source: &str,
    text: &str,
) {
    cmd_ingest(
        config,
        store,
        embedder,
        IngestRequest::new(SourceType::Text, source, text),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_single_fact_round_trip() {
    let (_tmp, config, store) = setup().await;
    let embedder = BagOfWordsEmbedder::default();
    let generator = RecordingGenerator::answering("Paris.");

    let stats = cmd_ingest(
        &config,
        &store,
        &embedder,
        IngestRequest::new(SourceType::Text, "facts.txt", "Paris is the capital of France."),
    )
    .await
    .unwrap();
    assert_eq!(stats.stored_chunks, 1);
    ingest_text(
        &config,
        &store,
        &embedder,
        "fruit.txt",
        "Bananas are yellow fruit rich in potassium.",
    )
    .await;

    let response = cmd_query(
        &config,
        &store,
        &embedder,
        &generator,
        "What is the capital of France?",
        QueryOptions::default(),
    )
    .await
    .unwrap();

    let QueryResponse::Answered {
        context_used,
        results,
        answer,
        degraded,
        ..
    } = response
    else {
        panic!("expected an answered response");
    };

    assert_eq!(context_used[0], "Paris is the capital of France.");
    assert_eq!(results[0].chunk_id, stats.chunk_ids[0]);
    assert!(results[0].score > results[1].score);
    assert_eq!(answer, "Paris.");
    assert!(!degraded);

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Paris is the capital of France."));
    assert!(prompts[0].contains("What is the capital of France?"));
}

#[tokio::test]
async fn test_empty_store_skips_embedding_and_generation() {
    let (_tmp, config, store) = setup().await;
    let embedder = BagOfWordsEmbedder::default();
    let generator = RecordingGenerator::answering("should not be used");

    let response = cmd_query(
        &config,
        &store,
        &embedder,
        &generator,
        "anything",
        QueryOptions::default(),
    )
    .await
    .unwrap();

    match response {
        QueryResponse::NoData { answer, .. } => assert_eq!(answer, NO_DATA_ANSWER),
        other => panic!("expected no-data response, got {:?}", other),
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_generation_failure_returns_context() {
    let (_tmp, config, store) = setup().await;
    let embedder = BagOfWordsEmbedder::default();
    let generator = RecordingGenerator::failing();

    ingest_text(&config, &store, &embedder, "a.txt", "Rust has no garbage collector.").await;
    ingest_text(&config, &store, &embedder, "b.txt", "Rust uses ownership for memory.").await;

    let response = cmd_query(
        &config,
        &store,
        &embedder,
        &generator,
        "How does Rust manage memory?",
        QueryOptions::default(),
    )
    .await
    .expect("generation failure must not fail the query");

    let QueryResponse::Answered {
        context_used,
        answer,
        degraded,
        ..
    } = response
    else {
        panic!("expected an answered response");
    };

    assert!(degraded);
    assert_eq!(answer, format!("{}{}", FALLBACK_NOTICE, context_used.join("\n\n")));
    assert_eq!(generator.calls(), 1);

    let events = store.events().recent(1).await.unwrap();
    assert_eq!(events[0].get_type().unwrap(), EventType::Question);
    let payload = events[0].payload_json().unwrap();
    assert_eq!(payload["degraded"], true);
    assert_eq!(payload["generation_error"], "model unavailable");
}

#[tokio::test]
async fn test_equal_scores_rank_in_insertion_order() {
    let (_tmp, config, store) = setup().await;
    let embedder = BagOfWordsEmbedder::default();
    let generator = RecordingGenerator::answering("ok");

    // same words, same bag, same score
    ingest_text(&config, &store, &embedder, "first.txt", "alpha beta").await;
    ingest_text(&config, &store, &embedder, "second.txt", "beta alpha").await;

    let response = cmd_query(
        &config,
        &store,
        &embedder,
        &generator,
        "alpha beta",
        QueryOptions::default(),
    )
    .await
    .unwrap();

    let QueryResponse::Answered {
        context_used,
        results,
        ..
    } = response
    else {
        panic!("expected an answered response");
    };

    assert_eq!(results[0].score, results[1].score);
    assert!(results[0].chunk_id < results[1].chunk_id);
    assert_eq!(context_used, vec!["alpha beta".to_string(), "beta alpha".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingests_keep_text_and_vector_paired() {
    let (_tmp, config, store) = setup().await;
    let config = Arc::new(config);
    let embedder = Arc::new(BagOfWordsEmbedder::default());

    let mut handles = Vec::new();
    for i in 0..16 {
        let config = Arc::clone(&config);
        let store = store.clone();
        let embedder = Arc::clone(&embedder);
        handles.push(tokio::spawn(async move {
            let text = format!("document {} talks about topic{}", i, i);
            cmd_ingest(
                &config,
                &store,
                embedder.as_ref(),
                IngestRequest::new(SourceType::Text, format!("doc{}.txt", i), text),
            )
            .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let stats = handle.await.unwrap().unwrap();
        ids.extend(stats.chunk_ids);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 16);

    let chunks = store.all().await.unwrap();
    assert_eq!(chunks.len(), 16);
    for chunk in &chunks {
        assert_eq!(chunk.vector, bag_of_words(&chunk.text));
    }

    let events = store.events().recent(100).await.unwrap();
    assert_eq!(events.len(), 16);
    assert!(events
        .iter()
        .all(|e| e.get_type().unwrap() == EventType::TextIngest));
}
