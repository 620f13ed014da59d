//! Brute-force cosine similarity ranking
//!
//! Every query scores every stored chunk: cost is linear in the number of
//! chunks times the vector dimension. That is fine up to roughly 10^4–10^5
//! chunks on one node. Any index that replaces this scan must keep the
//! zero-norm policy and the insertion-order tie-break below.

use crate::store::{Chunk, ChunkId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A scored chunk produced for a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk_id: ChunkId,
    pub score: f32,
    pub text: String,
}

/// Cosine similarity of `a` and `b`, in `[-1, 1]`.
///
/// Returns exactly `0.0` when either vector has zero norm or the lengths
/// differ. Accumulates in `f64` and clamps, so rounding never pushes the
/// score outside the unit range and the result is never NaN for finite input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

/// Score every chunk against `query` and keep the best `k`.
///
/// Results are ordered by descending score; equal scores keep insertion
/// order (lower chunk id first). Returns `min(k, chunks.len())` results.
pub fn rank(query: &[f32], chunks: &[Chunk], k: usize) -> Vec<RankedResult> {
    if k == 0 || chunks.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(f32, &Chunk)> = chunks
        .iter()
        .map(|chunk| (cosine_similarity(query, &chunk.vector), chunk))
        .collect();

    scored.sort_by(|(score_a, a), (score_b, b)| compare_ranked(*score_a, a.id, *score_b, b.id));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(score, chunk)| RankedResult {
            chunk_id: chunk.id,
            score,
            text: chunk.text.clone(),
        })
        .collect()
}

fn compare_ranked(score_a: f32, id_a: ChunkId, score_b: f32, id_b: ChunkId) -> Ordering {
    score_b.total_cmp(&score_a).then_with(|| id_a.cmp(&id_b))
}
