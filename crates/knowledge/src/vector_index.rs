//! Similarity index abstraction and exact-scan ranking.

use crate::types::{CallMetadata, IndexOutcome, SimilarityMatch};
use callsight_core::AppResult;
use std::cmp::Ordering;

/// Trait for similarity index backends.
///
/// Implementations must treat every call as potentially concurrent with
/// ingestion and other queries.
pub trait SimilarityIndex: Send + Sync {
    /// Return at most `k` matches with similarity `>= threshold`, highest first.
    ///
    /// An empty result is not an error.
    fn query(&self, vector: &[f32], threshold: f32, k: usize) -> AppResult<Vec<SimilarityMatch>>;

    /// Store an embedding for a record unless one already exists.
    ///
    /// The existence check and the write are a single atomic step.
    fn index(
        &self,
        record_id: i64,
        vector: &[f32],
        metadata: &CallMetadata,
    ) -> AppResult<IndexOutcome>;

    /// Number of stored embeddings.
    fn embedded_count(&self) -> AppResult<usize>;
}

/// Calculate cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Apply threshold and top-k to scored candidates.
///
/// Ties keep ascending record id order.
pub fn rank_matches(
    candidates: impl IntoIterator<Item = SimilarityMatch>,
    threshold: f32,
    k: usize,
) -> Vec<SimilarityMatch> {
    if k == 0 {
        return Vec::new();
    }

    let mut matches: Vec<SimilarityMatch> = candidates
        .into_iter()
        .filter(|m| m.similarity.is_finite() && m.similarity >= threshold)
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then(a.record_id.cmp(&b.record_id))
    });
    matches.truncate(k);
    matches
}
