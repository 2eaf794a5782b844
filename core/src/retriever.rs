use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub source: String,
    pub text: String,
    pub score: f32,
}

/// Top-k similarity search over an indexed chunk corpus.
pub trait Retriever: Send + Sync {
    /// Short label for logs ("lexical", "dense").
    fn name(&self) -> &'static str;

    /// At most `k` results, best first. Equal scores keep corpus order.
    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>>;
}

/// Sort key: NaN ranks last and `-0.0` ties with `0.0`.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

/// Indices of the `k` highest scores, descending, ties by position.
pub(crate) fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // stable sort keeps row order among equal scores
    order.sort_by(|&a, &b| rank_key(scores[b]).total_cmp(&rank_key(scores[a])));
    order.truncate(k);
    order
}
