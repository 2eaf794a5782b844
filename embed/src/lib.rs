//! Sentence embeddings for the dense index.

mod device;
mod model;
mod pool;

pub use model::{SentenceEmbedder, MAX_SEQ_LEN};

use anyhow::Result;
use ragcore::{Embedder, HashingEmbedder};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-mpnet-base-v2";

/// Width of the default model's vectors, reused by the hashing stand-in.
pub const DEFAULT_DIM: usize = 768;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// `RAG_MODEL_DIR` if set, else `models/<model basename>`.
pub fn resolve_model_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RAG_MODEL_DIR") {
        return PathBuf::from(dir);
    }
    let base = DEFAULT_MODEL.rsplit('/').next().unwrap_or(DEFAULT_MODEL);
    PathBuf::from("models").join(base)
}

/// The sentence model, or the hashing embedder when
/// `RAG_USE_FAKE_EMBEDDINGS` is set.
pub fn default_embedder() -> Result<Arc<dyn Embedder>> {
    if env_flag("RAG_USE_FAKE_EMBEDDINGS") {
        tracing::warn!("using hashing embedder instead of {}", DEFAULT_MODEL);
        return Ok(Arc::new(HashingEmbedder::new(DEFAULT_DIM)));
    }
    let dir = resolve_model_dir();
    anyhow::ensure!(
        dir.exists(),
        "embedding model not found at {} (set RAG_MODEL_DIR or RAG_USE_FAKE_EMBEDDINGS=1)",
        dir.display()
    );
    Ok(Arc::new(SentenceEmbedder::load(&dir, DEFAULT_MODEL)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_dir_uses_basename() {
        if std::env::var("RAG_MODEL_DIR").is_err() {
            assert_eq!(resolve_model_dir(), PathBuf::from("models/paraphrase-multilingual-mpnet-base-v2"));
        }
    }
}
