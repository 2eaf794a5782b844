use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// Anything that maps text to fixed-width dense vectors.
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit length. Zero vectors are left untouched.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() { *x /= norm; }
    }
}

/// Deterministic bag-of-words embedder: each whitespace token is hashed into
/// one of `dim` buckets. Stands in for the real model in tests and offline runs.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub const MODEL_NAME: &'static str = "hashing";

    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str { Self::MODEL_NAME }

    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
