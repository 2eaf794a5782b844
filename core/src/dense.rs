//! Dense embedding index ranked by dot product over unit vectors.

use crate::corpus::{read_chunk_map, read_chunks, Chunk};
use crate::embedder::{l2_norm, normalize_in_place, Embedder};
use crate::error::{Error, Result};
use crate::persist::{load_blob, save_blob, DataPaths, SnapshotHeader};
use crate::retriever::{top_k, RetrievalResult, Retriever};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const QUERY_EPS: f32 = 1e-10;

/// Row-major `rows x dim` matrix of f32.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    pub rows: usize,
    pub dim: usize,
    pub data: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks(self.dim.max(1)).take(self.rows)
    }

    fn validate(&self) -> Result<()> {
        if self.rows * self.dim != self.data.len() {
            return Err(Error::Corrupt {
                what: "embedding matrix",
                reason: format!("{} values for a {}x{} matrix", self.data.len(), self.rows, self.dim),
            });
        }
        if let Some(pos) = self.data.iter().position(|x| !x.is_finite()) {
            return Err(Error::Corrupt {
                what: "embedding matrix",
                reason: format!("non-finite value in row {}", pos / self.dim.max(1)),
            });
        }
        Ok(())
    }

    fn normalize_rows(&mut self) {
        if self.dim == 0 { return; }
        for row in self.data.chunks_mut(self.dim) {
            normalize_in_place(row);
        }
    }
}

/// Ids and sources aligned with the matrix rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseMeta {
    pub header: SnapshotHeader,
    pub model: String,
    pub dim: usize,
    pub ids: Vec<String>,
    pub sources: Vec<String>,
}

/// Where result text comes from at query time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorpusLookup {
    /// Re-read the corpus file on every query.
    Rescan,
    /// Read the corpus once, on first query, and keep the id map.
    #[default]
    Cached,
}

pub struct DenseIndex {
    matrix: EmbeddingMatrix,
    ids: Vec<String>,
    sources: Vec<String>,
    embedder: Arc<dyn Embedder>,
    corpus_path: PathBuf,
    lookup: CorpusLookup,
    cache: RwLock<Option<Arc<HashMap<String, Chunk>>>>,
}

impl DenseIndex {
    /// Load the matrix and metadata from `paths`; result text is read from
    /// `paths.chunks()`.
    pub fn load(paths: &DataPaths, embedder: Arc<dyn Embedder>, lookup: CorpusLookup) -> Result<Self> {
        let emb_path = paths.embeddings();
        let meta_path = paths.embedding_meta();
        if !emb_path.exists() {
            return Err(Error::not_found("embedding matrix", emb_path));
        }
        if !meta_path.exists() {
            return Err(Error::not_found("embedding metadata", meta_path));
        }
        let mut matrix: EmbeddingMatrix = load_blob(&emb_path, "embedding matrix")?;
        let meta: DenseMeta = load_blob(&meta_path, "embedding metadata")?;
        meta.header.check("embedding metadata")?;
        matrix.validate()?;
        if meta.ids.len() != matrix.rows || meta.sources.len() != matrix.rows {
            return Err(Error::Corrupt {
                what: "dense index",
                reason: format!("{} rows but {} ids, {} sources", matrix.rows, meta.ids.len(), meta.sources.len()),
            });
        }
        if meta.dim != matrix.dim {
            return Err(Error::Corrupt {
                what: "dense index",
                reason: format!("metadata dimension {} but matrix has {} columns", meta.dim, matrix.dim),
            });
        }
        if meta.model != embedder.model_name() {
            tracing::warn!(index_model = %meta.model, query_model = %embedder.model_name(), "embedding model differs from the one used at build time");
        }
        matrix.normalize_rows();
        tracing::debug!(rows = matrix.rows, dim = matrix.dim, "loaded dense index");
        Ok(Self {
            matrix,
            ids: meta.ids,
            sources: meta.sources,
            embedder,
            corpus_path: paths.chunks(),
            lookup,
            cache: RwLock::new(None),
        })
    }

    pub fn len(&self) -> usize { self.matrix.rows }

    pub fn is_empty(&self) -> bool { self.matrix.rows == 0 }

    pub fn matrix(&self) -> &EmbeddingMatrix { &self.matrix }

    fn chunk_map(&self) -> Result<Arc<HashMap<String, Chunk>>> {
        match self.lookup {
            CorpusLookup::Rescan => Ok(Arc::new(read_chunk_map(&self.corpus_path)?)),
            CorpusLookup::Cached => {
                if let Some(map) = self.cache.read().as_ref() {
                    return Ok(Arc::clone(map));
                }
                let mut slot = self.cache.write();
                if let Some(map) = slot.as_ref() {
                    return Ok(Arc::clone(map));
                }
                let map = Arc::new(read_chunk_map(&self.corpus_path)?);
                *slot = Some(Arc::clone(&map));
                Ok(map)
            }
        }
    }
}

impl Retriever for DenseIndex {
    fn name(&self) -> &'static str { "dense" }

    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let mut q = self.embedder.embed(query).map_err(Error::Embedding)?;
        if q.len() != self.matrix.dim {
            return Err(Error::DimensionMismatch { expected: self.matrix.dim, found: q.len() });
        }
        let norm = l2_norm(&q) + QUERY_EPS;
        for x in q.iter_mut() { *x /= norm; }

        let scores: Vec<f32> = self
            .matrix
            .iter_rows()
            .map(|row| row.iter().zip(&q).map(|(a, b)| a * b).sum())
            .collect();
        let top = top_k(&scores, k);

        let chunks = self.chunk_map()?;
        let results = top
            .into_iter()
            .map(|i| {
                let id = &self.ids[i];
                match chunks.get(id) {
                    Some(c) => RetrievalResult { id: id.clone(), source: c.source.clone(), text: c.text.clone(), score: scores[i] },
                    None => {
                        tracing::warn!(%id, "chunk id missing from corpus");
                        RetrievalResult { id: id.clone(), source: self.sources[i].clone(), text: String::new(), score: scores[i] }
                    }
                }
            })
            .collect();
        Ok(results)
    }
}

/// Embed every chunk of the corpus and write the matrix and metadata into `out`.
/// Returns the number of embedded chunks.
pub fn build_dense_index(corpus_path: &Path, out: &DataPaths, embedder: &dyn Embedder, batch_size: usize) -> Result<usize> {
    let records = read_chunks(corpus_path)?;
    let dim = embedder.dim();
    let mut data = Vec::with_capacity(records.len() * dim);
    let mut done = 0usize;
    for batch in records.chunks(batch_size.max(1)) {
        let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts).map_err(Error::Embedding)?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        for mut v in vectors {
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, found: v.len() });
            }
            normalize_in_place(&mut v);
            data.extend(v);
        }
        done += batch.len();
        tracing::info!(done, total = records.len(), "embedded chunks");
    }

    let matrix = EmbeddingMatrix { rows: records.len(), dim, data };
    let meta = DenseMeta {
        header: SnapshotHeader::now(),
        model: embedder.model_name().to_string(),
        dim,
        ids: records.iter().map(|c| c.id.clone()).collect(),
        sources: records.iter().map(|c| c.source.clone()).collect(),
    };
    save_blob(&out.embeddings(), &matrix)?;
    save_blob(&out.embedding_meta(), &meta)?;
    tracing::info!(chunks = records.len(), dim, model = %meta.model, "saved dense index");
    Ok(records.len())
}
