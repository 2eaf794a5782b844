//! Sparse TF-IDF index with cosine ranking.

use crate::corpus::{read_chunks, Chunk};
use crate::error::{Error, Result};
use crate::persist::{load_blob, save_blob, SnapshotHeader};
use crate::retriever::{top_k, RetrievalResult, Retriever};
use crate::tokenizer::{tokenize, AnalyzerOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub type TermId = u32;

/// Sparse vector as `(term, weight)` pairs sorted by term id.
pub type SparseVec = Vec<(TermId, f32)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// Keep at most this many terms, preferring the most frequent ones.
    pub max_features: usize,
    /// `ln((1 + n) / (1 + df)) + 1` instead of `ln(n / df) + 1`.
    pub smooth_idf: bool,
    /// `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
    pub analyzer: AnalyzerOptions,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self { max_features: 20_000, smooth_idf: true, sublinear_tf: false, analyzer: AnalyzerOptions::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    dictionary: HashMap<String, TermId>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf from `texts` and return the weighted rows.
    pub fn fit_transform(texts: &[&str], config: TfidfConfig) -> (Self, Vec<SparseVec>) {
        let n = texts.len();
        let doc_counts: Vec<HashMap<String, u32>> = texts
            .iter()
            .map(|t| {
                let mut counts = HashMap::new();
                for term in tokenize(t, config.analyzer) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut corpus_tf: HashMap<&str, u64> = HashMap::new();
        let mut df: HashMap<&str, u32> = HashMap::new();
        for counts in &doc_counts {
            for (term, tf) in counts {
                *corpus_tf.entry(term.as_str()).or_insert(0) += u64::from(*tf);
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<&str> = corpus_tf.keys().copied().collect();
        if terms.len() > config.max_features {
            terms.sort_by(|a, b| corpus_tf[b].cmp(&corpus_tf[a]).then_with(|| a.cmp(b)));
            terms.truncate(config.max_features);
        }
        terms.sort_unstable();

        let dictionary: HashMap<String, TermId> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as TermId))
            .collect();
        let idf: Vec<f32> = terms.iter().map(|t| idf_weight(n, df[t], config.smooth_idf)).collect();

        let vectorizer = Self { config, dictionary, idf };
        let rows = doc_counts.iter().map(|counts| vectorizer.weigh(counts)).collect();
        tracing::debug!(docs = n, terms = vectorizer.idf.len(), "fitted tf-idf vocabulary");
        (vectorizer, rows)
    }

    /// Project text into the fitted term space; unknown terms are dropped.
    pub fn transform(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in tokenize(text, self.config.analyzer) {
            *counts.entry(term).or_insert(0) += 1;
        }
        self.weigh(&counts)
    }

    pub fn vocabulary_len(&self) -> usize { self.idf.len() }

    pub fn config(&self) -> &TfidfConfig { &self.config }

    fn weigh(&self, counts: &HashMap<String, u32>) -> SparseVec {
        let mut v: SparseVec = counts
            .iter()
            .filter_map(|(term, &tf_raw)| {
                let tid = *self.dictionary.get(term)?;
                let tf = if self.config.sublinear_tf { 1.0 + (tf_raw as f32).ln() } else { tf_raw as f32 };
                Some((tid, tf * self.idf[tid as usize]))
            })
            .collect();
        v.sort_unstable_by_key(|(tid, _)| *tid);
        let norm = v.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in v.iter_mut() { *w /= norm; }
        }
        v
    }
}

fn idf_weight(n: usize, df: u32, smooth: bool) -> f32 {
    let (n, df) = (n as f32, df.max(1) as f32);
    if smooth { ((1.0 + n) / (1.0 + df)).ln() + 1.0 } else { (n / df).ln() + 1.0 }
}

/// Dot product of two id-sorted sparse vectors.
pub fn sparse_dot(a: &[(TermId, f32)], b: &[(TermId, f32)]) -> f32 {
    let (mut i, mut j, mut acc) = (0, 0, 0.0f32);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                acc += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    acc
}

#[derive(Serialize, Deserialize)]
struct Fitted {
    vectorizer: TfidfVectorizer,
    rows: Vec<SparseVec>,
    ids: Vec<String>,
    sources: Vec<String>,
    texts: Vec<String>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    header: SnapshotHeader,
    index: &'a Fitted,
}

#[derive(Deserialize)]
struct Snapshot {
    header: SnapshotHeader,
    index: Fitted,
}

pub struct LexicalIndex {
    config: TfidfConfig,
    fitted: Option<Fitted>,
}

impl LexicalIndex {
    pub fn new(config: TfidfConfig) -> Self {
        Self { config, fitted: None }
    }

    pub fn fit(&mut self, chunks: &[Chunk]) {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let (vectorizer, rows) = TfidfVectorizer::fit_transform(&texts, self.config);
        self.fitted = Some(Fitted {
            vectorizer,
            rows,
            ids: chunks.iter().map(|c| c.id.clone()).collect(),
            sources: chunks.iter().map(|c| c.source.clone()).collect(),
            texts: chunks.iter().map(|c| c.text.clone()).collect(),
        });
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let index = self.fitted.as_ref().ok_or(Error::Unfitted)?;
        save_blob(path, &SnapshotRef { header: SnapshotHeader::now(), index })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let snap: Snapshot = load_blob(path, "lexical index")?;
        snap.header.check("lexical index")?;
        let f = &snap.index;
        let n = f.rows.len();
        if f.ids.len() != n || f.sources.len() != n || f.texts.len() != n {
            return Err(Error::Corrupt {
                what: "lexical index",
                reason: format!(
                    "{} rows but {} ids, {} sources, {} texts",
                    n, f.ids.len(), f.sources.len(), f.texts.len()
                ),
            });
        }
        tracing::debug!(path = %path.display(), chunks = n, created_at = %snap.header.created_at, "loaded lexical index");
        Ok(Self { config: *snap.index.vectorizer.config(), fitted: Some(snap.index) })
    }

    pub fn is_fitted(&self) -> bool { self.fitted.is_some() }

    pub fn len(&self) -> usize { self.fitted.as_ref().map_or(0, |f| f.rows.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn vocabulary_len(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.vectorizer.vocabulary_len())
    }

    pub fn config(&self) -> &TfidfConfig { &self.config }
}

impl Retriever for LexicalIndex {
    fn name(&self) -> &'static str { "lexical" }

    fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalResult>> {
        let f = self.fitted.as_ref().ok_or(Error::Unfitted)?;
        let q = f.vectorizer.transform(query);
        let scores: Vec<f32> = f.rows.iter().map(|row| sparse_dot(&q, row)).collect();
        let results = top_k(&scores, k)
            .into_iter()
            .map(|i| RetrievalResult {
                id: f.ids[i].clone(),
                source: f.sources[i].clone(),
                text: f.texts[i].clone(),
                score: scores[i],
            })
            .collect();
        Ok(results)
    }
}

/// Read a chunk corpus, fit a fresh index on it and persist it to `index_out`.
pub fn build_index_from_chunks(corpus_path: &Path, index_out: &Path, config: TfidfConfig) -> Result<LexicalIndex> {
    let chunks = read_chunks(corpus_path)?;
    let mut index = LexicalIndex::new(config);
    index.fit(&chunks);
    index.save(index_out)?;
    tracing::info!(
        chunks = chunks.len(),
        terms = index.vocabulary_len(),
        output = %index_out.display(),
        "built tf-idf index"
    );
    Ok(index)
}
