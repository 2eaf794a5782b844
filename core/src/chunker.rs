//! Sentence-aware chunking with a trailing-word overlap window.

use crate::corpus::{Chunk, Document};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// A sentence terminator (including the danda) followed by whitespace.
    static ref SENTENCE_END: Regex = Regex::new(r"[।.?!]\s+").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub max_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_words: 200, overlap_words: 40 }
    }
}

/// Split text after every sentence terminator that is followed by whitespace.
/// The terminator stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", " ").replace('\n', " ");
    let text = text.trim();
    let mut sents = Vec::new();
    let mut last = 0;
    for m in SENTENCE_END.find_iter(text) {
        // the terminator is a single char; the rest of the match is whitespace
        let term_len = text[m.start()..].chars().next().map(char::len_utf8).unwrap_or(1);
        sents.push(&text[last..m.start() + term_len]);
        last = m.end();
    }
    sents.push(&text[last..]);
    sents
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedily pack whole sentences into chunks of at most `max_words` words. A
/// new chunk starts with the last `overlap` words of the previous one.
pub fn chunk_text(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let sents = split_sentences(text);
    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    for sent in &sents {
        let words: Vec<&str> = sent.split_whitespace().collect();
        if buf.len() + words.len() > max_words && !buf.is_empty() {
            chunks.push(buf.join(" "));
            let cut = buf.len() - overlap.min(buf.len());
            buf.drain(..cut);
        }
        buf.extend(words);
    }
    if !buf.is_empty() {
        chunks.push(buf.join(" "));
    }
    chunks
}

/// Chunk every document in order, numbering chunks globally as `chunk_<n>`.
pub fn chunk_documents(docs: &[Document], cfg: &ChunkerConfig) -> Vec<Chunk> {
    let mut out = Vec::new();
    for doc in docs {
        if doc.text.trim().is_empty() {
            tracing::debug!(source = %doc.name, "skipping empty document");
            continue;
        }
        for text in chunk_text(&doc.text, cfg.max_words, cfg.overlap_words) {
            out.push(Chunk { id: format!("chunk_{}", out.len()), source: doc.name.clone(), text });
        }
    }
    out
}
