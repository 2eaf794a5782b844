//! Chunking, lexical and dense retrieval, and extractive answers over a small
//! local text corpus.

pub mod answer;
pub mod chunker;
pub mod corpus;
pub mod dense;
pub mod embedder;
pub mod error;
pub mod lexical;
pub mod persist;
pub mod retriever;
pub mod tokenizer;

pub use answer::generate_answer;
pub use chunker::{chunk_documents, chunk_text, ChunkerConfig};
pub use corpus::{Chunk, Document};
pub use dense::{build_dense_index, CorpusLookup, DenseIndex};
pub use embedder::{Embedder, HashingEmbedder};
pub use error::{Error, Result};
pub use lexical::{build_index_from_chunks, LexicalIndex, TfidfConfig};
pub use persist::DataPaths;
pub use retriever::{RetrievalResult, Retriever};
