use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ragcore::corpus::{load_documents, write_chunks};
use ragcore::tokenizer::AnalyzerOptions;
use ragcore::{build_dense_index, build_index_from_chunks, chunk_documents, ChunkerConfig, DataPaths, TfidfConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Chunk text files and build the lexical and dense indices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split every .txt file in a directory into a JSONL chunk corpus
    Chunk {
        /// Directory holding the raw .txt files
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
        /// Output corpus path
        #[arg(long, default_value = "./data/chunks.jsonl")]
        out: PathBuf,
        /// Maximum words per chunk (a longer sentence still forms one chunk)
        #[arg(long, default_value_t = 200)]
        max_words: usize,
        /// Trailing words repeated at the start of the next chunk
        #[arg(long, default_value_t = 40)]
        overlap: usize,
    },
    /// Fit the TF-IDF index on a chunk corpus
    Lexical {
        #[arg(long, default_value = "./data/chunks.jsonl")]
        chunks: PathBuf,
        /// Output snapshot path
        #[arg(long, default_value = "./data/index.bin")]
        out: PathBuf,
        #[command(flatten)]
        tfidf: TfidfArgs,
    },
    /// Embed every chunk and write the dense index
    Dense {
        #[arg(long, default_value = "./data/chunks.jsonl")]
        chunks: PathBuf,
        /// Directory receiving embeddings.bin and emb_meta.bin
        #[arg(long, default_value = "./data")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },
    /// Chunk, then build both indices inside one data directory
    All {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[derive(Args)]
struct TfidfArgs {
    /// Vocabulary cap, keeping the most frequent terms
    #[arg(long, default_value_t = 20_000)]
    max_features: usize,
    /// Use 1 + ln(tf) instead of raw term counts
    #[arg(long, default_value_t = false)]
    sublinear_tf: bool,
    /// Use idf = ln(N/df) + 1 instead of the smoothed ln((1+N)/(1+df)) + 1
    #[arg(long, default_value_t = false)]
    no_smooth_idf: bool,
    /// Apply English Snowball stemming
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Drop English stopwords
    #[arg(long, default_value_t = false)]
    stopwords: bool,
}

impl From<TfidfArgs> for TfidfConfig {
    fn from(a: TfidfArgs) -> Self {
        TfidfConfig {
            max_features: a.max_features,
            smooth_idf: !a.no_smooth_idf,
            sublinear_tf: a.sublinear_tf,
            analyzer: AnalyzerOptions { stem: a.stem, stopwords: a.stopwords },
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chunk { data_dir, out, max_words, overlap } => {
            chunk_dir(&data_dir, &out, ChunkerConfig { max_words, overlap_words: overlap }).map(|_| ())
        }
        Commands::Lexical { chunks, out, tfidf } => {
            build_index_from_chunks(&chunks, &out, tfidf.into())
                .with_context(|| format!("building lexical index from {}", chunks.display()))?;
            Ok(())
        }
        Commands::Dense { chunks, out_dir, batch_size } => build_dense(&chunks, &DataPaths::new(out_dir), batch_size),
        Commands::All { data_dir } => {
            let paths = DataPaths::new(&data_dir);
            chunk_dir(&data_dir, &paths.chunks(), ChunkerConfig::default())?;
            build_index_from_chunks(&paths.chunks(), &paths.lexical_index(), TfidfConfig::default())?;
            build_dense(&paths.chunks(), &paths, 32)
        }
    }
}

fn chunk_dir(data_dir: &Path, out: &Path, cfg: ChunkerConfig) -> Result<usize> {
    let docs = load_documents(data_dir).with_context(|| format!("loading documents from {}", data_dir.display()))?;
    let chunks = chunk_documents(&docs, &cfg);
    write_chunks(out, &chunks)?;
    tracing::info!(documents = docs.len(), chunks = chunks.len(), output = %out.display(), "wrote chunk corpus");
    Ok(chunks.len())
}

fn build_dense(chunks: &Path, out: &DataPaths, batch_size: usize) -> Result<()> {
    let embedder = embed::default_embedder()?;
    build_dense_index(chunks, out, embedder.as_ref(), batch_size)
        .with_context(|| format!("building dense index from {}", chunks.display()))?;
    Ok(())
}
