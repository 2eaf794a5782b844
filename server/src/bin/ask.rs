use anyhow::{bail, Result};
use clap::Parser;
use ragcore::{generate_answer, DataPaths};
use server::{load_retriever, Strategy, DEFAULT_K};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ask")]
#[command(about = "Answer a question from the local corpus (TF-IDF or embedding retrieval)")]
struct Args {
    /// Your query; prompted for on stdin when omitted
    #[arg(long, short)]
    query: Option<String>,
    /// Number of chunks to retrieve
    #[arg(long, default_value_t = DEFAULT_K)]
    k: usize,
    /// Use the embedding retriever instead of TF-IDF
    #[arg(long, default_value_t = false)]
    use_emb: bool,
    /// Data directory holding chunks.jsonl and the built indices
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
}

fn prompt_query() -> Result<String> {
    print!("Enter query: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect::<String>().replace('\n', " ")
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let query = match args.query {
        Some(q) => q.trim().to_string(),
        None => prompt_query()?,
    };
    if query.is_empty() {
        bail!("Query cannot be empty");
    }
    let k = args.k.max(1);

    let strategy = if args.use_emb { Strategy::Dense } else { Strategy::Lexical };
    match strategy {
        Strategy::Dense => println!("\nUsing sentence-embedding retriever...\n"),
        Strategy::Lexical => println!("\nUsing TF-IDF retriever...\n"),
    }
    let retriever = load_retriever(strategy, &DataPaths::new(&args.data_dir), true)?;
    let results = retriever.retrieve(&query, k)?;

    println!("Top Retrieved Chunks:");
    for (i, r) in results.iter().enumerate() {
        println!("{}. {} ({}) score={:.4}", i + 1, r.id, r.source, r.score);
        println!("    {} ...\n", preview(&r.text));
    }

    let rule = "=".repeat(60);
    println!("{rule}");
    println!("{}", generate_answer(&query, &results, k));
    println!("{rule}");
    Ok(())
}
