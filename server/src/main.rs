use anyhow::Result;
use axum::Router;
use clap::Parser;
use ragcore::DataPaths;
use server::{build_app, load_retriever, AppState, Strategy};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Data directory holding chunks.jsonl and the built indices
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 5000)]
    port: u16,
    /// Retrieval strategy answering queries
    #[arg(long, value_enum, default_value_t = Strategy::Dense)]
    retriever: Strategy,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    // indices are loaded once and shared read-only by every request
    let retriever = load_retriever(args.retriever, &DataPaths::new(&args.data_dir), false)?;
    let app: Router = build_app(AppState::new(retriever));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, retriever = ?args.retriever, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
