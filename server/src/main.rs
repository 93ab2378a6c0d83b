use anyhow::Result;
use axum::Router;
use clap::Parser;
use cord_core::ingest::{load_rows, load_text_tokens};
use cord_core::{Corpus, SearchConfig};
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Metadata path: a .json or .jsonl file, or a directory of them
    #[arg(long, default_value = "./metadata.jsonl")]
    input: PathBuf,
    /// Directory of full-text JSON papers
    #[arg(long)]
    texts: Option<PathBuf>,
    /// JSON file with search settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::from_env(),
    };

    let mut corpus = Corpus::from_rows(load_rows(&args.input)?, config.bm25)?;
    if let Some(dir) = &args.texts {
        corpus = corpus.with_text_tokens(&load_text_tokens(dir)?);
    }
    let app: Router = build_app(corpus, config);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
