//! Loads `.txt`/`.md` documents from a data directory into the Qdrant collection.
//!
//! ```bash
//! cargo run --bin ingest -- ./data --recreate
//! ```

use std::{path::PathBuf, sync::Arc};

use ai_llm_service::LlmServiceProfiles;
use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rag_store::{DEFAULT_SKIP_PREFIX, IngestOptions, LlmEmbedder, RagConfig, RagStore};

#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Chunk, embed and upsert FAQ documents into Qdrant", long_about = None)]
struct Cli {
    /// Directory scanned recursively for .txt, .md and .markdown files
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    /// Drop and recreate the collection before upserting
    #[arg(long)]
    recreate: bool,

    /// Skip files whose name starts with this prefix (empty disables skipping)
    #[arg(long, default_value = DEFAULT_SKIP_PREFIX)]
    skip_prefix: String,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    /// Directory of the JSON log file
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = ai_llm_service::telemetry::init("info", &cli.log_dir, "ingest.log")
        .context("failed to install tracing subscriber")?;

    let rag_cfg = RagConfig::from_env().context("invalid Qdrant/chunking configuration")?;
    let llm = Arc::new(LlmServiceProfiles::from_env().context("invalid LLM configuration")?);
    let embedder = LlmEmbedder::new(llm, rag_cfg.embedding_dim);
    let collection = rag_cfg.collection.clone();
    let store = RagStore::new(rag_cfg)?;

    let opts = IngestOptions {
        recreate: cli.recreate,
        skip_prefix: Some(cli.skip_prefix).filter(|p| !p.is_empty()),
        progress: !cli.no_progress,
    };

    let report = store
        .ingest_dir(&cli.data_dir, &opts, &embedder)
        .await
        .with_context(|| format!("ingestion of {} failed", cli.data_dir.display()))?;

    println!("{}", "Ingestion complete".green().bold());
    println!("  collection:          {collection}");
    println!("  documents:           {}", report.documents);
    println!("  chunks:              {}", report.chunks);
    println!("  points upserted:     {}", report.upserted);
    println!("  skipped (prefix):    {}", report.skipped_prefix);
    println!("  skipped (empty):     {}", report.skipped_empty);
    if report.skipped_unsupported > 0 {
        println!(
            "  {}",
            format!(
                "skipped (PDF/DOCX):  {} (convert to .txt or .md)",
                report.skipped_unsupported
            )
            .yellow()
        );
    }
    if report.chunks == 0 {
        println!("{}", "No chunks produced; check the data directory.".yellow());
    }

    Ok(())
}
