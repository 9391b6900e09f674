//! Batch Knowledge-Base Migration Tool
//!
//! Loads a directory of JSON files into a GraphKB database: ingests
//! every item, scores every pair with the similarity engine, and
//! writes the resulting relation edges. The run is error tolerant:
//! malformed files and unusable items are counted and skipped, never
//! fatal.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin kb-migrate -- <db-path> <data-dir>
//!
//! # e.g.
//! cargo run --bin kb-migrate -- ./graphkb.db ./corpus
//! ```
//!
//! Logging verbosity is controlled with `RUST_LOG`, e.g.
//! `RUST_LOG=graphkb_core=debug`.

use graphkb_core::db::{DatabaseService, GraphStore};
use graphkb_core::services::MigrationPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kb_migrate=info,graphkb_core=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(db_path), Some(data_dir)) = (args.next(), args.next()) else {
        eprintln!("Usage: kb-migrate <db-path> <data-dir>");
        std::process::exit(2);
    };

    println!("📦 Opening knowledge base at {db_path}...");
    let db = Arc::new(DatabaseService::new(PathBuf::from(&db_path)).await?);
    let store = GraphStore::new(db);

    println!("🚀 Migrating JSON corpus from {data_dir}...");
    let pipeline = MigrationPipeline::new(store.clone());
    let summary = pipeline.run_directory(&data_dir).await?;

    info!(
        files_loaded = summary.files_loaded,
        file_failures = summary.file_failures,
        items_ingested = summary.items_ingested,
        item_failures = summary.item_failures,
        pairs_compared = summary.pairs_compared,
        pair_failures = summary.pair_failures,
        edges_written = summary.edges_written,
        edge_failures = summary.edge_failures,
        "migration run finished"
    );

    println!(
        "\n✅ Migration complete: processed {} files, {} failures",
        summary.files_loaded, summary.file_failures
    );
    println!(
        "   Items: {} ingested, {} skipped",
        summary.items_ingested, summary.item_failures
    );
    println!(
        "   Pairs: {} compared, {} skipped, {} edges written, {} edge failures",
        summary.pairs_compared, summary.pair_failures, summary.edges_written,
        summary.edge_failures
    );

    let status = store.status().await?;
    println!("\n📊 Knowledge base status:");
    for table in &status {
        info!(table = %table.table, rows = table.rows, "table status");
        println!("   {}: {} rows", table.table, table.rows);
    }

    Ok(())
}
