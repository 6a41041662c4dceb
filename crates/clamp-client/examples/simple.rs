//! Walk through the core lifecycle against the in-memory backends:
//! ingest two versions, inspect status and history, roll back.
//!
//! Run with: cargo run -p clamp-client --example simple

use std::sync::Arc;

use clamp_client::ClampClient;
use clamp_ledger::MemoryLedger;
use clamp_points::MemoryPointStore;
use clamp_types::{ClampResult, Document};

fn batch(version: &str, ids: std::ops::Range<u64>) -> Vec<Document> {
    ids.map(|i| {
        Document::new()
            .with_id(i)
            .with_vector(vec![0.1 * i as f32, 0.2, 0.3])
            .with_field("text", format!("{version} document {i}"))
    })
    .collect()
}

#[tokio::main]
async fn main() -> ClampResult<()> {
    let client = ClampClient::new(
        Arc::new(MemoryLedger::new()),
        Arc::new(MemoryPointStore::new()),
    );

    let v1 = client
        .ingest("docs_collection", "faq", &batch("v1", 1..3), "Initial FAQ", Some("alice"))
        .await?;
    println!("v1 commit: {}", &v1[..8]);

    let v2 = client
        .ingest("docs_collection", "faq", &batch("v2", 3..6), "Expanded FAQ", Some("bob"))
        .await?;
    println!("v2 commit: {}", &v2[..8]);

    let status = client.status("docs_collection", "faq").await?;
    println!(
        "active = {:?}, {} active / {} total points",
        status.active_commit_short(),
        status.active_count,
        status.total_count
    );

    println!("history:");
    for commit in client.history("faq", None).await? {
        println!("  {} {} ({})", commit.short_hash(), commit.message, commit.author_or_unknown());
    }

    client.rollback("docs_collection", "faq", &v1).await?;
    let status = client.status("docs_collection", "faq").await?;
    println!(
        "after rollback: active = {:?}, {} active points",
        status.active_commit_short(),
        status.active_count
    );

    Ok(())
}
