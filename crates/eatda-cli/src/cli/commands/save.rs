//! `eatda save <event-asset-id>` – save an event poster into the album.

use anyhow::Result;
use eatda_core::fetch::RetrievalOutcome;
use eatda_core::pipeline::AssetPipeline;
use std::path::PathBuf;

pub async fn run_save(
    pipeline: &AssetPipeline,
    event_asset_id: i64,
    url: Option<&str>,
    cached: Option<PathBuf>,
) -> Result<()> {
    let saved = pipeline.save_event_asset(event_asset_id, url, cached).await?;
    for a in &saved.attempts {
        if a.outcome != RetrievalOutcome::Success {
            println!("  {:<6} {:?}: {}", a.tier.to_string(), a.outcome, a.detail);
        }
    }
    println!(
        "Saved asset {} to {} (via {}, retrieval #{})",
        saved.resource_id,
        saved.media_path.display(),
        saved.tier,
        saved.retrieval
    );
    Ok(())
}
