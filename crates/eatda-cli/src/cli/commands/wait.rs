//! `eatda wait <asset-id>` – wait for a submitted asset.

use anyhow::Result;
use eatda_core::pipeline::AssetPipeline;

use super::progress::spawn_progress;

/// Which result endpoint the asset id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    Event,
    MenuPoster,
    Review,
}

pub async fn run_wait(pipeline: AssetPipeline, asset_id: i64, target: WaitTarget) -> Result<()> {
    let (tx, progress) = spawn_progress();
    let pipeline = pipeline.with_ticks(tx);
    let ready = match target {
        WaitTarget::Event => pipeline.wait_event_asset(asset_id).await,
        WaitTarget::MenuPoster => pipeline.wait_menu_poster_asset(asset_id).await,
        WaitTarget::Review => pipeline.wait_review_asset(asset_id).await,
    };
    drop(pipeline);
    let _ = progress.await;

    let ready = ready?;
    println!(
        "Asset {} ready after {} attempt(s) ({:.1}s): {}",
        ready.job_id,
        ready.attempts,
        ready.elapsed.as_secs_f64(),
        ready.result_url
    );
    Ok(())
}
