//! `eatda event` – generate an event poster.

use anyhow::Result;
use eatda_core::api::EventAssetRequest;
use eatda_core::pipeline::AssetPipeline;
use std::path::PathBuf;

use super::progress::spawn_progress;

#[derive(Debug, Clone)]
pub struct EventArgs {
    pub store_id: i64,
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub finalize: Option<String>,
    pub save: bool,
}

pub async fn run_event(pipeline: AssetPipeline, args: EventArgs) -> Result<()> {
    let req = EventAssetRequest {
        store_id: args.store_id,
        title: args.title,
        start_date: args.start_date,
        end_date: args.end_date,
        prompt: args.prompt,
        images: args.images,
    };

    let (tx, progress) = spawn_progress();
    let pipeline = pipeline.with_ticks(tx);
    println!("Requesting event poster for store {}...", req.store_id);
    let outcome: Result<()> = async {
        let poster = pipeline
            .generate_event_poster(&req, args.finalize.as_deref())
            .await?;
        println!(
            "Event {} asset {} ready after {} attempt(s): {}",
            poster.ticket.event_id,
            poster.ticket.event_asset_id,
            poster.ready.attempts,
            poster.ready.result_url
        );
        if let Some(path) = &poster.cached_path {
            println!("Cached at {}", path.display());
        }
        if poster.finalized {
            println!("Event published.");
        }
        if args.save {
            let saved = pipeline
                .save_event_asset(
                    poster.ticket.event_asset_id,
                    Some(&poster.ready.result_url),
                    poster.cached_path.clone(),
                )
                .await?;
            println!("Saved to {} (via {})", saved.media_path.display(), saved.tier);
        }
        Ok(())
    }
    .await;

    drop(pipeline);
    let _ = progress.await;
    outcome
}
