//! `eatda review` – generate review media.

use anyhow::Result;
use eatda_core::api::{ReviewAssetRequest, ReviewAssetType};
use eatda_core::pipeline::AssetPipeline;
use std::path::PathBuf;

use super::progress::spawn_progress;

#[derive(Debug, Clone)]
pub struct ReviewArgs {
    pub store_id: i64,
    pub menu_ids: Vec<i64>,
    pub asset_type: String,
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub finalize: Option<String>,
}

pub async fn run_review(pipeline: AssetPipeline, args: ReviewArgs) -> Result<()> {
    let asset_type: ReviewAssetType = args.asset_type.parse()?;
    let req = ReviewAssetRequest {
        store_id: args.store_id,
        menu_ids: args.menu_ids,
        asset_type,
        prompt: args.prompt,
        images: args.images,
    };

    let (tx, progress) = spawn_progress();
    let pipeline = pipeline.with_ticks(tx);
    println!("Requesting {} review asset...", asset_type);
    let generated = pipeline
        .generate_review_asset(&req, args.finalize.as_deref())
        .await;
    drop(pipeline);
    let _ = progress.await;

    let review = generated?;
    println!(
        "Review asset {} ready after {} attempt(s): {}",
        review.ticket.review_asset_id, review.ready.attempts, review.ready.result_url
    );
    if let Some(review_id) = review.review_id {
        println!("Review {} published.", review_id);
    }
    Ok(())
}
