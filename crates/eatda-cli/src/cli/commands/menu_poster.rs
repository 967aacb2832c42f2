//! `eatda menu-poster` – generate a menu poster.

use anyhow::Result;
use eatda_core::api::MenuPosterAssetRequest;
use eatda_core::pipeline::AssetPipeline;
use std::path::PathBuf;

use super::progress::spawn_progress;

#[derive(Debug, Clone)]
pub struct MenuPosterArgs {
    pub store_id: i64,
    pub menu_ids: Vec<i64>,
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub finalize: Option<String>,
}

pub async fn run_menu_poster(pipeline: AssetPipeline, args: MenuPosterArgs) -> Result<()> {
    let req = MenuPosterAssetRequest {
        store_id: args.store_id,
        menu_ids: args.menu_ids,
        prompt: args.prompt,
        images: args.images,
    };

    let (tx, progress) = spawn_progress();
    let pipeline = pipeline.with_ticks(tx);
    println!(
        "Requesting menu poster for {} menu(s)...",
        req.menu_ids.len()
    );
    let generated = pipeline
        .generate_menu_poster(&req, args.finalize.as_deref())
        .await;
    drop(pipeline);
    let _ = progress.await;

    let poster = generated?;
    println!(
        "Menu poster {} asset {} ready after {} attempt(s): {}",
        poster.ticket.menu_poster_id, poster.asset_id, poster.ready.attempts, poster.ready.result_url
    );
    if poster.finalized {
        println!("Menu poster published.");
    }
    Ok(())
}
