//! `eatda resolve <menu-poster-id>` – wait for a menu poster's asset id.

use anyhow::Result;
use eatda_core::pipeline::AssetPipeline;

pub async fn run_resolve(pipeline: &AssetPipeline, menu_poster_id: i64) -> Result<()> {
    let asset_id = pipeline.resolve_menu_poster_asset_id(menu_poster_id).await?;
    println!("Menu poster {menu_poster_id} has asset id {asset_id}");
    Ok(())
}
