//! CLI for the Eatda poster generator.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eatda_core::config;
use eatda_core::pipeline::AssetPipeline;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use commands::{
    run_event, run_menu_poster, run_resolve, run_review, run_save, run_wait, EventArgs,
    MenuPosterArgs, ReviewArgs, WaitTarget,
};

/// Top-level CLI for Eatda poster generation.
#[derive(Debug, Parser)]
#[command(name = "eatda")]
#[command(about = "Eatda: generate, track and save AI event posters, menu posters and review media", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Request an event poster, wait for it, and cache the result.
    Event {
        #[arg(long)]
        store_id: i64,
        #[arg(long)]
        title: String,
        /// First day of the event (YYYY-MM-DD).
        #[arg(long)]
        start: String,
        /// Last day of the event (YYYY-MM-DD).
        #[arg(long)]
        end: String,
        #[arg(long)]
        prompt: String,
        /// Reference image; repeat for several.
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
        /// Publish the event with this description once the poster is ready.
        #[arg(long, value_name = "DESCRIPTION")]
        finalize: Option<String>,
        /// Save the poster into the album after generation.
        #[arg(long)]
        save: bool,
    },

    /// Request a menu poster and wait for it.
    MenuPoster {
        #[arg(long)]
        store_id: i64,
        /// Menu to feature; repeat for several.
        #[arg(long = "menu-id", value_name = "ID", required = true)]
        menu_ids: Vec<i64>,
        #[arg(long)]
        prompt: String,
        /// Menu photo; repeat for several.
        #[arg(long = "image", value_name = "PATH", required = true)]
        images: Vec<PathBuf>,
        /// Publish the poster with this description once it is ready.
        #[arg(long, value_name = "DESCRIPTION")]
        finalize: Option<String>,
    },

    /// Generate a review image or short video and wait for it.
    Review {
        #[arg(long)]
        store_id: i64,
        /// Reviewed menu; repeat for several.
        #[arg(long = "menu-id", value_name = "ID", required = true)]
        menu_ids: Vec<i64>,
        /// IMAGE, SHORTS_RAY_2 or SHORTS_GEN_4.
        #[arg(long = "type", value_name = "TYPE", default_value = "IMAGE")]
        asset_type: String,
        #[arg(long)]
        prompt: String,
        /// Food photo; repeat for several.
        #[arg(long = "image", value_name = "PATH", required = true)]
        images: Vec<PathBuf>,
        /// Publish the review with this text (30 characters or more) once ready.
        #[arg(long, value_name = "TEXT")]
        finalize: Option<String>,
    },

    /// Wait for an already submitted asset to become ready.
    Wait {
        /// Asset (job) identifier.
        asset_id: i64,
        /// The id is a menu-poster asset rather than an event asset.
        #[arg(long, conflicts_with = "review")]
        menu: bool,
        /// The id is a review asset.
        #[arg(long)]
        review: bool,
    },

    /// Wait until a menu poster exposes its asset id.
    Resolve {
        /// Menu poster identifier.
        menu_poster_id: i64,
    },

    /// Save an event poster into the album.
    Save {
        /// Event asset identifier.
        event_asset_id: i64,
        /// Signed result URL to try before the download endpoint.
        #[arg(long)]
        url: Option<String>,
        /// Previously downloaded file to import first.
        #[arg(long)]
        cached: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!(base_url = %cfg.base_url, "loaded config");

        let cancel = CancellationToken::new();
        spawn_ctrl_c(cancel.clone());
        let pipeline = AssetPipeline::from_config(&cfg)?.with_cancel(cancel);

        match cli.command {
            CliCommand::Event {
                store_id,
                title,
                start,
                end,
                prompt,
                images,
                finalize,
                save,
            } => {
                let args = EventArgs {
                    store_id,
                    title,
                    start_date: start,
                    end_date: end,
                    prompt,
                    images,
                    finalize,
                    save,
                };
                run_event(pipeline, args).await?
            }
            CliCommand::MenuPoster {
                store_id,
                menu_ids,
                prompt,
                images,
                finalize,
            } => {
                let args = MenuPosterArgs {
                    store_id,
                    menu_ids,
                    prompt,
                    images,
                    finalize,
                };
                run_menu_poster(pipeline, args).await?
            }
            CliCommand::Review {
                store_id,
                menu_ids,
                asset_type,
                prompt,
                images,
                finalize,
            } => {
                let args = ReviewArgs {
                    store_id,
                    menu_ids,
                    asset_type,
                    prompt,
                    images,
                    finalize,
                };
                run_review(pipeline, args).await?
            }
            CliCommand::Wait {
                asset_id,
                menu,
                review,
            } => {
                let target = if review {
                    WaitTarget::Review
                } else if menu {
                    WaitTarget::MenuPoster
                } else {
                    WaitTarget::Event
                };
                run_wait(pipeline, asset_id, target).await?
            }
            CliCommand::Resolve { menu_poster_id } => run_resolve(&pipeline, menu_poster_id).await?,
            CliCommand::Save {
                event_asset_id,
                url,
                cached,
            } => run_save(&pipeline, event_asset_id, url.as_deref(), cached).await?,
        }

        Ok(())
    }
}

/// First Ctrl-C cancels every wait and transfer in flight.
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

#[cfg(test)]
mod tests;
