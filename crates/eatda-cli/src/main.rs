use eatda_core::error::AssetError;
use eatda_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; an unwritable state dir falls back to stderr.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }

    if let Err(err) = CliCommand::run_from_args().await {
        // Asset errors already carry the one message meant for the user.
        match err.downcast_ref::<AssetError>() {
            Some(asset) => eprintln!("eatda error: {}", asset),
            None => eprintln!("eatda error: {:#}", err),
        }
        std::process::exit(1);
    }
}
