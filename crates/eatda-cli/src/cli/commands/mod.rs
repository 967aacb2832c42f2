//! CLI command handlers, one per file.

mod event;
mod menu_poster;
mod progress;
mod resolve;
mod review;
mod save;
mod wait;

pub use event::{run_event, EventArgs};
pub use menu_poster::{run_menu_poster, MenuPosterArgs};
pub use resolve::run_resolve;
pub use review::{run_review, ReviewArgs};
pub use save::run_save;
pub use wait::{run_wait, WaitTarget};
