//! Status polling: one loop driving a caller-supplied status fetch to a
//! terminal outcome under backoff, a wall-clock deadline, and a
//! cancellation token.
//!
//! Two specialisations share the loop: [`Poller::wait_until_ready`] waits for
//! a job's result URL, and [`Poller::wait_for_job_id`] (or
//! [`Poller::wait_for_job_id_or_parent`]) waits for a parent resource to be
//! assigned its job id. They are run as two sequential,
//! independently configured waits.

mod attempt;
mod policy;
mod resolve;
mod run;

pub use attempt::PollAttempt;
pub use policy::{PollDecision, PollPolicy};
pub use run::{Poller, ReadyAsset};
