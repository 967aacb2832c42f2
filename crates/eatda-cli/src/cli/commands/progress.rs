//! Poll progress printer fed by the pipeline's attempt channel.

use eatda_core::poll::PollAttempt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffer for attempt records; the poll loop drops records when it is full.
const PROGRESS_BUFFER: usize = 16;

/// Spawn a task printing one line per attempt. It ends once every sender is dropped.
pub fn spawn_progress() -> (mpsc::Sender<PollAttempt>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<PollAttempt>(PROGRESS_BUFFER);
    let handle = tokio::spawn(async move {
        while let Some(a) = rx.recv().await {
            println!("  {}", describe(&a));
        }
    });
    (tx, handle)
}

fn describe(a: &PollAttempt) -> String {
    let state = if let Some(err) = &a.transport_error {
        format!("network error, retrying ({err})")
    } else if let Some(id) = a.job_id {
        format!("asset id {id}")
    } else {
        match a.phase {
            Some(phase) => phase.to_string().to_lowercase(),
            None => "waiting".to_string(),
        }
    };
    format!(
        "[#{} {:>5.1}s] {}",
        a.attempt,
        a.elapsed.as_secs_f64(),
        state
    )
}
