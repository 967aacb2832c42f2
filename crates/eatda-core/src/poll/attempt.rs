use std::time::{Duration, SystemTime};

use serde_json::Value;

use crate::job::JobPhase;

/// Record of one status round-trip, sent to the observer channel after every
/// attempt. Not persisted and never consulted by the poll loop itself.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    /// 1-based attempt number within this wait.
    pub attempt: u32,
    /// Time since the first attempt started.
    pub elapsed: Duration,
    pub timestamp: SystemTime,
    pub raw_response: Option<Value>,
    pub phase: Option<JobPhase>,
    pub result_url: Option<String>,
    /// Set by the job-id resolver once an id is visible.
    pub job_id: Option<i64>,
    /// Transient transport failure absorbed by the loop.
    pub transport_error: Option<String>,
}

impl PollAttempt {
    pub(crate) fn new(attempt: u32, elapsed: Duration) -> Self {
        Self {
            attempt,
            elapsed,
            timestamp: SystemTime::now(),
            raw_response: None,
            phase: None,
            result_url: None,
            job_id: None,
            transport_error: None,
        }
    }

    pub fn is_transient_failure(&self) -> bool {
        self.transport_error.is_some()
    }
}
