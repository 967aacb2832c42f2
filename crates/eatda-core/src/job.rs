//! Client-side view of one generation job.
//!
//! The phase is never authoritative here: it is recomputed from every poll
//! response and only checked for monotonic progression.

use std::fmt;

use crate::error::AssetError;
use crate::normalize::NormalizedResponse;

/// Phase of a generation job as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Pending,
    Processing,
    Success,
    Failed,
    /// Neither a status code nor a literal status could be read. Polled like `Pending`.
    Unknown,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Success | JobPhase::Failed)
    }

    /// Parse a literal status value. Only the four canonical names are accepted.
    pub fn from_literal(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobPhase::Pending),
            "PROCESSING" => Some(JobPhase::Processing),
            "SUCCESS" => Some(JobPhase::Success),
            "FAILED" => Some(JobPhase::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Processing => "PROCESSING",
            JobPhase::Success => "SUCCESS",
            JobPhase::Failed => "FAILED",
            JobPhase::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One in-flight or completed generation request.
#[derive(Debug, Clone)]
pub struct AssetJob {
    job_id: i64,
    parent_id: Option<i64>,
    phase: JobPhase,
    result_url: Option<String>,
    last_error: Option<String>,
}

impl AssetJob {
    pub fn new(job_id: i64) -> Self {
        Self {
            job_id,
            parent_id: None,
            phase: JobPhase::Pending,
            result_url: None,
            last_error: None,
        }
    }

    /// A job whose id was resolved from a parent resource (e.g. a menu poster).
    pub fn with_parent(job_id: i64, parent_id: i64) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::new(job_id)
        }
    }

    pub fn job_id(&self) -> i64 {
        self.job_id
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The result URL, only once the job succeeded and the URL is non-empty.
    pub fn ready_url(&self) -> Option<&str> {
        match (self.phase, self.result_url.as_deref()) {
            (JobPhase::Success, Some(u)) if !u.is_empty() => Some(u),
            _ => None,
        }
    }

    /// Apply one normalized poll response.
    ///
    /// `Unknown` carries no information and leaves the phase alone. Any move
    /// out of a terminal phase (back to pending, or success to failed) is a
    /// protocol violation and the job is left unchanged.
    pub fn observe(&mut self, response: &NormalizedResponse) -> Result<(), AssetError> {
        let next = response.phase;
        if next == JobPhase::Unknown {
            return Ok(());
        }
        if self.phase.is_terminal() && next != self.phase {
            return Err(AssetError::ProtocolConsistency {
                job_id: self.job_id,
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        if let Some(url) = &response.result_url {
            self.result_url = Some(url.clone());
        }
        Ok(())
    }

    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}
