//! Error taxonomy for generation tracking and asset retrieval.
//!
//! Every failure that reaches a caller is an [`AssetError`]; its `Display`
//! output is the single human-readable message shown by the UI layer and
//! [`AssetError::kind`] gives the closed category next to it.

use std::time::Duration;

use crate::job::JobPhase;
use crate::transport::TransportError;

/// Closed error category exposed next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TerminalJobFailure,
    PollTimeout,
    RetrievalTierExhausted,
    ProtocolConsistency,
    Cancelled,
    Request,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The backend reported the generation job as failed. Not retried.
    #[error("{message}")]
    TerminalJobFailure { message: String },

    /// No terminal state was observed before the wall-clock deadline.
    #[error("generation timed out")]
    PollTimeout { waited: Duration, attempts: u32 },

    /// Every retrieval tier failed; carries the most specific message seen.
    #[error("{message}")]
    RetrievalTierExhausted { message: String },

    /// A job reported a phase that contradicts an earlier terminal phase.
    #[error("job {job_id}: phase went from {from:?} to {to:?}")]
    ProtocolConsistency {
        job_id: i64,
        from: JobPhase,
        to: JobPhase,
    },

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Building or sending a request failed before any job existed.
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: Option<TransportError>,
    },
}

/// Message used when a job fails without the backend saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "asset generation failed";

impl AssetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::TerminalJobFailure { .. } => ErrorKind::TerminalJobFailure,
            AssetError::PollTimeout { .. } => ErrorKind::PollTimeout,
            AssetError::RetrievalTierExhausted { .. } => ErrorKind::RetrievalTierExhausted,
            AssetError::ProtocolConsistency { .. } => ErrorKind::ProtocolConsistency,
            AssetError::Cancelled => ErrorKind::Cancelled,
            AssetError::Request { .. } => ErrorKind::Request,
        }
    }

    /// Wrap a failed submit/finalize round-trip, keeping the server's message.
    pub(crate) fn request(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => AssetError::Cancelled,
            other => AssetError::Request {
                message: other.user_message(),
                source: Some(other),
            },
        }
    }

    pub(crate) fn request_msg(message: impl Into<String>) -> Self {
        AssetError::Request {
            message: message.into(),
            source: None,
        }
    }
}
