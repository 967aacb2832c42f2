//! Transport error type, with the server's message pulled out of error bodies.

use serde_json::Value;

/// Error returned by a single HTTP round-trip.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Building a multipart body failed (e.g. unreadable image file).
    #[error("multipart form: {0}")]
    Form(#[from] curl::FormError),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {status}{}", suffix(.message))]
    Http { status: u32, message: Option<String> },
    /// Local file write/read failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// 2xx response whose body was not JSON.
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),
    /// The cancellation token fired while the request was in flight.
    #[error("request cancelled")]
    Cancelled,
    /// The blocking transfer task panicked or was dropped.
    #[error("transfer task failed: {0}")]
    Join(String),
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl TransportError {
    /// Build an HTTP error from a non-2xx status and its body.
    pub fn from_status(status: u32, body: &[u8]) -> Self {
        TransportError::Http {
            status,
            message: envelope_message(body),
        }
    }

    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for a toast: the server's own wording when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            TransportError::Http {
                message: Some(m), ..
            } => m.clone(),
            TransportError::Http {
                status,
                message: None,
            } => format!("HTTP {status}"),
            other => other.to_string(),
        }
    }

    /// True when the server answered with a structured message (not a bare status).
    pub fn has_server_message(&self) -> bool {
        matches!(self, TransportError::Http { message: Some(_), .. })
    }
}

/// Extract the human-readable message from an error body.
///
/// Order: JSON `message`, JSON `error`, then the raw text. Empty bodies yield `None`.
pub fn envelope_message(body: &[u8]) -> Option<String> {
    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        for key in ["message", "error"] {
            if let Some(m) = json.get(key).and_then(Value::as_str) {
                if !m.trim().is_empty() {
                    return Some(m.trim().to_string());
                }
            }
        }
    }
    Some(raw.chars().take(300).collect())
}

/// Convert a curl error, folding progress-callback aborts into `Cancelled`.
pub(crate) fn from_curl(e: curl::Error) -> TransportError {
    if e.is_aborted_by_callback() {
        TransportError::Cancelled
    } else {
        TransportError::Curl(e)
    }
}
