//! Canonical view of loosely-typed backend status payloads.
//!
//! The result endpoints do not agree on field names (`path`, `assetUrl`,
//! `posterUrl`, `url`, nested under `data` or not) and report phase either
//! as a taxonomy code (`POSTER_GENERATION_SUCCESS`) or a literal `status`.
//! [`normalize`] is total: missing or odd fields just come back empty.

mod fields;

use serde_json::Value;

use crate::job::JobPhase;

pub use fields::extract_job_id;

/// URL aliases in precedence order, checked under `data` first, then top level.
pub const URL_KEYS: [&str; 4] = ["path", "assetUrl", "posterUrl", "url"];

/// URL keys of the review-asset result, which names the field by asset type.
pub const REVIEW_URL_KEYS: [&str; 3] = ["imageUrl", "shortsUrl", "assetUrl"];

/// Keys that may carry an asynchronously assigned job id.
pub const JOB_ID_KEYS: [&str; 4] = ["assetId", "menuPosterAssetId", "eventAssetId", "jobId"];

/// `{phase, resultUrl, message, code}` extracted from one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub phase: JobPhase,
    pub result_url: Option<String>,
    pub message: Option<String>,
    pub code: Option<String>,
}

/// Closed readiness classification the poll loop branches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Processing,
    /// Success with a usable URL.
    Ready { url: String },
    /// Success reported but the URL is not written yet.
    AwaitingUrl,
    Failed { message: Option<String> },
    Unknown,
}

impl NormalizedResponse {
    pub fn status(&self) -> AssetStatus {
        match self.phase {
            JobPhase::Pending => AssetStatus::Pending,
            JobPhase::Processing => AssetStatus::Processing,
            JobPhase::Success => match &self.result_url {
                Some(url) => AssetStatus::Ready { url: url.clone() },
                None => AssetStatus::AwaitingUrl,
            },
            JobPhase::Failed => AssetStatus::Failed {
                message: self.message.clone(),
            },
            JobPhase::Unknown => AssetStatus::Unknown,
        }
    }
}

/// Normalize a parsed payload. `Value::Null` (no body) yields an empty `Unknown`.
pub fn normalize(payload: &Value) -> NormalizedResponse {
    normalize_with(payload, &URL_KEYS)
}

/// [`normalize`] with the URL looked up under `url_keys` instead of [`URL_KEYS`].
pub fn normalize_with(payload: &Value, url_keys: &[&str]) -> NormalizedResponse {
    let data = payload.get("data");
    let code = fields::non_empty_str(payload, "code");

    let phase = code
        .as_deref()
        .map(str::trim)
        .and_then(fields::phase_from_code)
        .or_else(|| fields::literal_status(payload))
        .or_else(|| data.and_then(fields::literal_status))
        .unwrap_or(JobPhase::Unknown);

    let result_url = data
        .and_then(|d| fields::first_string(d, url_keys))
        .or_else(|| fields::first_string(payload, url_keys));

    let message = fields::non_empty_str(payload, "message")
        .or_else(|| fields::non_empty_str(payload, "error"))
        .or_else(|| data.and_then(|d| fields::non_empty_str(d, "message")));

    NormalizedResponse {
        phase,
        result_url,
        message,
        code,
    }
}
