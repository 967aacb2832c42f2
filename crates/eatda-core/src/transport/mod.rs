//! HTTP transport over libcurl.
//!
//! Each call is one round-trip: no retries, no sleeps (polling and fallback
//! live above this layer). Blocking curl work runs on `spawn_blocking`; the
//! async side races the cancellation token so callers return as soon as it
//! fires, and curl's progress callback tears the transfer down shortly after.

mod download;
mod error;
mod request;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;
use crate::fetch::Downloader;

pub use error::{envelope_message, TransportError};
pub use request::FormPart;

use request::RequestBody;

/// Timeouts applied to every handle.
#[derive(Debug, Clone, Copy)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(120),
        }
    }
}

impl From<&HttpConfig> for HttpOptions {
    fn from(cfg: &HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

/// Async facade over the blocking curl calls.
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    opts: HttpOptions,
}

impl HttpClient {
    pub fn new(opts: HttpOptions) -> Self {
        Self { opts }
    }

    pub async fn get_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        self.send("GET", url, headers, RequestBody::Empty, cancel)
            .await
    }

    pub async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let bytes = serde_json::to_vec(body)?;
        self.send("POST", url, headers, RequestBody::Json(bytes), cancel)
            .await
    }

    pub async fn post_form(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        parts: Vec<FormPart>,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        self.send("POST", url, headers, RequestBody::Form(parts), cancel)
            .await
    }

    async fn send(
        &self,
        method: &'static str,
        url: &str,
        headers: &HashMap<String, String>,
        body: RequestBody,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = url.to_string();
        let headers = headers.clone();
        let opts = self.opts;
        let token = cancel.clone();
        let response = run_blocking(cancel, move || {
            request::perform(method, &url, &headers, body, &opts, &token)
        })
        .await?;
        tracing::trace!(status = response.status, "response received");
        request::parse_json(&response.body)
    }
}

#[async_trait]
impl Downloader for HttpClient {
    async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransportError> {
        let url = url.to_string();
        let dest = dest.to_path_buf();
        let headers = headers.clone();
        let opts = self.opts;
        let token = cancel.clone();
        run_blocking(cancel, move || {
            download::download_to_file(&url, &dest, &headers, &opts, &token)
        })
        .await
    }

    async fn preflight(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError> {
        let url = url.to_string();
        let headers = headers.clone();
        let opts = self.opts;
        let token = cancel.clone();
        run_blocking(cancel, move || {
            download::preflight(&url, &headers, &opts, &token)
        })
        .await
    }
}

/// Runs a blocking transfer, returning early with `Cancelled` when the token fires.
async fn run_blocking<T, F>(cancel: &CancellationToken, f: F) -> Result<T, TransportError>
where
    F: FnOnce() -> Result<T, TransportError> + Send + 'static,
    T: Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(TransportError::Cancelled);
    }
    let task = tokio::task::spawn_blocking(f);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        joined = task => joined.map_err(|e| TransportError::Join(e.to_string()))?,
    }
}

/// `Authorization: Bearer <token>` header map.
pub fn bearer(token: &str) -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("Authorization".to_string(), format!("Bearer {token}"));
    h
}
