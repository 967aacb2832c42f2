//! Resilient asset retrieval.
//!
//! A ready asset is saved into the media store through an ordered chain:
//! the prefetched cache file, then the direct signed URL, then the
//! authenticated proxy endpoint. The first tier that writes to the store
//! ends the chain. Cache and direct failures fall through; a proxy failure
//! is reported to the caller with the most specific server message seen.
//!
//! Repeated retrievals of the same resource are counted (for log
//! correlation) but not deduplicated or rate-limited.

mod prefetch;
mod tier;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AssetError;
use crate::storage;
use crate::transport::TransportError;

pub use prefetch::prefetch_to_cache;
pub use tier::{RetrievalAttempt, RetrievalOutcome, RetrievalTier};

/// Streams URLs to local files. Implementations make one attempt per call.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest` and return the written path.
    async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransportError>;

    /// Cheap request that surfaces a structured server error before a download.
    async fn preflight(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<(), TransportError>;
}

/// User-visible destination (gallery, album). An import is atomic from the
/// caller's point of view.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn import(&self, local: &Path) -> std::io::Result<PathBuf>;
}

/// Everything needed to save one asset.
#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub resource_id: i64,
    /// File written by an earlier prefetch, if any.
    pub cached_path: Option<PathBuf>,
    /// Signed result URL; may have expired.
    pub direct_url: Option<String>,
    /// Stable download endpoint for the resource.
    pub proxy_url: String,
    /// Authorization for the proxy endpoint.
    pub proxy_headers: HashMap<String, String>,
}

/// A successful save.
#[derive(Debug, Clone)]
pub struct SavedAsset {
    pub resource_id: i64,
    /// Per-resource retrieval counter, 1 for the first retrieval.
    pub retrieval: u32,
    pub tier: RetrievalTier,
    pub media_path: PathBuf,
    pub attempts: Vec<RetrievalAttempt>,
}

enum TierResult {
    Saved(PathBuf),
    Miss(String),
    Failed(String),
}

/// Distinct resources whose retrieval counts are remembered at once.
const TRACKED_RESOURCES: usize = 1024;

pub struct ResilientAssetFetcher {
    downloader: Arc<dyn Downloader>,
    store: Arc<dyn MediaStore>,
    work_dir: PathBuf,
    /// Retrieval count per resource, kept for the fetcher's lifetime. Once
    /// [`TRACKED_RESOURCES`] ids are held the map is cleared and counts
    /// restart at 1.
    retrievals: Mutex<HashMap<i64, u32>>,
}

impl ResilientAssetFetcher {
    /// `work_dir` holds temporary downloads until they are imported.
    pub fn new(
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn MediaStore>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            store,
            work_dir: work_dir.into(),
            retrievals: Mutex::new(HashMap::new()),
        }
    }

    fn next_retrieval(&self, resource_id: i64) -> u32 {
        let mut map = self
            .retrievals
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if map.len() >= TRACKED_RESOURCES && !map.contains_key(&resource_id) {
            tracing::debug!("retrieval counter reset after {} resources", map.len());
            map.clear();
        }
        let n = map.entry(resource_id).or_insert(0);
        *n += 1;
        *n
    }

    /// Save the asset, trying each tier in order until one writes to the store.
    pub async fn fetch(
        &self,
        req: &RetrievalRequest,
        cancel: &CancellationToken,
    ) -> Result<SavedAsset, AssetError> {
        let id = req.resource_id;
        let retrieval = self.next_retrieval(id);
        let mut attempts = Vec::with_capacity(3);

        for tier in [RetrievalTier::Cache, RetrievalTier::Direct, RetrievalTier::Proxy] {
            if cancel.is_cancelled() {
                return Err(AssetError::Cancelled);
            }
            let result = match tier {
                RetrievalTier::Cache => self.try_cache(req).await,
                RetrievalTier::Direct => self.try_direct(req, cancel).await?,
                RetrievalTier::Proxy => self.try_proxy(req, cancel).await?,
            };
            match result {
                TierResult::Saved(media_path) => {
                    tracing::info!(
                        "resource {} retrieval #{}: saved via {} tier to {}",
                        id,
                        retrieval,
                        tier,
                        media_path.display()
                    );
                    attempts.push(RetrievalAttempt::new(
                        tier,
                        RetrievalOutcome::Success,
                        media_path.display().to_string(),
                    ));
                    return Ok(SavedAsset {
                        resource_id: id,
                        retrieval,
                        tier,
                        media_path,
                        attempts,
                    });
                }
                TierResult::Miss(detail) => {
                    tracing::debug!("resource {} retrieval #{}: {} tier miss: {}", id, retrieval, tier, detail);
                    attempts.push(RetrievalAttempt::new(tier, RetrievalOutcome::Miss, detail));
                }
                TierResult::Failed(detail) => {
                    tracing::warn!("resource {} retrieval #{}: {} tier failed: {}", id, retrieval, tier, detail);
                    attempts.push(RetrievalAttempt::new(tier, RetrievalOutcome::Error, detail));
                }
            }
        }

        // The proxy tier never misses, so the last attempt holds its failure.
        let message = attempts
            .last()
            .map(|a| a.detail.clone())
            .unwrap_or_default();
        Err(AssetError::RetrievalTierExhausted { message })
    }

    async fn try_cache(&self, req: &RetrievalRequest) -> TierResult {
        let Some(path) = req.cached_path.as_deref() else {
            return TierResult::Miss("no prefetched file".to_string());
        };
        match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => {}
            _ => return TierResult::Miss(format!("{} no longer exists", path.display())),
        }
        match self.store.import(path).await {
            Ok(saved) => TierResult::Saved(saved),
            Err(e) => TierResult::Failed(format!("import of cached file failed: {e}")),
        }
    }

    async fn try_direct(
        &self,
        req: &RetrievalRequest,
        cancel: &CancellationToken,
    ) -> Result<TierResult, AssetError> {
        let Some(url) = req.direct_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(TierResult::Miss("no direct url".to_string()));
        };
        match self
            .download_and_import(url, &HashMap::new(), req.resource_id, cancel)
            .await
        {
            Ok(saved) => Ok(TierResult::Saved(saved)),
            Err(TransportError::Cancelled) => Err(AssetError::Cancelled),
            // Expired signed URLs land here as ordinary HTTP errors.
            Err(e) => Ok(TierResult::Failed(e.to_string())),
        }
    }

    async fn try_proxy(
        &self,
        req: &RetrievalRequest,
        cancel: &CancellationToken,
    ) -> Result<TierResult, AssetError> {
        match self
            .downloader
            .preflight(&req.proxy_url, &req.proxy_headers, cancel)
            .await
        {
            Ok(()) => {}
            Err(TransportError::Cancelled) => return Err(AssetError::Cancelled),
            Err(e) => return Ok(TierResult::Failed(proxy_message(&e))),
        }
        match self
            .download_and_import(&req.proxy_url, &req.proxy_headers, req.resource_id, cancel)
            .await
        {
            Ok(saved) => Ok(TierResult::Saved(saved)),
            Err(TransportError::Cancelled) => Err(AssetError::Cancelled),
            Err(e) => Ok(TierResult::Failed(proxy_message(&e))),
        }
    }

    /// Download into a scratch directory under `work_dir`, then import.
    /// The scratch directory is removed when this returns.
    async fn download_and_import(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        resource_id: i64,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransportError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("retrieval-")
            .tempdir_in(&self.work_dir)?;
        let dest = storage::cache_path(scratch.path(), resource_id, url);
        let local = self
            .downloader
            .download_to_file(url, &dest, headers, cancel)
            .await?;
        let saved = self.store.import(&local).await?;
        Ok(saved)
    }
}

/// Server wording when the proxy sent one, otherwise a generic message with the cause.
fn proxy_message(e: &TransportError) -> String {
    if e.has_server_message() {
        e.user_message()
    } else {
        format!("could not download the asset: {e}")
    }
}
