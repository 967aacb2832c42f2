//! Best-effort prefetch of a freshly generated asset into the local cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::Downloader;
use crate::storage;

/// Download `url` to `<cache_dir>/event-poster-<id>.<ext>`.
///
/// Failures are logged and yield `None`; a missing prefetch only means the
/// later save starts from the direct tier.
pub async fn prefetch_to_cache(
    downloader: &dyn Downloader,
    url: &str,
    cache_dir: &Path,
    resource_id: i64,
    cancel: &CancellationToken,
) -> Option<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(cache_dir).await {
        tracing::warn!(resource_id, "prefetch skipped, cache dir unusable: {}", e);
        return None;
    }
    let dest = storage::cache_path(cache_dir, resource_id, url);
    match downloader
        .download_to_file(url, &dest, &HashMap::new(), cancel)
        .await
    {
        Ok(path) => {
            tracing::info!(resource_id, "prefetched to cache: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!(resource_id, "prefetch failed (will try later): {}", e);
            None
        }
    }
}
