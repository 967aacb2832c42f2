//! End-to-end flows: submit a job, wait for it, cache the result, and save
//! it to the album.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{
    ApiClient, EventAssetRequest, EventAssetTicket, EventFinalize, MenuPosterAssetRequest,
    MenuPosterFinalize, MenuPosterTicket, ReviewAssetRequest, ReviewAssetTicket, ReviewFinalize,
    ASSET_TYPE,
};
use crate::config::EatdaConfig;
use crate::error::AssetError;
use crate::fetch::{
    prefetch_to_cache, Downloader, MediaStore, ResilientAssetFetcher, RetrievalRequest, SavedAsset,
};
use crate::job::AssetJob;
use crate::normalize::REVIEW_URL_KEYS;
use crate::poll::{PollAttempt, PollPolicy, Poller, ReadyAsset};
use crate::storage::{self, AlbumStore};

/// Poll schedules for the four wait sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Policies {
    pub event: PollPolicy,
    pub menu_poster: PollPolicy,
    pub asset_id: PollPolicy,
    pub review: PollPolicy,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            event: PollPolicy::event_asset(),
            menu_poster: PollPolicy::menu_poster_asset(),
            asset_id: PollPolicy::asset_id(),
            review: PollPolicy::review_asset(),
        }
    }
}

impl Policies {
    pub fn from_config(cfg: &EatdaConfig) -> Self {
        let base = Policies::default();
        Self {
            event: PollPolicy::from_config(cfg.event_poll.as_ref(), base.event),
            menu_poster: PollPolicy::from_config(cfg.menu_poll.as_ref(), base.menu_poster),
            asset_id: PollPolicy::from_config(cfg.asset_id_poll.as_ref(), base.asset_id),
            review: PollPolicy::from_config(cfg.review_poll.as_ref(), base.review),
        }
    }
}

/// Result of [`AssetPipeline::generate_event_poster`].
#[derive(Debug, Clone)]
pub struct GeneratedEventPoster {
    pub ticket: EventAssetTicket,
    pub ready: ReadyAsset,
    /// Prefetched copy, when the prefetch succeeded.
    pub cached_path: Option<PathBuf>,
    pub finalized: bool,
}

/// Result of [`AssetPipeline::generate_menu_poster`].
#[derive(Debug, Clone)]
pub struct GeneratedMenuPoster {
    pub ticket: MenuPosterTicket,
    pub asset_id: i64,
    pub ready: ReadyAsset,
    pub finalized: bool,
}

/// Result of [`AssetPipeline::generate_review_asset`].
#[derive(Debug, Clone)]
pub struct GeneratedReviewAsset {
    pub ticket: ReviewAssetTicket,
    pub ready: ReadyAsset,
    /// Id of the published review, when a description was given.
    pub review_id: Option<i64>,
}

/// Result endpoint a wait polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultSource {
    Event,
    MenuPoster,
    Review,
}

pub struct AssetPipeline {
    api: ApiClient,
    downloader: Arc<dyn Downloader>,
    fetcher: ResilientAssetFetcher,
    cache_dir: PathBuf,
    policies: Policies,
    ticks: Option<mpsc::Sender<PollAttempt>>,
    cancel: CancellationToken,
}

impl AssetPipeline {
    /// Downloads go through `downloader`; saved files land in `store`.
    /// `cache_dir` holds prefetched posters and scratch downloads.
    pub fn new(
        api: ApiClient,
        downloader: Arc<dyn Downloader>,
        store: Arc<dyn MediaStore>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let cache_dir = cache_dir.into();
        let fetcher =
            ResilientAssetFetcher::new(Arc::clone(&downloader), store, cache_dir.join("tmp"));
        Self {
            api,
            downloader,
            fetcher,
            cache_dir,
            policies: Policies::default(),
            ticks: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Pipeline over the real backend, album and cache directories.
    pub fn from_config(cfg: &EatdaConfig) -> Result<Self> {
        let api = ApiClient::from_config(cfg);
        let downloader: Arc<dyn Downloader> = Arc::new(api.http().clone());
        let album = cfg.album_dir().context("album directory")?;
        let cache = cfg.cache_dir().context("cache directory")?;
        let store: Arc<dyn MediaStore> = Arc::new(AlbumStore::new(album));
        Ok(Self::new(api, downloader, store, cache).with_policies(Policies::from_config(cfg)))
    }

    pub fn with_policies(mut self, policies: Policies) -> Self {
        self.policies = policies;
        self
    }

    /// Forward every poll attempt to `ticks` (never blocking on it).
    pub fn with_ticks(mut self, ticks: mpsc::Sender<PollAttempt>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Abort waits and transfers once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn poller(&self, policy: &PollPolicy) -> Poller {
        let poller = Poller::new(*policy).with_cancel(self.cancel.clone());
        match &self.ticks {
            Some(tx) => poller.with_ticks(tx.clone()),
            None => poller,
        }
    }

    /// Submit, wait, prefetch, and finalize with `description` when given.
    pub async fn generate_event_poster(
        &self,
        req: &EventAssetRequest,
        description: Option<&str>,
    ) -> Result<GeneratedEventPoster, AssetError> {
        let ticket = self.api.request_event_asset(req, &self.cancel).await?;
        let mut job = AssetJob::with_parent(ticket.event_asset_id, ticket.event_id);
        let ready = self.wait_for(&mut job, ResultSource::Event).await?;
        let cached_path = self.prefetch(ticket.event_asset_id, &ready.result_url).await;

        let finalized = match description {
            Some(description) => {
                let body = EventFinalize {
                    event_id: ticket.event_id,
                    event_asset_id: ticket.event_asset_id,
                    description: description.to_string(),
                    asset_type: ASSET_TYPE.to_string(),
                };
                self.api.finalize_event(&body, &self.cancel).await?;
                true
            }
            None => false,
        };

        Ok(GeneratedEventPoster {
            ticket,
            ready,
            cached_path,
            finalized,
        })
    }

    /// Submit, resolve the asset id, wait, and finalize with `description` when given.
    pub async fn generate_menu_poster(
        &self,
        req: &MenuPosterAssetRequest,
        description: Option<&str>,
    ) -> Result<GeneratedMenuPoster, AssetError> {
        let ticket = self.api.request_menu_poster_asset(req, &self.cancel).await?;
        let asset_id = self.resolve_menu_poster_asset_id(ticket.menu_poster_id).await?;
        let mut job = AssetJob::with_parent(asset_id, ticket.menu_poster_id);
        let ready = self
            .wait_for(&mut job, ResultSource::MenuPoster)
            .await?;

        let finalized = match description {
            Some(description) => {
                let body = MenuPosterFinalize {
                    menu_poster_id: ticket.menu_poster_id,
                    menu_poster_asset_id: asset_id,
                    description: description.to_string(),
                    asset_type: ASSET_TYPE.to_string(),
                };
                self.api.finalize_menu_poster(&body, &self.cancel).await?;
                true
            }
            None => false,
        };

        Ok(GeneratedMenuPoster {
            ticket,
            asset_id,
            ready,
            finalized,
        })
    }

    /// Wait for an already submitted event asset.
    pub async fn wait_event_asset(&self, event_asset_id: i64) -> Result<ReadyAsset, AssetError> {
        self.api.auth_headers()?;
        let mut job = AssetJob::new(event_asset_id);
        self.wait_for(&mut job, ResultSource::Event).await
    }

    /// Wait for an already submitted menu-poster asset.
    pub async fn wait_menu_poster_asset(&self, asset_id: i64) -> Result<ReadyAsset, AssetError> {
        self.api.auth_headers()?;
        let mut job = AssetJob::new(asset_id);
        self.wait_for(&mut job, ResultSource::MenuPoster).await
    }

    /// Wait for an already submitted review asset.
    pub async fn wait_review_asset(&self, review_asset_id: i64) -> Result<ReadyAsset, AssetError> {
        self.api.auth_headers()?;
        let mut job = AssetJob::new(review_asset_id);
        self.wait_for(&mut job, ResultSource::Review).await
    }

    /// Submit, wait, and publish the review with `description` when given.
    pub async fn generate_review_asset(
        &self,
        req: &ReviewAssetRequest,
        description: Option<&str>,
    ) -> Result<GeneratedReviewAsset, AssetError> {
        let ticket = self.api.request_review_asset(req, &self.cancel).await?;
        let mut job = AssetJob::with_parent(ticket.review_asset_id, ticket.review_id);
        let ready = self.wait_for(&mut job, ResultSource::Review).await?;

        let review_id = match description {
            Some(description) => {
                let body = ReviewFinalize {
                    review_id: ticket.review_id,
                    review_asset_id: ticket.review_asset_id,
                    description: description.to_string(),
                    asset_type: req.asset_type,
                    menu_ids: req.menu_ids.clone(),
                };
                Some(self.api.finalize_review(&body, &self.cancel).await?)
            }
            None => None,
        };

        Ok(GeneratedReviewAsset {
            ticket,
            ready,
            review_id,
        })
    }

    /// The backend keys the menu-poster result endpoint by the poster id and
    /// answers 404 until generation is scheduled. The first recognised
    /// envelope settles the id: an explicit asset id if it carries one,
    /// otherwise the poster id itself.
    pub async fn resolve_menu_poster_asset_id(
        &self,
        menu_poster_id: i64,
    ) -> Result<i64, AssetError> {
        self.api.auth_headers()?;
        let cancel = &self.cancel;
        self.poller(&self.policies.asset_id)
            .wait_for_job_id_or_parent(menu_poster_id, || {
                self.api.menu_poster_asset_result(menu_poster_id, cancel)
            })
            .await
    }

    async fn wait_for(
        &self,
        job: &mut AssetJob,
        source: ResultSource,
    ) -> Result<ReadyAsset, AssetError> {
        let id = job.job_id();
        let cancel = &self.cancel;
        match source {
            ResultSource::Event => {
                self.poller(&self.policies.event)
                    .wait_until_ready(job, || self.api.event_asset_result(id, cancel))
                    .await
            }
            ResultSource::MenuPoster => {
                self.poller(&self.policies.menu_poster)
                    .wait_until_ready(job, || self.api.menu_poster_asset_result(id, cancel))
                    .await
            }
            ResultSource::Review => {
                self.poller(&self.policies.review)
                    .with_url_keys(&REVIEW_URL_KEYS)
                    .wait_until_ready(job, || self.api.review_asset_result(id, cancel))
                    .await
            }
        }
    }

    /// Best-effort copy into the cache; the later save falls back to the
    /// direct and proxy tiers when this fails.
    async fn prefetch(&self, resource_id: i64, url: &str) -> Option<PathBuf> {
        prefetch_to_cache(
            self.downloader.as_ref(),
            url,
            &self.cache_dir,
            resource_id,
            &self.cancel,
        )
        .await
    }

    /// Save an event asset into the album: cached file, then `direct_url`,
    /// then the authenticated download endpoint. When `cached_path` is not
    /// given, a prefetched file in the cache directory is used if present.
    pub async fn save_event_asset(
        &self,
        event_asset_id: i64,
        direct_url: Option<&str>,
        cached_path: Option<PathBuf>,
    ) -> Result<SavedAsset, AssetError> {
        let cached_path =
            cached_path.or_else(|| storage::find_cached(&self.cache_dir, event_asset_id));
        let req = RetrievalRequest {
            resource_id: event_asset_id,
            cached_path,
            direct_url: direct_url.map(str::to_string),
            proxy_url: self.api.event_asset_download_url(event_asset_id),
            // Without a token the proxy answers 401 and that message is reported.
            proxy_headers: self.api.auth_headers().unwrap_or_default(),
        };
        self.fetcher.fetch(&req, &self.cancel).await
    }
}
