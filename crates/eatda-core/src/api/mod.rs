//! Backend endpoints: job submission, status reads, finalize, and the
//! download proxy URL.
//!
//! Submit and finalize calls map failures to [`AssetError::Request`] with the
//! server's own message. Status reads return the raw payload and the raw
//! [`TransportError`] so the poller can absorb transient failures.

mod types;

use std::collections::HashMap;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::EatdaConfig;
use crate::error::AssetError;
use crate::transport::{bearer, HttpClient, HttpOptions, TransportError};

pub use types::{
    EventAssetRequest, EventAssetTicket, EventFinalize, MenuPosterAssetRequest,
    MenuPosterFinalize, MenuPosterTicket, ReviewAssetRequest, ReviewAssetTicket,
    ReviewAssetType, ReviewFinalize, ASSET_TYPE, REVIEW_MIN_DESCRIPTION,
};

use types::{envelope_data, ReviewFinalized};

const NOT_SIGNED_IN: &str = "not signed in: set EATDA_ACCESS_TOKEN or access_token in config.toml";

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, http: HttpClient) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token,
            http,
        }
    }

    pub fn from_config(cfg: &EatdaConfig) -> Self {
        Self::new(
            cfg.base_url.clone(),
            cfg.token(),
            HttpClient::new(HttpOptions::from(&cfg.http)),
        )
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Bearer header for the current token, or `Request` when there is none.
    pub fn auth_headers(&self) -> Result<HashMap<String, String>, AssetError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(bearer)
            .ok_or_else(|| AssetError::request_msg(NOT_SIGNED_IN))
    }

    /// Headers for status reads. Without a token the request goes out
    /// unauthenticated and the server's 401 is treated like any other
    /// transient failure, so callers check [`ApiClient::auth_headers`] first.
    fn status_headers(&self) -> HashMap<String, String> {
        self.auth_headers().unwrap_or_default()
    }

    /// Submit an event poster job. Returns the event and its asset (job) id.
    pub async fn request_event_asset(
        &self,
        req: &EventAssetRequest,
        cancel: &CancellationToken,
    ) -> Result<EventAssetTicket, AssetError> {
        req.validate()?;
        let headers = self.auth_headers()?;
        let body = self
            .http
            .post_form(&self.url("/api/events/assets/request"), &headers, req.form(), cancel)
            .await
            .map_err(AssetError::request)?;
        let ticket: EventAssetTicket = envelope_data(&body, "event asset request")?;
        if ticket.event_asset_id <= 0 {
            return Err(AssetError::request_msg(
                "event asset request: response carried no asset id",
            ));
        }
        tracing::info!(
            event_id = ticket.event_id,
            event_asset_id = ticket.event_asset_id,
            "event asset requested"
        );
        Ok(ticket)
    }

    /// Submit a menu poster job. The asset id is resolved afterwards through
    /// the result endpoint, which the backend keys by the poster id.
    pub async fn request_menu_poster_asset(
        &self,
        req: &MenuPosterAssetRequest,
        cancel: &CancellationToken,
    ) -> Result<MenuPosterTicket, AssetError> {
        req.validate()?;
        let headers = self.auth_headers()?;
        let body = self
            .http
            .post_form(
                &self.url("/api/menu-posters/assets/request"),
                &headers,
                req.form(),
                cancel,
            )
            .await
            .map_err(AssetError::request)?;
        let ticket: MenuPosterTicket = envelope_data(&body, "menu poster request")?;
        if ticket.menu_poster_id <= 0 {
            return Err(AssetError::request_msg(
                "menu poster request: response carried no poster id",
            ));
        }
        tracing::info!(menu_poster_id = ticket.menu_poster_id, "menu poster requested");
        Ok(ticket)
    }

    /// Submit a review asset job. Returns the draft review and its asset (job) id.
    pub async fn request_review_asset(
        &self,
        req: &ReviewAssetRequest,
        cancel: &CancellationToken,
    ) -> Result<ReviewAssetTicket, AssetError> {
        req.validate()?;
        let headers = self.auth_headers()?;
        let body = self
            .http
            .post_form(&self.url("/api/reviews/assets"), &headers, req.form(), cancel)
            .await
            .map_err(AssetError::request)?;
        let ticket: ReviewAssetTicket = envelope_data(&body, "review asset request")?;
        if ticket.review_asset_id <= 0 {
            return Err(AssetError::request_msg(
                "review asset request: response carried no asset id",
            ));
        }
        tracing::info!(
            review_id = ticket.review_id,
            review_asset_id = ticket.review_asset_id,
            asset_type = %req.asset_type,
            "review asset requested"
        );
        Ok(ticket)
    }

    pub async fn event_asset_result(
        &self,
        event_asset_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.url(&format!("/api/events/assets/{event_asset_id}/result"));
        self.http.get_json(&url, &self.status_headers(), cancel).await
    }

    pub async fn menu_poster_asset_result(
        &self,
        asset_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.url(&format!("/api/menu-posters/assets/{asset_id}/result"));
        self.http.get_json(&url, &self.status_headers(), cancel).await
    }

    /// The backend answers 400/404 until the review asset row exists.
    pub async fn review_asset_result(
        &self,
        review_asset_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Value, TransportError> {
        let url = self.url(&format!("/api/reviews/assets/{review_asset_id}/result"));
        self.http.get_json(&url, &self.status_headers(), cancel).await
    }

    /// Stable download endpoint; requires the bearer header.
    pub fn event_asset_download_url(&self, event_asset_id: i64) -> String {
        self.url(&format!(
            "/api/events/assets/download?eventAssetId={event_asset_id}"
        ))
    }

    pub async fn finalize_event(
        &self,
        body: &EventFinalize,
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        self.finalize("/api/events/finalize", body, cancel).await?;
        tracing::info!(event_id = body.event_id, "event finalized");
        Ok(())
    }

    pub async fn finalize_menu_poster(
        &self,
        body: &MenuPosterFinalize,
        cancel: &CancellationToken,
    ) -> Result<(), AssetError> {
        self.finalize("/api/menu-posters/finalize", body, cancel).await?;
        tracing::info!(menu_poster_id = body.menu_poster_id, "menu poster finalized");
        Ok(())
    }

    /// Publish the review. Returns the review id the backend stored.
    pub async fn finalize_review(
        &self,
        body: &ReviewFinalize,
        cancel: &CancellationToken,
    ) -> Result<i64, AssetError> {
        body.validate()?;
        let reply = self.finalize("/api/reviews/finalize", body, cancel).await?;
        let done: ReviewFinalized = envelope_data(&reply, "review finalize")?;
        tracing::info!(review_id = done.review_id, "review finalized");
        Ok(done.review_id)
    }

    async fn finalize<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<Value, AssetError> {
        let headers = self.auth_headers()?;
        let json = serde_json::to_value(body)
            .map_err(|e| AssetError::request_msg(format!("finalize body: {e}")))?;
        self.http
            .post_json(&self.url(path), &headers, &json, cancel)
            .await
            .map_err(AssetError::request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;

    fn client(token: Option<&str>) -> ApiClient {
        ApiClient::new(
            "https://api.example.com/",
            token.map(str::to_string),
            HttpClient::default(),
        )
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let api = client(Some("t"));
        assert_eq!(
            api.event_asset_download_url(12),
            "https://api.example.com/api/events/assets/download?eventAssetId=12"
        );
        assert_eq!(
            api.url("/api/menu-posters/assets/3/result"),
            "https://api.example.com/api/menu-posters/assets/3/result"
        );
    }

    #[test]
    fn blank_token_is_not_signed_in() {
        assert!(client(Some("  ")).auth_headers().is_err());
        assert!(client(None).status_headers().is_empty());
        assert_eq!(
            client(Some("t")).auth_headers().unwrap().get("Authorization").map(String::as_str),
            Some("Bearer t")
        );
    }

    #[tokio::test]
    async fn missing_token_fails_before_network() {
        // Port 9 (discard) is never contacted: the token check comes first.
        let api = ApiClient::new("http://127.0.0.1:9", None, HttpClient::default());
        let req = MenuPosterAssetRequest {
            store_id: 1,
            menu_ids: vec![2],
            prompt: "p".into(),
            images: vec![PathBuf::from("poster.png")],
        };
        let err = api
            .request_menu_poster_asset(&req, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert_eq!(err.to_string(), NOT_SIGNED_IN);
    }

    #[tokio::test]
    async fn short_review_is_rejected_before_network() {
        let api = ApiClient::new("http://127.0.0.1:9", Some("t".into()), HttpClient::default());
        let body = ReviewFinalize {
            review_id: 1,
            review_asset_id: 2,
            description: "good".into(),
            asset_type: ReviewAssetType::Image,
            menu_ids: vec![3],
        };
        let err = api
            .finalize_review(&body, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
    }
}
