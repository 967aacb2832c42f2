//! Request and response bodies for the generation endpoints.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AssetError;
use crate::transport::FormPart;

/// Event and menu posters are always requested as images.
pub const ASSET_TYPE: &str = "IMAGE";

/// Body of `POST /api/events/assets/request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAssetRequest {
    pub store_id: i64,
    pub title: String,
    /// `YYYY-MM-DD`, passed through as entered.
    pub start_date: String,
    pub end_date: String,
    pub prompt: String,
    /// Reference images, uploaded as repeated `image` parts.
    pub images: Vec<PathBuf>,
}

impl EventAssetRequest {
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.title.trim().is_empty() {
            return Err(AssetError::request_msg("event title is required"));
        }
        if self.prompt.trim().is_empty() {
            return Err(AssetError::request_msg("prompt is required"));
        }
        if self.start_date.trim().is_empty() || self.end_date.trim().is_empty() {
            return Err(AssetError::request_msg("event start and end dates are required"));
        }
        Ok(())
    }

    pub(crate) fn form(&self) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("storeId", self.store_id.to_string()),
            FormPart::text("title", self.title.clone()),
            FormPart::text("type", ASSET_TYPE),
            FormPart::text("startDate", self.start_date.clone()),
            FormPart::text("endDate", self.end_date.clone()),
            FormPart::text("prompt", self.prompt.clone()),
        ];
        parts.extend(self.images.iter().map(|p| image_part(p)));
        parts
    }
}

/// Body of `POST /api/menu-posters/assets/request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPosterAssetRequest {
    pub store_id: i64,
    pub menu_ids: Vec<i64>,
    pub prompt: String,
    pub images: Vec<PathBuf>,
}

impl MenuPosterAssetRequest {
    /// The backend rejects empty menus, prompts and image lists; fail before uploading.
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.menu_ids.is_empty() {
            return Err(AssetError::request_msg("at least one menu is required"));
        }
        if self.prompt.trim().is_empty() {
            return Err(AssetError::request_msg("prompt is required"));
        }
        if self.images.is_empty() {
            return Err(AssetError::request_msg("at least one image is required"));
        }
        Ok(())
    }

    pub(crate) fn form(&self) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("storeId", self.store_id.to_string()),
            FormPart::text("type", ASSET_TYPE),
        ];
        parts.extend(
            self.menu_ids
                .iter()
                .map(|id| FormPart::text("menuIds", id.to_string())),
        );
        parts.push(FormPart::text("prompt", self.prompt.clone()));
        parts.extend(self.images.iter().map(|p| image_part(p)));
        parts
    }
}

/// Asset kinds the review endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewAssetType {
    #[serde(rename = "IMAGE")]
    Image,
    #[serde(rename = "SHORTS_RAY_2")]
    ShortsRay2,
    #[serde(rename = "SHORTS_GEN_4")]
    ShortsGen4,
}

impl ReviewAssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAssetType::Image => "IMAGE",
            ReviewAssetType::ShortsRay2 => "SHORTS_RAY_2",
            ReviewAssetType::ShortsGen4 => "SHORTS_GEN_4",
        }
    }
}

impl std::fmt::Display for ReviewAssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewAssetType {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IMAGE" => Ok(ReviewAssetType::Image),
            "SHORTS_RAY_2" => Ok(ReviewAssetType::ShortsRay2),
            "SHORTS_GEN_4" => Ok(ReviewAssetType::ShortsGen4),
            other => Err(AssetError::request_msg(format!(
                "unknown review asset type {other:?} (IMAGE, SHORTS_RAY_2 or SHORTS_GEN_4)"
            ))),
        }
    }
}

/// Body of `POST /api/reviews/assets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAssetRequest {
    pub store_id: i64,
    pub menu_ids: Vec<i64>,
    pub asset_type: ReviewAssetType,
    pub prompt: String,
    pub images: Vec<PathBuf>,
}

impl ReviewAssetRequest {
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.store_id <= 0 {
            return Err(AssetError::request_msg("store id is required"));
        }
        if self.menu_ids.is_empty() {
            return Err(AssetError::request_msg("at least one menu is required"));
        }
        if self.prompt.trim().is_empty() {
            return Err(AssetError::request_msg("prompt is required"));
        }
        if self.images.is_empty() {
            return Err(AssetError::request_msg("at least one image is required"));
        }
        Ok(())
    }

    pub(crate) fn form(&self) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("storeId", self.store_id.to_string()),
            FormPart::text("type", self.asset_type.as_str()),
            FormPart::text("prompt", self.prompt.clone()),
        ];
        parts.extend(
            self.menu_ids
                .iter()
                .map(|id| FormPart::text("menuIds", id.to_string())),
        );
        parts.extend(self.images.iter().map(|p| image_part(p)));
        parts
    }
}

fn image_part(path: &Path) -> FormPart {
    FormPart::File {
        name: "image".to_string(),
        path: path.to_path_buf(),
        content_type: Some(image_content_type(path).to_string()),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
    }
}

pub(crate) fn image_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// `data` of a successful event submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAssetTicket {
    pub event_id: i64,
    pub event_asset_id: i64,
}

/// `data` of a successful menu-poster submit. The asset id arrives later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPosterTicket {
    pub menu_poster_id: i64,
}

/// `data` of a successful review asset submit: the draft review and its asset (job).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAssetTicket {
    pub review_id: i64,
    pub review_asset_id: i64,
}

/// Body of `POST /api/events/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFinalize {
    pub event_id: i64,
    pub event_asset_id: i64,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: String,
}

/// Body of `POST /api/menu-posters/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuPosterFinalize {
    pub menu_poster_id: i64,
    pub menu_poster_asset_id: i64,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: String,
}

/// Shortest review body the backend accepts, in characters.
pub const REVIEW_MIN_DESCRIPTION: usize = 30;

/// Body of `POST /api/reviews/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFinalize {
    pub review_id: i64,
    pub review_asset_id: i64,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: ReviewAssetType,
    pub menu_ids: Vec<i64>,
}

impl ReviewFinalize {
    pub fn validate(&self) -> Result<(), AssetError> {
        if self.description.trim().chars().count() < REVIEW_MIN_DESCRIPTION {
            return Err(AssetError::request_msg(format!(
                "review text must be at least {REVIEW_MIN_DESCRIPTION} characters"
            )));
        }
        if self.menu_ids.is_empty() || self.menu_ids.iter().any(|id| *id <= 0) {
            return Err(AssetError::request_msg("review menus must be positive ids"));
        }
        Ok(())
    }
}

/// `data` of a successful review finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewFinalized {
    pub review_id: i64,
}

/// Pull `data` out of the `{code, message, status, data, timestamp}` envelope
/// and decode it. Ids must be positive.
pub(crate) fn envelope_data<T>(body: &Value, what: &str) -> Result<T, AssetError>
where
    T: for<'de> Deserialize<'de>,
{
    let data = body
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or_else(|| AssetError::request_msg(format!("{what}: response carried no data")))?;
    serde_json::from_value(data.clone())
        .map_err(|e| AssetError::request_msg(format!("{what}: unexpected response ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_form_field_order() {
        let req = EventAssetRequest {
            store_id: 3,
            title: "Grand opening".into(),
            start_date: "2025-09-01".into(),
            end_date: "2025-09-07".into(),
            prompt: "warm colours".into(),
            images: vec![PathBuf::from("/tmp/a.JPG")],
        };
        let form = req.form();
        let names: Vec<_> = form
            .iter()
            .map(|p| match p {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect();
        assert_eq!(
            names,
            ["storeId", "title", "type", "startDate", "endDate", "prompt", "image"]
        );
        assert_eq!(
            form[6],
            FormPart::File {
                name: "image".into(),
                path: PathBuf::from("/tmp/a.JPG"),
                content_type: Some("image/jpeg".into()),
                filename: Some("a.JPG".into()),
            }
        );
    }

    #[test]
    fn menu_form_repeats_menu_ids() {
        let req = MenuPosterAssetRequest {
            store_id: 1,
            menu_ids: vec![10, 11],
            prompt: "p".into(),
            images: vec![PathBuf::from("x.png"), PathBuf::from("y.webp")],
        };
        let form = req.form();
        assert_eq!(form[2], FormPart::text("menuIds", "10"));
        assert_eq!(form[3], FormPart::text("menuIds", "11"));
        assert_eq!(form.len(), 7);
    }

    #[test]
    fn menu_request_validation() {
        let mut req = MenuPosterAssetRequest {
            store_id: 1,
            menu_ids: vec![],
            prompt: "p".into(),
            images: vec![PathBuf::from("x.png")],
        };
        assert_eq!(req.validate().unwrap_err().to_string(), "at least one menu is required");
        req.menu_ids.push(4);
        req.images.clear();
        assert_eq!(req.validate().unwrap_err().to_string(), "at least one image is required");
        req.images.push(PathBuf::from("x.png"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn review_form_and_type_names() {
        let req = ReviewAssetRequest {
            store_id: 2,
            menu_ids: vec![5, 6],
            asset_type: "shorts_ray_2".parse().unwrap(),
            prompt: "cheese pull".into(),
            images: vec![PathBuf::from("a.png")],
        };
        let form = req.form();
        assert_eq!(form[1], FormPart::text("type", "SHORTS_RAY_2"));
        assert_eq!(form[3], FormPart::text("menuIds", "5"));
        assert_eq!(form[4], FormPart::text("menuIds", "6"));
        assert_eq!(form.len(), 6);
        assert!("VIDEO".parse::<ReviewAssetType>().is_err());
    }

    #[test]
    fn review_finalize_checks_length_and_menus() {
        let mut body = ReviewFinalize {
            review_id: 1,
            review_asset_id: 2,
            description: "too short".into(),
            asset_type: ReviewAssetType::Image,
            menu_ids: vec![3],
        };
        assert_eq!(
            body.validate().unwrap_err().to_string(),
            "review text must be at least 30 characters"
        );
        body.description = "맛있어요".repeat(8);
        assert!(body.validate().is_ok());
        body.menu_ids.push(0);
        assert!(body.validate().is_err());
        body.menu_ids.pop();
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "reviewId": 1,
                "reviewAssetId": 2,
                "description": body.description,
                "type": "IMAGE",
                "menuIds": [3]
            })
        );
    }

    #[test]
    fn content_types() {
        assert_eq!(image_content_type(Path::new("a.png")), "image/png");
        assert_eq!(image_content_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(image_content_type(Path::new("a")), "application/octet-stream");
    }

    #[test]
    fn finalize_uses_type_key() {
        let body = serde_json::to_value(EventFinalize {
            event_id: 1,
            event_asset_id: 2,
            description: "d".into(),
            asset_type: ASSET_TYPE.into(),
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"eventId": 1, "eventAssetId": 2, "description": "d", "type": "IMAGE"})
        );
    }

    #[test]
    fn envelope_decoding() {
        let body = json!({
            "code": "EVENT_ASSET_REQUESTED",
            "message": "ok",
            "status": 200,
            "data": {"eventId": 5, "eventAssetId": 9},
            "timestamp": "2025-09-01T10:00:00"
        });
        let ticket: EventAssetTicket = envelope_data(&body, "event request").unwrap();
        assert_eq!(ticket, EventAssetTicket { event_id: 5, event_asset_id: 9 });

        let err = envelope_data::<MenuPosterTicket>(&json!({"data": null}), "menu request")
            .unwrap_err();
        assert_eq!(err.to_string(), "menu request: response carried no data");
        assert!(envelope_data::<MenuPosterTicket>(&json!({"data": {"id": 1}}), "m").is_err());
    }
}
