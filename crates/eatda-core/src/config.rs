use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variable that overrides the file's `access_token`.
pub const TOKEN_ENV: &str = "EATDA_ACCESS_TOKEN";

/// HTTP timeouts applied to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Whole-transfer timeout, including downloads.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 120,
        }
    }
}

/// Poll schedule overrides (optional sections in config.toml).
/// Unset fields keep the built-in default for that poll site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub max_wait_ms: Option<u64>,
}

/// Global configuration loaded from `~/.config/eatda/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EatdaConfig {
    /// Backend origin, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Bearer token; `EATDA_ACCESS_TOKEN` takes priority.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Where saved posters land (default `$XDG_DATA_HOME/eatda/album`).
    #[serde(default)]
    pub album_dir: Option<PathBuf>,
    /// Prefetch cache (default `$XDG_CACHE_HOME/eatda`).
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub event_poll: Option<PollConfig>,
    #[serde(default)]
    pub menu_poll: Option<PollConfig>,
    #[serde(default)]
    pub asset_id_poll: Option<PollConfig>,
    #[serde(default)]
    pub review_poll: Option<PollConfig>,
}

impl Default for EatdaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            access_token: None,
            album_dir: None,
            cache_dir: None,
            http: HttpConfig::default(),
            event_poll: None,
            menu_poll: None,
            asset_id_poll: None,
            review_poll: None,
        }
    }
}

impl EatdaConfig {
    /// Access token from the environment, else from the file. Blank values count as unset.
    pub fn token(&self) -> Option<String> {
        resolve_token(std::env::var(TOKEN_ENV).ok(), self.access_token.as_deref())
    }

    pub fn album_dir(&self) -> Result<PathBuf> {
        match &self.album_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("eatda")?;
                Ok(xdg_dirs.get_data_home().join("eatda").join("album"))
            }
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("eatda")?;
                Ok(xdg_dirs.get_cache_home().join("eatda"))
            }
        }
    }
}

fn resolve_token(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.filter(|t| !t.trim().is_empty())
        .or_else(|| file.map(str::to_string).filter(|t| !t.trim().is_empty()))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("eatda")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EatdaConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EatdaConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EatdaConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = EatdaConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert!(cfg.access_token.is_none());
        assert_eq!(cfg.http.connect_timeout_secs, 15);
        assert_eq!(cfg.http.timeout_secs, 120);
        assert!(cfg.event_poll.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = EatdaConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EatdaConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.base_url, cfg.base_url);
        assert_eq!(parsed.http, cfg.http);
        assert!(parsed.menu_poll.is_none());
    }

    #[test]
    fn config_toml_minimal() {
        let cfg: EatdaConfig = toml::from_str(r#"base_url = "https://api.example.com""#).unwrap();
        assert_eq!(cfg.base_url, "https://api.example.com");
        assert_eq!(cfg.http, HttpConfig::default());
        assert!(cfg.album_dir.is_none());
    }

    #[test]
    fn config_toml_poll_sections() {
        let toml = r#"
            base_url = "https://api.example.com"
            access_token = "file-token"
            album_dir = "/tmp/album"

            [http]
            connect_timeout_secs = 5
            timeout_secs = 30

            [event_poll]
            interval_ms = 2000
            max_wait_ms = 60_000

            [asset_id_poll]
            backoff_factor = 1.5

            [review_poll]
            max_wait_ms = 600_000
        "#;
        let cfg: EatdaConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.access_token.as_deref(), Some("file-token"));
        assert_eq!(cfg.album_dir, Some(PathBuf::from("/tmp/album")));
        assert_eq!(cfg.http.timeout_secs, 30);
        let event = cfg.event_poll.as_ref().unwrap();
        assert_eq!(event.interval_ms, Some(2000));
        assert_eq!(event.max_wait_ms, Some(60_000));
        assert!(event.backoff_factor.is_none());
        assert!(cfg.menu_poll.is_none());
        let asset_id = cfg.asset_id_poll.as_ref().unwrap();
        assert!((asset_id.backoff_factor.unwrap() - 1.5).abs() < 1e-9);
        assert_eq!(cfg.review_poll.and_then(|r| r.max_wait_ms), Some(600_000));
    }

    #[test]
    fn env_token_wins_over_file() {
        assert_eq!(
            resolve_token(Some("env".into()), Some("file")).as_deref(),
            Some("env")
        );
        assert_eq!(resolve_token(None, Some("file")).as_deref(), Some("file"));
        assert_eq!(resolve_token(Some("  ".into()), Some("file")).as_deref(), Some("file"));
        assert_eq!(resolve_token(None, Some("")), None);
    }
}
