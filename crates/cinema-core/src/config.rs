use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of submit attempts per segment (including the first).
    pub max_attempts: u32,
    /// Linear backoff step in seconds after a transient remote failure
    /// (attempt N waits N * backoff_base_secs).
    pub backoff_base_secs: u64,
    /// Fixed wait in seconds after a failed submit call.
    pub submit_retry_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base_secs: 15,
            submit_retry_delay_secs: 10,
        }
    }
}

/// Generation provider connection (optional section in config.toml).
/// Environment variables override these, see `apply_env`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Base URL override for the provider API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token; when unset, one is minted with `gcloud`.
    /// Normally supplied via `CINEMA_ACCESS_TOKEN` rather than written to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Global configuration loaded from `~/.config/cinema/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CinemaConfig {
    /// Maximum number of segments generating at once.
    pub max_concurrent_jobs: usize,
    /// Seconds between polls of a running operation.
    pub poll_interval_secs: u64,
    /// Directory for segment artifacts and the stitched movie.
    pub output_dir: PathBuf,
    /// Optional per-job wall-clock limit in seconds (None = no local deadline).
    #[serde(default)]
    pub job_deadline_secs: Option<u64>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for CinemaConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            poll_interval_secs: 10,
            output_dir: PathBuf::from("output"),
            job_deadline_secs: None,
            retry: None,
            provider: ProviderConfig::default(),
        }
    }
}

impl CinemaConfig {
    pub fn retry_or_default(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn job_deadline(&self) -> Option<Duration> {
        self.job_deadline_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    /// Overlay environment variables (after `.env` has been loaded).
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| get(*k))
                .find(|v| !v.trim().is_empty())
        };
        if let Some(v) = first(&["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT_ID"]) {
            self.provider.project_id = Some(v);
        }
        if let Some(v) = first(&["GOOGLE_CLOUD_LOCATION", "GCLOUD_LOCATION"]) {
            self.provider.location = Some(v);
        }
        if let Some(v) = first(&["CINEMA_ACCESS_TOKEN"]) {
            self.provider.access_token = Some(v);
        }
        if let Some(v) = first(&["OUTPUT_DIR"]) {
            self.output_dir = PathBuf::from(v);
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("cinema")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from a specific file.
pub fn load_from(path: &Path) -> Result<CinemaConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: CinemaConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<CinemaConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = CinemaConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load config (explicit path or XDG default), then `.env`, then environment overrides.
pub fn load_effective(explicit: Option<&Path>) -> Result<CinemaConfig> {
    let mut cfg = match explicit {
        Some(p) => load_from(p)?,
        None => load_or_init()?,
    };
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("could not load .env: {}", e),
    }
    cfg.apply_env();
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_values() {
        let cfg = CinemaConfig::default();
        assert_eq!(cfg.max_concurrent_jobs, 4);
        assert_eq!(cfg.poll_interval_secs, 10);
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
        assert!(cfg.job_deadline().is_none());
        assert_eq!(cfg.retry_or_default().max_attempts, 3);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = CinemaConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: CinemaConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_concurrent_jobs = 2
            poll_interval_secs = 5
            output_dir = "renders"
            job_deadline_secs = 1800

            [retry]
            max_attempts = 5
            backoff_base_secs = 20
            submit_retry_delay_secs = 3

            [provider]
            project_id = "my-proj"
            location = "us-central1"
        "#;
        let cfg: CinemaConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 2);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
        assert_eq!(cfg.job_deadline(), Some(Duration::from_secs(1800)));
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.backoff_base_secs, 20);
        assert_eq!(cfg.provider.project_id.as_deref(), Some("my-proj"));
        assert!(cfg.provider.access_token.is_none());
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let cfg = CinemaConfig {
            poll_interval_secs: 0,
            ..CinemaConfig::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn env_overrides_config() {
        let env: HashMap<&str, &str> = [
            ("GCLOUD_PROJECT_ID", "legacy-proj"),
            ("GOOGLE_CLOUD_LOCATION", "europe-west4"),
            ("CINEMA_ACCESS_TOKEN", "tok"),
            ("OUTPUT_DIR", ""),
        ]
        .into_iter()
        .collect();
        let mut cfg = CinemaConfig::default();
        cfg.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.provider.project_id.as_deref(), Some("legacy-proj"));
        assert_eq!(cfg.provider.location.as_deref(), Some("europe-west4"));
        assert_eq!(cfg.provider.access_token.as_deref(), Some("tok"));
        // Empty values do not override.
        assert_eq!(cfg.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "max_concurrent_jobs = 1\npoll_interval_secs = 3\noutput_dir = \"out\"\n",
        )
        .unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.max_concurrent_jobs, 1);
        assert!(cfg.retry.is_none());
        assert_eq!(cfg.provider, ProviderConfig::default());
    }
}
