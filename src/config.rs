use crate::api::Endpoint;
use crate::models::SectionKind;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://lockbox-backend-vcai.onrender.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SESSION_FILE: &str = "cache/session.json";

/// Settings shared by the CLI and the web dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Narrows picks to `/api/picks/{sport}`
    pub sport: Option<String>,
    /// Poll `/api/picks/protected` with the stored session instead of the public picks
    pub protected_picks: bool,
    pub session_file: PathBuf,
    /// Where the last snapshot is kept between runs, if anywhere
    pub snapshot_cache: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sport: None,
            protected_picks: false,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            snapshot_cache: None,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment (and `.env`)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            base_url: get("LOCKBOX_API_BASE_URL").unwrap_or(defaults.base_url),
            poll_interval: match get("LOCKBOX_POLL_INTERVAL_SECS") {
                Some(v) => parse_secs("LOCKBOX_POLL_INTERVAL_SECS", &v)?,
                None => defaults.poll_interval,
            },
            request_timeout: match get("LOCKBOX_REQUEST_TIMEOUT_SECS") {
                Some(v) => parse_secs("LOCKBOX_REQUEST_TIMEOUT_SECS", &v)?,
                None => defaults.request_timeout,
            },
            sport: get("LOCKBOX_SPORT").map(|s| s.trim().to_string()),
            protected_picks: get("LOCKBOX_PROTECTED_PICKS")
                .map(|v| v.trim() == "1" || v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.protected_picks),
            session_file: get("LOCKBOX_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            snapshot_cache: get("LOCKBOX_SNAPSHOT_CACHE").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        if self.poll_interval.is_zero() {
            bail!("Poll interval must be greater than zero");
        }
        if self.request_timeout.is_zero() {
            bail!("Request timeout must be greater than zero");
        }
        Ok(())
    }

    /// The endpoints one poll cycle requests
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let picks = if self.protected_picks {
            Endpoint::protected(SectionKind::Picks, "/api/picks/protected")
        } else {
            match &self.sport {
                Some(sport) => Endpoint::new(SectionKind::Picks, format!("/api/picks/{}", sport)),
                None => Endpoint::new(SectionKind::Picks, "/api/picks"),
            }
        };

        vec![
            Endpoint::new(SectionKind::Featured, "/api/featured"),
            picks,
            Endpoint::new(SectionKind::Record, "/api/record"),
            Endpoint::new(SectionKind::Scores, "/api/scores"),
            Endpoint::new(SectionKind::Props, "/api/props"),
        ]
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, value))?;
    Ok(Duration::from_secs(secs))
}
