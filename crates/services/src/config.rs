use std::env;
use std::time::Duration;

use pathway_core::model::ResetPolicy;

pub const DEFAULT_DB_URL: &str = "sqlite://pathway.sqlite3";
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Where the remote progress and comment services live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl RemoteConfig {
    /// `None` when no base URL is configured, which means offline operation.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup("PATHWAY_API_BASE_URL")?;
        if base_url.trim().is_empty() {
            return None;
        }
        let token = lookup("PATHWAY_API_TOKEN").filter(|t| !t.trim().is_empty());
        Some(Self {
            base_url: base_url.trim().to_owned(),
            token,
        })
    }
}

/// Timing and policy knobs for the sync and recompute layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    /// Upper bound for every remote call.
    pub request_timeout: Duration,
    /// Period of the safety-net recompute timer.
    pub refresh_interval: Duration,
    pub reset_policy: ResetPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_SYNC_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            reset_policy: ResetPolicy::IncorrectOnly,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable or zero values fall back to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let request_timeout = lookup("PATHWAY_SYNC_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map_or(defaults.request_timeout, Duration::from_millis);
        let refresh_interval = lookup("PATHWAY_REFRESH_INTERVAL_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(defaults.refresh_interval, Duration::from_secs);
        let reset_policy = match lookup("PATHWAY_ALLOW_CORRECT_RESET").as_deref().map(str::trim) {
            Some("1" | "true" | "yes") => ResetPolicy::AllowCorrect,
            _ => defaults.reset_policy,
        };
        Self {
            request_timeout,
            refresh_interval,
            reset_policy,
        }
    }
}

/// Everything needed to assemble the services from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathwayConfig {
    pub db_url: String,
    pub remote: Option<RemoteConfig>,
    pub sync: SyncSettings,
}

impl PathwayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_url = lookup("PATHWAY_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        Self {
            db_url,
            remote: RemoteConfig::from_lookup(&lookup),
            sync: SyncSettings::from_lookup(&lookup),
        }
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite:") {
        trimmed.to_owned()
    } else {
        format!("sqlite://{trimmed}")
    }
}
