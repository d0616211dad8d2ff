//! Runtime configuration: account credentials and vendor endpoints
//! (`Config`), plus the operator-tunable behaviour of the integration
//! (`Options`).
//!
//! Both can be built in code or read from `COMAP_*` environment variables.

use std::fmt;
use std::time::Duration;

use chrono_tz::Tz;

use crate::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.comapsmarthome.com";
pub const DEFAULT_AUTH_URL: &str = "https://cognito-idp.eu-west-3.amazonaws.com";
pub const DEFAULT_CLIENT_ID: &str = "56jcvrtejpracljtirq7qnob44";

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Europe::Paris;

#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub api_url: String,
    pub auth_url: String,
    pub client_id: String,
    /// Housing to control. The first housing of the account when unset.
    pub housing_id: Option<String>,
}

impl Config {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            housing_id: None,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    pub fn housing_id(mut self, id: impl Into<String>) -> Self {
        self.housing_id = Some(id.into());
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let username = non_empty("COMAP_USERNAME")
            .ok_or_else(|| Error::Config("missing COMAP_USERNAME".to_string()))?;
        let password = non_empty("COMAP_PASSWORD")
            .ok_or_else(|| Error::Config("missing COMAP_PASSWORD".to_string()))?;

        let mut config = Config::new(username, password);
        if let Some(url) = non_empty("COMAP_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = non_empty("COMAP_AUTH_URL") {
            config.auth_url = url;
        }
        if let Some(id) = non_empty("COMAP_CLIENT_ID") {
            config.client_id = id;
        }
        config.housing_id = non_empty("COMAP_HOUSING_ID");
        Ok(config)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("housing_id", &self.housing_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Period of the scheduled refresh.
    pub update_interval: Duration,
    /// A zone counts as occupied while its last presence is younger than this.
    pub presence_timeout: Duration,
    /// Offer HEAT instead of AUTO for zones following their schedule.
    pub assist_compatibility: bool,
    /// Reference zone for user-facing times.
    pub time_zone: Tz,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            presence_timeout: DEFAULT_PRESENCE_TIMEOUT,
            assist_compatibility: false,
            time_zone: DEFAULT_TIME_ZONE,
        }
    }
}

impl Options {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Options::default();

        if let Some(raw) = lookup("COMAP_UPDATE_INTERVAL_SECS") {
            let secs = parse_positive(&raw, "COMAP_UPDATE_INTERVAL_SECS")?;
            options.update_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("COMAP_PRESENCE_TIMEOUT_MINS") {
            let mins = parse_positive(&raw, "COMAP_PRESENCE_TIMEOUT_MINS")?;
            let secs = mins.checked_mul(60).ok_or_else(|| {
                Error::Config("COMAP_PRESENCE_TIMEOUT_MINS is out of range".to_string())
            })?;
            options.presence_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup("COMAP_ASSIST_COMPATIBILITY") {
            options.assist_compatibility = matches!(raw.trim(), "1" | "true" | "TRUE");
        }
        if let Some(raw) = lookup("COMAP_TIME_ZONE") {
            options.time_zone = raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| Error::Config(format!("unknown time zone: {raw}")))?;
        }
        Ok(options)
    }
}

fn parse_positive(raw: &str, key: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(Error::Config(format!("{key} must be a positive integer"))),
    }
}
