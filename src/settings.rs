use crate::scrapers::types::SearchParams;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.json";
const ENV_PREFIX: &str = "RENT_WATCHER";

/// Process configuration, loaded once at startup.
///
/// Read from `config.json` (or the file named by `RENT_WATCHER_CONFIG`), with
/// `RENT_WATCHER_*` environment variables layered on top. Nested keys use a
/// double underscore, e.g. `RENT_WATCHER_ARANTES__MAX_PAGES=3`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default)]
    pub discord_token: Option<String>,
    #[serde(default)]
    pub discord_channel: Option<String>,
    /// Distance lookups are skipped when unset
    #[serde(default)]
    pub google_maps_api_key: Option<String>,
    #[serde(default)]
    pub destination_lat: f64,
    #[serde(default)]
    pub destination_lng: f64,
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    #[serde(alias = "arantes_config")]
    pub arantes: ScraperConfig,
}

/// Settings for the listings site crawler
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Site origin, e.g. `https://www.arantesimoveis.com`
    pub base_url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Concurrent requests allowed against the site
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Upper bound of the random pause before each request
    #[serde(default = "default_random_delay_ms")]
    pub random_delay_ms: u64,
    #[serde(default)]
    pub base_params: SearchParams,
}

fn default_run_timeout_secs() -> u64 {
    30 * 60
}

fn default_search_path() -> String {
    "/imoveis".to_string()
}

fn default_max_pages() -> u32 {
    1
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_parallelism() -> usize {
    2
}

fn default_random_delay_ms() -> u64 {
    5_000
}

impl Config {
    /// Load from the config file and environment
    pub fn load() -> Result<Self> {
        let path = env::var(format!("{ENV_PREFIX}_CONFIG"))
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let builder = ::config::Config::builder()
            .add_source(::config::File::new(&path, ::config::FileFormat::Json).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder).with_context(|| format!("Failed to load configuration from {path}"))
    }

    #[cfg(test)]
    pub fn from_json(json: &str) -> Result<Self> {
        let builder = ::config::Config::builder()
            .add_source(::config::File::from_str(json, ::config::FileFormat::Json));
        Self::build(builder)
    }

    fn build(builder: ::config::ConfigBuilder<::config::builder::DefaultState>) -> Result<Self> {
        let cfg: Self = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("database_url must not be empty");
        }
        if self.arantes.base_url.trim().is_empty() {
            bail!("arantes.base_url must not be empty");
        }
        if self.arantes.max_pages == 0 {
            bail!("arantes.max_pages must be at least 1");
        }
        if self.arantes.parallelism == 0 {
            bail!("arantes.parallelism must be at least 1");
        }
        Ok(())
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Discord credentials, only when both token and channel are present
    pub fn discord(&self) -> Option<(&str, &str)> {
        match (self.discord_token.as_deref(), self.discord_channel.as_deref()) {
            (Some(token), Some(channel)) if !token.is_empty() && !channel.is_empty() => {
                Some((token, channel))
            }
            _ => None,
        }
    }

    pub fn geolocation_key(&self) -> Option<&str> {
        self.google_maps_api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl ScraperConfig {
    pub fn random_delay(&self) -> Duration {
        Duration::from_millis(self.random_delay_ms)
    }
}
