use crate::error::FetchError;
use crate::scrapers::extract::{self, DetailFields, Listing};
use crate::scrapers::limiter::DomainLimiter;
use crate::scrapers::traits::ListingSource;
use crate::settings::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Scraper for the Arantes Imóveis listings site
pub struct ArantesScraper {
    client: Client,
    config: ScraperConfig,
    origin: Url,
    limiter: DomainLimiter,
}

impl ArantesScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        let origin = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid base URL: {}", config.base_url))?;
        let limiter = DomainLimiter::new(config.parallelism, config.random_delay());

        Ok(Self {
            client,
            config,
            origin,
            limiter,
        })
    }

    /// Results page URL: origin, search path, filters, then the page number
    pub fn listing_url(&self, page: u32) -> Result<Url, FetchError> {
        let mut url = self.origin.join(&self.config.search_path)?;
        url.query_pairs_mut()
            .extend_pairs(self.config.base_params.query_pairs(page));
        Ok(url)
    }

    /// Detail page URL for a normalized listing id
    pub fn detail_url(&self, id: &str) -> Result<Url, FetchError> {
        Ok(self.origin.join(&extract::normalize_id(id))?)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, FetchError> {
        let host = url.host_str().unwrap_or_default().to_string();
        let _permit = self.limiter.acquire(&host).await?;

        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            warn!(url = %url, status = %response.status(), "Unexpected response status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        debug!("Downloaded {} bytes of HTML", html.len());

        Ok(html)
    }
}

#[async_trait]
impl ListingSource for ArantesScraper {
    async fn fetch_listing_page(&self, page: u32) -> Result<Vec<Listing>, FetchError> {
        let url = self.listing_url(page)?;
        info!(page, url = %url, "Visiting listing page");

        let html = self.fetch_html(&url).await?;
        let listings = extract::parse_listing_cards(&html, &self.origin);

        info!(page, count = listings.len(), "Extracted listing cards");
        Ok(listings)
    }

    async fn fetch_detail(&self, id: &str) -> Result<DetailFields, FetchError> {
        let url = self.detail_url(id)?;
        let html = self.fetch_html(&url).await?;
        Ok(extract::parse_detail_fields(&html))
    }

    fn source_name(&self) -> &'static str {
        "Arantes"
    }
}
