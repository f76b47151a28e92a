use crate::error::GeoError;
use crate::geolocation::retry::retry_linear;
use crate::geolocation::{format_destination, format_origin, GeolocationProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    distance: Option<Distance>,
}

#[derive(Debug, Deserialize)]
struct Distance {
    value: i64,
}

impl DistanceMatrixResponse {
    fn first_distance(&self) -> Option<i64> {
        self.rows
            .first()?
            .elements
            .first()?
            .distance
            .as_ref()
            .map(|d| d.value)
    }
}

/// Google Distance Matrix client
pub struct GoogleMapsClient {
    api_key: String,
    client: Client,
    endpoint: String,
    backoff: Duration,
}

impl GoogleMapsClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key: api_key.to_string(),
            client,
            endpoint: DISTANCE_MATRIX_URL.to_string(),
            backoff: RETRY_BACKOFF,
        })
    }

    /// Point the client at another distance-matrix endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn request_url(&self, origin: &str, destination: &str) -> Result<Url, GeoError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("origins", origin)
            .append_pair("destinations", destination)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn request_once(&self, url: &Url) -> Result<i64, GeoError> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() != StatusCode::OK {
            return Err(GeoError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let matrix: DistanceMatrixResponse = serde_json::from_slice(&body)?;
        matrix.first_distance().ok_or(GeoError::NoRoute)
    }
}

#[async_trait]
impl GeolocationProvider for GoogleMapsClient {
    async fn distance_to(
        &self,
        origin: &[&str],
        dest_lat: f64,
        dest_lng: f64,
        cancel: &CancellationToken,
    ) -> Result<i64, GeoError> {
        let origin = format_origin(origin);
        let url = self.request_url(&origin, &format_destination(dest_lat, dest_lng))?;

        let distance =
            retry_linear(MAX_ATTEMPTS, self.backoff, cancel, |_| self.request_once(&url)).await?;

        debug!(origin = %origin, distance, "Calculated distance");
        Ok(distance)
    }
}
