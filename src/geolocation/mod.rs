pub mod google;
pub mod retry;

use crate::error::GeoError;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use google::GoogleMapsClient;

/// Computes travel distance from a listing's address to a fixed destination
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Distance in meters from `origin` (street, neighborhood, city) to the coordinate
    async fn distance_to(
        &self,
        origin: &[&str],
        dest_lat: f64,
        dest_lng: f64,
        cancel: &CancellationToken,
    ) -> Result<i64, GeoError>;
}

/// Origin string sent to the distance service: address parts joined by commas
pub fn format_origin(parts: &[&str]) -> String {
    parts.join(",")
}

/// Destination string, 7 decimal places per coordinate
pub fn format_destination(lat: f64, lng: f64) -> String {
    format!("{lat:.7},{lng:.7}")
}
