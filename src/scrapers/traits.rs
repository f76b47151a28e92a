use crate::error::FetchError;
use crate::scrapers::extract::{DetailFields, Listing};
use async_trait::async_trait;

/// A paginated listings site.
///
/// The pipeline only talks to the site through this trait, so another
/// real-estate source can be crawled by adding an implementation.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one 1-based results page and extract its listing cards
    async fn fetch_listing_page(&self, page: u32) -> Result<Vec<Listing>, FetchError>;

    /// Fetch the detail page for a listing id
    async fn fetch_detail(&self, id: &str) -> Result<DetailFields, FetchError>;

    /// Get the name of the listing source
    fn source_name(&self) -> &'static str;
}
