//! Ingestion pipeline: pagination, dedup, enrichment, persistence, notification.
//!
//! Pages are visited one after another. Listings on a page are handled with
//! bounded parallelism; each listing goes through a single
//! check-existence / enrich / upsert / notify sequence under a per-id lock.

pub mod context;
pub mod locks;

use crate::error::{ProcessError, RunError};
use crate::geolocation::GeolocationProvider;
use crate::models::{Property, RawPayload};
use crate::notifier::Notifier;
use crate::scrapers::{Listing, ListingSource};
use crate::storage::Storage;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub use context::RunContext;
use locks::IdLocks;

const DEFAULT_WORKERS: usize = 2;

/// What happened to a listing that was processed successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First sighting: enriched, stored and announced
    Inserted,
    /// Seen before: fields refreshed, distance carried over
    Updated,
}

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub pages_failed: u32,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl RunSummary {
    fn record(&mut self, page: u32, result: Result<(RecordOutcome, String), (ProcessError, String)>) {
        match result {
            Ok((RecordOutcome::Inserted, _)) => self.inserted += 1,
            Ok((RecordOutcome::Updated, _)) => self.updated += 1,
            Err((ProcessError::Cancelled, id)) => {
                info!(page, id = %id, "Listing abandoned, run is stopping");
                self.cancelled += 1;
            }
            Err((ProcessError::MissingId, _)) => {
                warn!(page, "Skipping listing without id");
                self.failed += 1;
            }
            Err((e, id)) => {
                error!(page, id = %id, error = %e, "Error processing property");
                self.failed += 1;
            }
        }
    }
}

/// Dedup-and-upsert pipeline over the storage, notifier and geolocation collaborators
pub struct Pipeline {
    storage: Arc<dyn Storage>,
    notifier: Arc<dyn Notifier>,
    geolocation: Option<Arc<dyn GeolocationProvider>>,
    destination: (f64, f64),
    workers: usize,
    id_locks: IdLocks,
}

impl Pipeline {
    pub fn new(storage: Arc<dyn Storage>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            notifier,
            geolocation: None,
            destination: (0.0, 0.0),
            workers: DEFAULT_WORKERS,
            id_locks: IdLocks::default(),
        }
    }

    /// Enrich new listings with the distance to `(lat, lng)`
    pub fn with_geolocation(
        mut self,
        provider: Arc<dyn GeolocationProvider>,
        lat: f64,
        lng: f64,
    ) -> Self {
        self.geolocation = Some(provider);
        self.destination = (lat, lng);
        self
    }

    /// Listings handled concurrently within a page
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Decide new vs existing for one listing and carry it through.
    ///
    /// New listings get a distance (when a provider is configured), are stored
    /// and announced. Existing listings keep their stored distance and are
    /// stored again without a notification. An enrichment failure leaves a
    /// new listing unstored so the next run tries again.
    pub async fn process_record(
        &self,
        mut property: Property,
        raw: &RawPayload,
        ctx: &RunContext,
    ) -> Result<RecordOutcome, ProcessError> {
        if property.id.is_empty() {
            return Err(ProcessError::MissingId);
        }

        let _guard = self.id_locks.lock(&property.id).await;

        let exists = self
            .storage
            .exists(&property.id)
            .await
            .map_err(ProcessError::Exists)?;

        if exists {
            let stored = self
                .storage
                .get(&property.id)
                .await
                .map_err(ProcessError::Lookup)?;
            property.distance_meters = stored.distance_meters;
        } else if let Some(provider) = &self.geolocation {
            let (lat, lng) = self.destination;
            let distance = provider
                .distance_to(&property.origin_parts(), lat, lng, ctx.token())
                .await?;
            property.distance_meters = distance;
        }

        self.storage
            .upsert(&property, raw)
            .await
            .map_err(ProcessError::Persist)?;

        if exists {
            debug!(id = %property.id, "Updated existing property");
            return Ok(RecordOutcome::Updated);
        }

        info!(id = %property.id, distance_meters = property.distance_meters, "Stored new property");
        if let Err(e) = self.notifier.notify_new_property(&property).await {
            // Already committed, only the announcement is lost
            error!(id = %property.id, error = %e, "Error notifying about new property");
        }

        Ok(RecordOutcome::Inserted)
    }

    /// Merge the detail page into a card's record, then process it
    async fn handle_listing(
        &self,
        source: &dyn ListingSource,
        ctx: &RunContext,
        listing: Listing,
    ) -> Result<(RecordOutcome, String), (ProcessError, String)> {
        let Listing { mut property, raw } = listing;

        if !property.id.is_empty() {
            match source.fetch_detail(&property.id).await {
                Ok(fields) if fields.is_empty() => {
                    debug!(id = %property.id, "Detail page had no known fields");
                }
                Ok(fields) => fields.merge_into(&mut property),
                Err(e) => {
                    warn!(id = %property.id, error = %e, "Detail page unavailable, keeping card fields");
                }
            }
        }

        let id = property.id.clone();
        match self.process_record(property, &raw, ctx).await {
            Ok(outcome) => Ok((outcome, id)),
            Err(e) => Err((e, id)),
        }
    }

    /// Crawl pages `1..=max_pages` from `source`.
    ///
    /// Page and listing failures are logged and skipped. Returns `Err` when
    /// `ctx` was cancelled or timed out at any point; work already committed stays.
    pub async fn crawl(
        &self,
        source: &dyn ListingSource,
        ctx: &RunContext,
        max_pages: u32,
    ) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        info!(source = source.source_name(), max_pages, "Starting crawl");

        for page in 1..=max_pages {
            if let Err(reason) = ctx.check() {
                info!(page, ?summary, "Stopping crawl: {}", reason);
                return Err(reason);
            }

            let listings = match source.fetch_listing_page(page).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!(page, error = %e, "Failed to visit page");
                    summary.pages_failed += 1;
                    continue;
                }
            };
            summary.pages_visited += 1;

            if listings.is_empty() {
                info!(page, "No listings on page");
                continue;
            }

            let results: Vec<_> = stream::iter(listings)
                .map(|listing| self.handle_listing(source, ctx, listing))
                .buffer_unordered(self.workers)
                .collect()
                .await;

            for result in results {
                summary.record(page, result);
            }
            info!(page, ?summary, "Page processed");
        }

        // A stop during the last page still counts as a stop
        if let Err(reason) = ctx.check() {
            info!(?summary, "Crawl interrupted: {}", reason);
            return Err(reason);
        }

        info!(?summary, "Crawl finished");
        Ok(summary)
    }
}
