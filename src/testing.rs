//! Test doubles for the pipeline's collaborators.
//!
//! Each mock records its calls so tests can assert on what the pipeline did.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, GeoError, NotifyError};
use crate::geolocation::GeolocationProvider;
use crate::models::{Property, RawPayload};
use crate::notifier::Notifier;
use crate::pipeline::RunContext;
use crate::scrapers::{DetailFields, Listing, ListingSource};

/// A listing card with a complete address and a price
pub fn listing(id: &str) -> Listing {
    let raw = format!(r#"{{"id":"{}","preco":"1500,00"}}"#, id.trim_start_matches("/detalhes/"));
    let mut property = Property {
        id: id.to_string(),
        price: "1500,00".to_string(),
        street: "Rua Major Claudiano".to_string(),
        neighborhood: "Centro".to_string(),
        city: "Franca".to_string(),
        bedrooms: "2".to_string(),
        ..Default::default()
    };
    property.derive_total_price();

    Listing {
        property,
        raw: RawPayload(raw),
    }
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_server(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A listings site backed by fixed pages
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<u32, Vec<Listing>>,
    failing_pages: HashSet<u32>,
    details: HashMap<String, DetailFields>,
    cancel_on: Option<(u32, RunContext)>,
    visited: Mutex<Vec<u32>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, listings: Vec<Listing>) -> Self {
        self.pages.insert(page, listings);
        self
    }

    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing_pages.insert(page);
        self
    }

    pub fn with_detail(mut self, id: &str, fields: DetailFields) -> Self {
        self.details.insert(id.to_string(), fields);
        self
    }

    /// Cancel `ctx` while `page` is being fetched
    pub fn cancel_on(mut self, page: u32, ctx: RunContext) -> Self {
        self.cancel_on = Some((page, ctx));
        self
    }

    /// Pages requested so far, in order
    pub fn visited(&self) -> Vec<u32> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for MockSource {
    async fn fetch_listing_page(&self, page: u32) -> Result<Vec<Listing>, FetchError> {
        self.visited.lock().unwrap().push(page);

        if let Some((cancel_page, ctx)) = &self.cancel_on {
            if *cancel_page == page {
                ctx.cancel();
            }
        }

        if self.failing_pages.contains(&page) {
            return Err(FetchError::Status {
                url: format!("mock://listings?page={page}"),
                status: 503,
            });
        }
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }

    async fn fetch_detail(&self, id: &str) -> Result<DetailFields, FetchError> {
        self.details.get(id).cloned().ok_or_else(|| FetchError::Status {
            url: format!("mock://{id}"),
            status: 404,
        })
    }

    fn source_name(&self) -> &'static str {
        "Mock"
    }
}

/// Geolocation provider returning a settable distance
pub struct MockGeolocation {
    distance: AtomicI64,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockGeolocation {
    pub fn new(distance: i64) -> Self {
        Self {
            distance: AtomicI64::new(distance),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_distance(&self, distance: i64) {
        self.distance.store(distance, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeolocationProvider for MockGeolocation {
    async fn distance_to(
        &self,
        _origin: &[&str],
        _dest_lat: f64,
        _dest_lng: f64,
        _cancel: &CancellationToken,
    ) -> Result<i64, GeoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(GeoError::RetriesExhausted {
                attempts: 3,
                source: Box::new(GeoError::Status(500)),
            });
        }
        Ok(self.distance.load(Ordering::SeqCst))
    }
}

/// Notifier that remembers what it was asked to announce
#[derive(Default)]
pub struct MockNotifier {
    fail: bool,
    attempts: AtomicUsize,
    notified: Mutex<Vec<Property>>,
}

impl MockNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Successfully delivered notifications
    pub fn notified(&self) -> Vec<Property> {
        self.notified.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_new_property(&self, property: &Property) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 403,
                body: "Missing Access".to_string(),
            });
        }
        self.notified.lock().unwrap().push(property.clone());
        Ok(())
    }
}
