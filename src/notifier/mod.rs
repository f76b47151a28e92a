pub mod discord;

use crate::error::NotifyError;
use crate::models::Property;
use async_trait::async_trait;
use tracing::info;

pub use discord::DiscordNotifier;

/// Announces newly discovered listings
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_property(&self, property: &Property) -> Result<(), NotifyError>;
}

/// Fallback notifier that only writes new listings to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_new_property(&self, property: &Property) -> Result<(), NotifyError> {
        info!(
            id = %property.id,
            price = %property.price,
            distance_meters = property.distance_meters,
            "🏠 New property: {}, {}, {}",
            property.street,
            property.neighborhood,
            property.city
        );
        Ok(())
    }
}
