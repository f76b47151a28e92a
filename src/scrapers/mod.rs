pub mod arantes;
pub mod extract;
pub mod limiter;
pub mod traits;
pub mod types;

pub use arantes::ArantesScraper;
pub use extract::{DetailFields, Listing};
pub use traits::ListingSource;
