pub mod controller;
pub mod extractor;
pub mod fetcher;
pub mod loader;
pub mod manifest;
pub mod page;
pub mod render;
pub mod sanitizer;
pub mod signature;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod throttle;

pub use controller::{AggregatedEntry, AggregationController, DateGroup, TagView, ViewStats};
pub use fetcher::{PageFetcher, SiteFetcher};
pub use loader::{LoadPhase, TagLoader};
pub use page::initialize_tag_page;
pub use throttle::RequestThrottle;
