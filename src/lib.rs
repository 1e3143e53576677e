pub mod config;
pub mod models;
pub mod delay_manager;
pub mod fetcher;
pub mod parsers;
pub mod normalizer;
pub mod scraper;
pub mod exporter;
pub mod cache;
pub mod logger;

// Exporting types for convenience
pub use cache::{Cache, MemoryCache};
pub use config::{FetchConfig, League};
pub use fetcher::{FetchOutcome, Fetcher, HttpTransport, Transport, TransportError, TransportResponse};
pub use models::{CanonicalPlayer, Club, PositionCode, RawPlayerRecord, SourceTag, SourceUrls};
pub use scraper::{FootballScraper, ScrapeOptions};
