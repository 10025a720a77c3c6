//! Shutuba - race-card entry extraction
//!
//! This library provides:
//! - A browser seam with a WebDriver backend and an in-memory fixture backend
//! - Competitor row parsing for the netkeiba entry list (出馬表)
//! - Handler name resolution through short-lived detail windows
//! - Race metadata parsing and a flat, column-ordered output table
//!
//! # Example
//!
//! ```no_run
//! use shutuba::browser::FixtureBrowser;
//! use shutuba::config::ScraperConfig;
//! use shutuba::scraper::{EntryScraper, ExtractionRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(html: &str) -> Result<(), shutuba::error::ExtractionError> {
//! let config = ScraperConfig {
//!     resolve_handlers: false,
//!     ..Default::default()
//! };
//! let scraper = EntryScraper::new(config);
//! let request = ExtractionRequest::new("202405040811", "東京", "20241020");
//! let browser = FixtureBrowser::new(&scraper.build_url(&request.race_id), html);
//!
//! let extraction = scraper
//!     .scrape(browser, &request, &CancellationToken::new())
//!     .await?;
//! println!("{}", extraction.table.to_json_pretty().unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod error;
pub mod models;
pub mod scraper;

// Re-export commonly used types
pub use browser::{Browser, BrowserSession, FixtureBrowser, TabFocus};
pub use config::ScraperConfig;
pub use error::{ErrorKind, ExtractionError, Issue};
pub use models::{CompetitorRecord, EntryRow, EntryTable, RaceMetadata, COLUMNS};
pub use scraper::{EntryScraper, Extraction, ExtractionRequest};
