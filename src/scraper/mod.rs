//! Entry-list scraper for netkeiba race cards
//!
//! Reads the competitor table (出馬表) and race header of one race, resolves
//! each handler's display name from the handler's detail page, and returns a
//! flat [`EntryTable`](crate::models::EntryTable).
//!
//! # Example
//!
//! ```no_run
//! use shutuba::browser::WebDriverBrowser;
//! use shutuba::config::ScraperConfig;
//! use shutuba::scraper::{EntryScraper, ExtractionRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ScraperConfig::default();
//!     let browser = WebDriverBrowser::connect(&config).await?;
//!     let scraper = EntryScraper::new(config);
//!
//!     let request = ExtractionRequest::new("202405040811", "東京", "20241020");
//!     let extraction = scraper
//!         .scrape(browser, &request, &CancellationToken::new())
//!         .await?;
//!     println!("Found {} entries", extraction.table.len());
//!
//!     Ok(())
//! }
//! ```

mod assemble;
mod client;
pub mod fields;
mod metadata;
pub mod navigation;
mod rows;
mod venue;

#[cfg(test)]
pub(crate) mod test_pages;

pub use assemble::assemble;
pub use client::{EntryScraper, Extraction, ExtractionRequest, ValidatedRequest};
pub use metadata::{format_race_date, CourseInfo, MetadataParser};
pub use navigation::{
    handler_name_from_title, HandlerLookup, NavigationCoordinator, Restored, TITLE_SUFFIX,
};
pub use rows::{resolve_handlers, PendingRow, RowExtractor};
pub use venue::{venue_code, venue_code_or_unknown, venues, UNKNOWN_VENUE};

use scraper::{ElementRef, Selector};

use crate::error::ExtractionError;

/// Text content of an element with whitespace runs collapsed
pub(crate) fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css)
        .map_err(|e| ExtractionError::Structural(format!("invalid selector {:?}: {:?}", css, e)))
}
