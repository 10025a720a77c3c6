//! Entry-list scraper: session lifecycle and the extraction pipeline

use scraper::Html;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::assemble::assemble;
use super::metadata::{format_race_date, MetadataParser};
use super::navigation::NavigationCoordinator;
use super::rows::{resolve_handlers, RowExtractor};
use super::venue::venue_code;
use crate::browser::{wait_for_element, Browser, BrowserSession, Deadline, WaitError};
use crate::config::ScraperConfig;
use crate::error::{BrowserError, ExtractionError, Issue};
use crate::models::EntryTable;

/// Inputs of one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Opaque race key used by the entry-list page
    pub race_id: String,
    /// Venue name as shown to users (e.g. 東京)
    pub venue: String,
    /// yyyymmdd
    pub date: String,
}

/// A request whose venue and date have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub race_id: String,
    pub venue: String,
    pub venue_code: &'static str,
    /// yyyy-mm-dd
    pub date: String,
}

impl ExtractionRequest {
    pub fn new(race_id: impl Into<String>, venue: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            race_id: race_id.into(),
            venue: venue.into(),
            date: date.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedRequest, ExtractionError> {
        let venue_code = venue_code(&self.venue).ok_or_else(|| {
            ExtractionError::Precondition(format!("unknown venue {:?}", self.venue))
        })?;
        let date = format_race_date(&self.date)?;

        let expected_prefix = format!("{}{}", &self.date[..4], venue_code);
        if !self.race_id.starts_with(&expected_prefix) {
            tracing::warn!(
                "Race id {} does not start with {} (year + venue code)",
                self.race_id,
                expected_prefix
            );
        }

        Ok(ValidatedRequest {
            race_id: self.race_id.clone(),
            venue: self.venue.trim().to_string(),
            venue_code,
            date,
        })
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub table: EntryTable,
    /// Non-fatal problems, ordered by row
    pub issues: Vec<Issue>,
}

/// Extracts one race's entry table from a browser session
pub struct EntryScraper {
    config: ScraperConfig,
    timeout: Duration,
    poll_interval: Duration,
}

impl EntryScraper {
    pub fn new(config: ScraperConfig) -> Self {
        let timeout = config.timeout();
        let poll_interval = config.poll_interval();
        Self {
            config,
            timeout,
            poll_interval,
        }
    }

    /// Override the wait bound with sub-second precision
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Build URL for the entry-list page
    pub fn build_url(&self, race_id: &str) -> String {
        format!("{}?race_id={}", self.config.entry_url, race_id)
    }

    /// Full run: load the entry list, extract, and release the session.
    ///
    /// The browser is released on every exit path, including fatal errors and
    /// cancellation.
    pub async fn scrape<B: Browser>(
        &self,
        browser: B,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<Extraction, ExtractionError> {
        let mut session = BrowserSession::new(browser);

        // On cancellation the extraction future is dropped mid-lookup; `release`
        // quits the browser, which also closes any detail window left open.
        let result = tokio::select! {
            result = self.load_and_extract(&mut session, request, cancel) => result,
            _ = cancel.cancelled() => Err(ExtractionError::Cancelled),
        };

        if let Err(e) = session.release().await {
            tracing::warn!("Failed to release browser session: {}", e);
        }

        match &result {
            Ok(extraction) => tracing::info!(
                "Extracted {} entries for race {} ({} issues)",
                extraction.table.len(),
                request.race_id,
                extraction.issues.len()
            ),
            Err(e) => tracing::error!(
                "Extraction of race {} failed ({}): {}",
                request.race_id,
                e.kind(),
                e
            ),
        }

        result
    }

    async fn load_and_extract<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<Extraction, ExtractionError> {
        request.validate()?;

        let url = self.build_url(&request.race_id);
        tracing::info!("Loading entry list: {}", url);

        match tokio::time::timeout(self.timeout, session.browser().goto(&url)).await {
            Ok(loaded) => loaded?,
            Err(_) => {
                return Err(BrowserError::Command(format!("page load timed out: {}", url)).into())
            }
        }

        let deadline = Deadline::after(self.timeout, cancel);
        match wait_for_element(session.browser(), "tr.HorseList", &deadline, self.poll_interval)
            .await
        {
            Ok(()) => {}
            Err(WaitError::TimedOut) => {
                return Err(ExtractionError::Structural(
                    "entry table did not appear".to_string(),
                ))
            }
            Err(WaitError::Cancelled) => return Err(ExtractionError::Cancelled),
            Err(WaitError::Browser(e)) => return Err(e.into()),
        }

        self.extract(session, request, cancel).await
    }

    /// Extract from a session whose focused window already shows the entry list
    pub async fn extract<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
    ) -> Result<Extraction, ExtractionError> {
        let request = request.validate()?;

        let main = session.browser().current_window().await?;
        session.set_main_window(main);

        let html = session.browser().page_source().await?;
        let mut issues = Vec::new();

        let (metadata, mut rows) = {
            let document = Html::parse_document(&html);
            let metadata = MetadataParser::new().extract(
                &document,
                &request.race_id,
                &request.venue,
                &request.date,
            )?;
            let rows = RowExtractor::new()?.extract(&document, &mut issues)?;
            (metadata, rows)
        };

        if self.config.resolve_handlers {
            let coordinator =
                NavigationCoordinator::new(self.timeout, self.poll_interval, cancel.clone());
            resolve_handlers(session, &coordinator, &mut rows, &mut issues).await?;
        }

        issues.sort_by_key(Issue::row);
        let table = assemble(rows.into_iter().map(|row| row.record), &metadata);

        Ok(Extraction { table, issues })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{FixtureBrowser, TabFocus};
    use crate::error::ErrorKind;
    use crate::scraper::test_pages::{
        header_html, horse_name, jockey_page, jockey_url, PageBuilder, MAIN_URL, RACE_ID,
    };

    fn config() -> ScraperConfig {
        ScraperConfig {
            entry_url: "https://race.test/race/shutuba.html".to_string(),
            ..Default::default()
        }
    }

    fn scraper() -> EntryScraper {
        EntryScraper::new(config())
            .with_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest::new(RACE_ID, "東京", "20241020")
    }

    /// Entry list plus a detail page for every row except `missing`
    fn browser_with_handlers(html: &str, rows: usize, missing: &[usize]) -> FixtureBrowser {
        let mut browser = FixtureBrowser::new("about:blank", "").with_page(MAIN_URL, html);
        for n in 1..=rows {
            if !missing.contains(&n) {
                browser = browser.with_page(&jockey_url(n), &jockey_page(&format!("騎手 {}", n)));
            }
        }
        browser
    }

    #[test]
    fn test_build_url() {
        let scraper = EntryScraper::new(ScraperConfig::default());
        assert_eq!(
            scraper.build_url("202405040811"),
            "https://race.netkeiba.com/race/shutuba.html?race_id=202405040811"
        );
    }

    #[test]
    fn test_validate_request() {
        let validated = request().validate().unwrap();
        assert_eq!(validated.venue_code, "05");
        assert_eq!(validated.date, "2024-10-20");

        let unknown = ExtractionRequest::new(RACE_ID, "Longchamp", "20241020");
        assert_eq!(unknown.validate().unwrap_err().kind(), ErrorKind::Precondition);

        let short = ExtractionRequest::new(RACE_ID, "東京", "2024102");
        assert_eq!(short.validate().unwrap_err().kind(), ErrorKind::Precondition);
    }

    #[tokio::test]
    async fn test_ten_rows_one_scratched() {
        let html = PageBuilder::new().rows(10).blank_name(4).build();
        let browser = browser_with_handlers(&html, 10, &[]);
        let probe = browser.clone();

        let extraction = scraper()
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap();
        let table = &extraction.table;

        assert_eq!(table.len(), 9);
        let names: Vec<String> = table.iter().map(|r| r.name().to_string()).collect();
        let expected: Vec<String> = (1..=10).filter(|&n| n != 5).map(horse_name).collect();
        assert_eq!(names, expected);

        let first = table.get(0).unwrap().race().clone();
        assert_eq!(first.race_class, "３歳オープン");
        assert_eq!(first.date, "2024-10-20");
        assert!(table.iter().all(|row| row.race() == &first));

        assert_eq!(table.get(0).unwrap().competitor().handler.as_deref(), Some("騎手 1"));
        assert!(extraction.issues.is_empty(), "{:?}", extraction.issues);
        assert!(probe.has_quit());
    }

    #[tokio::test]
    async fn test_handler_timeout_keeps_full_table() {
        let html = PageBuilder::new().rows(6).build();
        let browser = browser_with_handlers(&html, 6, &[4]);
        let probe = browser.clone();
        let main = probe.first_window().unwrap();
        let mut session = BrowserSession::new(browser);
        session.browser().goto(MAIN_URL).await.unwrap();

        let extraction = scraper()
            .extract(&mut session, &request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(extraction.table.len(), 6);
        let handlers: Vec<Option<String>> = extraction
            .table
            .iter()
            .map(|r| r.competitor().handler.clone())
            .collect();
        for (i, handler) in handlers.iter().enumerate() {
            if i == 3 {
                assert_eq!(handler, &None);
            } else {
                assert_eq!(handler.as_deref(), Some(format!("騎手 {}", i + 1).as_str()));
            }
        }
        assert_eq!(
            extraction.issues,
            vec![Issue::NavigationTimeout {
                row: 3,
                link: jockey_url(4)
            }]
        );

        assert_eq!(session.focus(), TabFocus::MainFocused);
        assert_eq!(probe.open_window_count(), 1);
        assert_eq!(probe.focused_window(), Some(main));
        assert_eq!(probe.windows_opened(), 6);
    }

    #[tokio::test]
    async fn test_structural_error_releases_session() {
        let header = header_html().replace("RaceData02", "RaceDataXX");
        let html = PageBuilder::new().rows(3).header(header).build();
        let browser = browser_with_handlers(&html, 3, &[]);
        let probe = browser.clone();

        let err = scraper()
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(probe.has_quit());
        // Metadata is read before any handler page is opened
        assert_eq!(probe.windows_opened(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_table_is_structural() {
        let browser = FixtureBrowser::new("about:blank", "")
            .with_page(MAIN_URL, &format!("<html><body>{}</body></html>", header_html()));
        let probe = browser.clone();

        let err = scraper()
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(probe.has_quit());
    }

    #[tokio::test]
    async fn test_precondition_error_releases_session() {
        let html = PageBuilder::new().rows(2).build();
        let browser = browser_with_handlers(&html, 2, &[]);
        let probe = browser.clone();
        let bad = ExtractionRequest::new(RACE_ID, "東京", "2024-1020");

        let err = scraper()
            .scrape(browser, &bad, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(probe.has_quit());
    }

    #[tokio::test]
    async fn test_focus_failure_aborts_run() {
        let html = PageBuilder::new().rows(3).build();
        let browser = browser_with_handlers(&html, 3, &[]).refuse_focus_return();
        let probe = browser.clone();

        let err = scraper()
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NavigationFocus);
        assert!(probe.has_quit());
        assert_eq!(probe.windows_opened(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_releases_session() {
        let html = PageBuilder::new().rows(3).build();
        let browser = browser_with_handlers(&html, 3, &[]);
        let probe = browser.clone();
        let token = CancellationToken::new();
        token.cancel();

        let err = scraper().scrape(browser, &request(), &token).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(probe.has_quit());
    }

    #[tokio::test]
    async fn test_handler_resolution_can_be_disabled() {
        let html = PageBuilder::new().rows(4).build();
        let browser = browser_with_handlers(&html, 4, &[]);
        let probe = browser.clone();
        let scraper = EntryScraper::new(ScraperConfig {
            resolve_handlers: false,
            ..config()
        })
        .with_timeout(Duration::from_millis(50));

        let extraction = scraper
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(extraction.table.len(), 4);
        assert!(extraction
            .table
            .iter()
            .all(|row| row.competitor().handler.is_none()));
        assert!(extraction.issues.is_empty());
        assert_eq!(probe.windows_opened(), 0);
    }

    #[tokio::test]
    async fn test_issues_are_ordered_by_row() {
        let html = PageBuilder::new()
            .rows(4)
            .replace_in_row(0, "牡3", "?")
            .build();
        let browser = browser_with_handlers(&html, 4, &[1, 3]);

        let extraction = scraper()
            .scrape(browser, &request(), &CancellationToken::new())
            .await
            .unwrap();
        let rows: Vec<usize> = extraction.issues.iter().map(Issue::row).collect();
        assert_eq!(rows, vec![0, 0, 2]);
        assert_eq!(extraction.issues[0].kind(), ErrorKind::FieldParse);
        assert_eq!(extraction.issues[1].kind(), ErrorKind::NavigationTimeout);
    }
}
