//! Handler detail-page side trip
//!
//! The full handler name only appears in the title of the handler's detail
//! page. Each lookup opens that page in a second window, reads the title and
//! returns focus to the entry list:
//!
//! `MainFocused -> DetailOpening -> DetailFocused -> MainFocused`
//!
//! The detail window is closed and focus restored on every path out of a
//! lookup, including timeouts and cancellation. Only a failure to restore focus,
//! or a detail window that will not close, is fatal.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::browser::{
    wait_for_element, Browser, BrowserSession, Deadline, TabFocus, WaitError, WindowHandle,
};
use crate::error::ExtractionError;

/// Close attempts per detail window before the lookup gives up
const CLOSE_ATTEMPTS: usize = 2;

/// Title suffix of a handler's recent-results page
pub const TITLE_SUFFIX: &str = "の近走成績";

/// Outcome of one handler lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerLookup {
    Resolved(String),
    /// Title did not carry the suffix; the whole title is used
    SuffixMissing(String),
    TimedOut,
}

impl HandlerLookup {
    pub fn name(&self) -> Option<&str> {
        match self {
            HandlerLookup::Resolved(name) | HandlerLookup::SuffixMissing(name) => Some(name),
            HandlerLookup::TimedOut => None,
        }
    }
}

/// Cleanup outcome, reported alongside the lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored {
    /// Main window reported `complete` before the deadline
    pub main_ready: bool,
}

/// Cut a detail-page title at the suffix marker.
///
/// Returns the name and whether the marker was found. Without the marker the
/// trimmed title is returned as is.
pub fn handler_name_from_title(title: &str) -> (String, bool) {
    match title.find(TITLE_SUFFIX) {
        Some(idx) => (title[..idx].trim().to_string(), true),
        None => (title.trim().to_string(), false),
    }
}

/// Drives the detail-page side trip on a session
pub struct NavigationCoordinator {
    timeout: Duration,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl NavigationCoordinator {
    pub fn new(timeout: Duration, poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            poll_interval,
            cancel,
        }
    }

    /// Resolve the handler name behind `link`.
    ///
    /// Timeouts and unreadable detail pages come back as
    /// [`HandlerLookup::TimedOut`]. Errors are fatal: focus could not be
    /// restored, the run was cancelled, or the driver failed on the main window.
    pub async fn resolve_handler<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        link: &str,
    ) -> Result<(HandlerLookup, Restored), ExtractionError> {
        if session.focus() != TabFocus::MainFocused {
            return Err(ExtractionError::NavigationFocus(format!(
                "lookup started from {:?}",
                session.focus()
            )));
        }
        if self.cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        // Remember the entry-list window and every window open before the trip
        let original = session.browser().current_window().await?;
        session.set_main_window(original.clone());
        let known = session.browser().windows().await?;

        session.set_focus(TabFocus::DetailOpening);
        let detail = match self.open_detail(session, &known, link).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Could not open handler page {}: {}", link, e);
                None
            }
        };

        let lookup = match &detail {
            Some(handle) => self.read_title(session, handle).await,
            None => Ok(HandlerLookup::TimedOut),
        };

        let restored = self.restore(session, &known, &original).await?;

        let lookup = match lookup {
            Ok(lookup) => lookup,
            Err(WaitError::Cancelled) => return Err(ExtractionError::Cancelled),
            Err(WaitError::TimedOut) => HandlerLookup::TimedOut,
            Err(WaitError::Browser(e)) => {
                tracing::warn!("Handler page {} unreadable: {}", link, e);
                HandlerLookup::TimedOut
            }
        };

        Ok((lookup, restored))
    }

    /// Open the detail page and find the window that was not there before
    async fn open_detail<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        known: &[WindowHandle],
        link: &str,
    ) -> Result<Option<WindowHandle>, ExtractionError> {
        let browser = session.browser();
        browser.open_window(link).await?;
        let handle = browser
            .windows()
            .await?
            .into_iter()
            .find(|h| !known.contains(h));
        Ok(handle)
    }

    /// Focus the detail window and wait for its title
    async fn read_title<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        detail: &WindowHandle,
    ) -> Result<HandlerLookup, WaitError> {
        session.browser().switch_to_window(detail).await?;
        session.set_focus(TabFocus::DetailFocused);

        let deadline = Deadline::after(self.timeout, &self.cancel);
        wait_for_element(session.browser(), "title", &deadline, self.poll_interval).await?;

        let title = session.browser().title().await?;
        let (name, found) = handler_name_from_title(&title);
        if found {
            Ok(HandlerLookup::Resolved(name))
        } else {
            Ok(HandlerLookup::SuffixMissing(name))
        }
    }

    /// Close every window opened since `known` was taken.
    ///
    /// A window that survives all attempts makes later lookups ambiguous, so
    /// it is a focus error.
    async fn close_new_windows<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        known: &[WindowHandle],
    ) -> Result<(), ExtractionError> {
        for attempt in 0..=CLOSE_ATTEMPTS {
            let stray: Vec<WindowHandle> = session
                .browser()
                .windows()
                .await
                .map_err(|e| ExtractionError::NavigationFocus(e.to_string()))?
                .into_iter()
                .filter(|h| !known.contains(h))
                .collect();
            if stray.is_empty() {
                return Ok(());
            }
            if attempt == CLOSE_ATTEMPTS {
                return Err(ExtractionError::NavigationFocus(format!(
                    "handler window {} could not be closed",
                    stray[0]
                )));
            }

            for handle in &stray {
                let browser = session.browser();
                let closed = match browser.switch_to_window(handle).await {
                    Ok(()) => browser.close_window().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = closed {
                    tracing::warn!(
                        "Failed to close handler window {} (attempt {}): {}",
                        handle,
                        attempt + 1,
                        e
                    );
                }
            }
        }
        Ok(())
    }

    /// Close the detail window (if any) and put focus back on the main window
    async fn restore<B: Browser>(
        &self,
        session: &mut BrowserSession<B>,
        known: &[WindowHandle],
        original: &WindowHandle,
    ) -> Result<Restored, ExtractionError> {
        self.close_new_windows(session, known).await?;

        session
            .browser()
            .switch_to_window(original)
            .await
            .map_err(|e| ExtractionError::NavigationFocus(e.to_string()))?;
        session.set_focus(TabFocus::MainFocused);

        // Load-state wait uses a fresh token so cleanup still completes after
        // the run is cancelled
        let deadline = Deadline::after(self.timeout, &CancellationToken::new());
        let main_ready = loop {
            match session.browser().ready_state().await {
                Ok(state) if state == "complete" => break true,
                Ok(_) => {}
                Err(e) => {
                    return Err(ExtractionError::NavigationFocus(format!(
                        "main window unreadable after return: {}",
                        e
                    )))
                }
            }
            if deadline.pause(self.poll_interval).await.is_err() {
                break false;
            }
        };

        Ok(Restored { main_ready })
    }
}
