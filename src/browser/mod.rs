//! Browser session seam
//!
//! The extraction engine never talks to a driver directly. It goes through the
//! [`Browser`] trait, wrapped in a [`BrowserSession`] that also carries the tab
//! focus state for the run.
//!
//! Backends:
//! - [`WebDriverBrowser`]: a real browser over WebDriver (`webdriver` feature)
//! - [`FixtureBrowser`]: in-memory pages, for tests and offline runs

mod fixture;
mod wait;
#[cfg(feature = "webdriver")]
mod webdriver;

pub use fixture::FixtureBrowser;
pub use wait::{wait_for_element, Deadline, WaitError};
#[cfg(feature = "webdriver")]
pub use webdriver::WebDriverBrowser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BrowserError;

/// Opaque identifier of a browsing context (tab/window)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal browser surface the extraction engine needs
#[async_trait]
pub trait Browser: Send {
    /// Navigate the focused window
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError>;

    /// HTML of the focused window
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    async fn current_window(&mut self) -> Result<WindowHandle, BrowserError>;

    async fn windows(&mut self) -> Result<Vec<WindowHandle>, BrowserError>;

    /// Open `url` in a new window without moving focus to it
    async fn open_window(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> Result<(), BrowserError>;

    /// Close the focused window; afterwards no window is focused
    async fn close_window(&mut self) -> Result<(), BrowserError>;

    /// Whether the focused window has an element matching `css`
    async fn element_present(&mut self, css: &str) -> Result<bool, BrowserError>;

    async fn title(&mut self) -> Result<String, BrowserError>;

    /// `document.readyState` of the focused window
    async fn ready_state(&mut self) -> Result<String, BrowserError>;

    /// End the browser session and release all of its windows
    async fn quit(&mut self) -> Result<(), BrowserError>;
}

/// Which browsing context currently has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TabFocus {
    MainFocused,
    DetailOpening,
    DetailFocused,
}

/// One browser session, owned by a single extraction run
///
/// Focus state lives here rather than in the browser so every component that
/// touches the session sees the same state. Only the navigation coordinator
/// changes it.
pub struct BrowserSession<B: Browser> {
    browser: B,
    main_window: Option<WindowHandle>,
    focus: TabFocus,
    released: bool,
}

impl<B: Browser> BrowserSession<B> {
    pub fn new(browser: B) -> Self {
        Self {
            browser,
            main_window: None,
            focus: TabFocus::MainFocused,
            released: false,
        }
    }

    pub fn focus(&self) -> TabFocus {
        self.focus
    }

    pub(crate) fn set_focus(&mut self, focus: TabFocus) {
        tracing::debug!(from = ?self.focus, to = ?focus, "tab focus");
        self.focus = focus;
    }

    pub fn main_window(&self) -> Option<&WindowHandle> {
        self.main_window.as_ref()
    }

    pub(crate) fn set_main_window(&mut self, handle: WindowHandle) {
        self.main_window = Some(handle);
    }

    pub fn browser(&mut self) -> &mut B {
        &mut self.browser
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// End the browser session. Safe to call more than once.
    pub async fn release(&mut self) -> Result<(), BrowserError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        tracing::debug!("releasing browser session");
        self.browser.quit().await
    }

    pub fn into_inner(self) -> B {
        self.browser
    }
}
