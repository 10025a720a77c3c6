//! In-memory browser backed by fixed HTML pages

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Browser, WindowHandle};
use crate::error::BrowserError;

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

#[derive(Debug)]
struct FixtureWindow {
    handle: WindowHandle,
    url: String,
}

#[derive(Debug, Default)]
struct FixtureState {
    pages: HashMap<String, String>,
    windows: Vec<FixtureWindow>,
    current: Option<WindowHandle>,
    next_id: u32,
    refuse_focus_return: bool,
    failing_closes: usize,
    fail_after_open: bool,
    ready_state: Option<Result<String, String>>,
    windows_opened: usize,
    quit: bool,
}

impl FixtureState {
    fn focused(&self) -> Result<&FixtureWindow, BrowserError> {
        let handle = self.current.as_ref().ok_or(BrowserError::NoFocusedWindow)?;
        self.windows
            .iter()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| BrowserError::NoSuchWindow(handle.to_string()))
    }

    fn focused_html(&self) -> Result<&str, BrowserError> {
        let window = self.focused()?;
        Ok(self
            .pages
            .get(&window.url)
            .map(String::as_str)
            .unwrap_or(BLANK_PAGE))
    }

    fn new_handle(&mut self) -> WindowHandle {
        let handle = WindowHandle::new(format!("fixture-{}", self.next_id));
        self.next_id += 1;
        handle
    }
}

/// Browser that serves registered HTML by URL
///
/// Clones share state, so a test can keep a clone as a probe after handing the
/// browser to a session. URLs without a registered page load a blank document
/// with no `<title>`, which is how a detail page that never loads is simulated.
#[derive(Debug, Clone, Default)]
pub struct FixtureBrowser {
    state: Arc<Mutex<FixtureState>>,
}

impl FixtureBrowser {
    /// One window, focused on `url`, serving `html`
    pub fn new(url: &str, html: &str) -> Self {
        let browser = Self::default().with_page(url, html);
        {
            let mut state = browser.lock();
            let handle = state.new_handle();
            state.windows.push(FixtureWindow {
                handle: handle.clone(),
                url: url.to_string(),
            });
            state.current = Some(handle);
        }
        browser
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.lock().pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Make switching back to the first window fail once another window exists
    pub fn refuse_focus_return(self) -> Self {
        self.lock().refuse_focus_return = true;
        self
    }

    /// Make the next `times` calls to `close_window` fail, leaving the window open
    pub fn fail_closes(self, times: usize) -> Self {
        self.lock().failing_closes = times;
        self
    }

    /// Make `open_window` report an error after the window has been created
    pub fn fail_after_open(self) -> Self {
        self.lock().fail_after_open = true;
        self
    }

    /// Report `state` as every window's `document.readyState`
    pub fn report_ready_state(self, state: &str) -> Self {
        self.lock().ready_state = Some(Ok(state.to_string()));
        self
    }

    /// Make reading `document.readyState` fail
    pub fn fail_ready_state(self) -> Self {
        self.lock().ready_state = Some(Err("javascript error".to_string()));
        self
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open_window_count(&self) -> usize {
        self.lock().windows.len()
    }

    /// Windows opened since construction, closed or not
    pub fn windows_opened(&self) -> usize {
        self.lock().windows_opened
    }

    pub fn focused_window(&self) -> Option<WindowHandle> {
        self.lock().current.clone()
    }

    pub fn first_window(&self) -> Option<WindowHandle> {
        self.lock().windows.first().map(|w| w.handle.clone())
    }

    pub fn has_quit(&self) -> bool {
        self.lock().quit
    }
}

fn page_has(html: &str, css: &str) -> Result<bool, BrowserError> {
    let selector =
        Selector::parse(css).map_err(|e| BrowserError::InvalidSelector(e.to_string()))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

fn page_title(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&Selector::parse("title").expect("static selector"))
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let handle = state.current.clone().ok_or(BrowserError::NoFocusedWindow)?;
        let window = state
            .windows
            .iter_mut()
            .find(|w| w.handle == handle)
            .ok_or_else(|| BrowserError::NoSuchWindow(handle.to_string()))?;
        window.url = url.to_string();
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        let state = self.lock();
        state.focused_html().map(str::to_string)
    }

    async fn current_window(&mut self) -> Result<WindowHandle, BrowserError> {
        let state = self.lock();
        state.focused().map(|w| w.handle.clone())
    }

    async fn windows(&mut self) -> Result<Vec<WindowHandle>, BrowserError> {
        let state = self.lock();
        Ok(state.windows.iter().map(|w| w.handle.clone()).collect())
    }

    async fn open_window(&mut self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        if state.quit {
            return Err(BrowserError::Session("session has ended".to_string()));
        }
        let handle = state.new_handle();
        state.windows.push(FixtureWindow {
            handle,
            url: url.to_string(),
        });
        state.windows_opened += 1;
        if state.fail_after_open {
            return Err(BrowserError::Command("script timeout".to_string()));
        }
        Ok(())
    }

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let is_first = state.windows.first().map(|w| &w.handle) == Some(handle);
        if state.refuse_focus_return && is_first && state.windows_opened > 0 {
            return Err(BrowserError::Command(format!(
                "cannot switch to window {}",
                handle
            )));
        }
        if !state.windows.iter().any(|w| &w.handle == handle) {
            return Err(BrowserError::NoSuchWindow(handle.to_string()));
        }
        state.current = Some(handle.clone());
        Ok(())
    }

    async fn close_window(&mut self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        if state.failing_closes > 0 {
            state.failing_closes -= 1;
            return Err(BrowserError::Command("close window failed".to_string()));
        }
        let handle = state.current.take().ok_or(BrowserError::NoFocusedWindow)?;
        state.windows.retain(|w| w.handle != handle);
        Ok(())
    }

    async fn element_present(&mut self, css: &str) -> Result<bool, BrowserError> {
        let html = self.lock().focused_html()?.to_string();
        page_has(&html, css)
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        let html = self.lock().focused_html()?.to_string();
        Ok(page_title(&html))
    }

    async fn ready_state(&mut self) -> Result<String, BrowserError> {
        let state = self.lock();
        state.focused()?;
        match &state.ready_state {
            None => Ok("complete".to_string()),
            Some(Ok(ready)) => Ok(ready.clone()),
            Some(Err(e)) => Err(BrowserError::Command(e.clone())),
        }
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.windows.clear();
        state.current = None;
        state.quit = true;
        Ok(())
    }
}
