//! WebDriver backend (chromedriver, geckodriver, Selenium grid)

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};

use super::{Browser, WindowHandle};
use crate::config::ScraperConfig;
use crate::error::BrowserError;

/// Real browser session driven through a WebDriver endpoint
pub struct WebDriverBrowser {
    client: Client,
}

fn command_error(e: fantoccini::error::CmdError) -> BrowserError {
    BrowserError::Command(e.to_string())
}

/// Chrome capabilities: headless flag and user agent
fn capabilities(config: &ScraperConfig) -> Map<String, Value> {
    let mut args = vec![
        format!("--user-agent={}", config.user_agent),
        "--disable-gpu".to_string(),
        "--no-sandbox".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }

    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

impl WebDriverBrowser {
    /// Start a new session on the configured WebDriver endpoint
    pub async fn connect(config: &ScraperConfig) -> Result<Self, BrowserError> {
        tracing::info!("Connecting to WebDriver at {}", config.webdriver_url);

        let client = ClientBuilder::native()
            .capabilities(capabilities(config))
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| BrowserError::Session(e.to_string()))?;

        Ok(Self { client })
    }
}

fn to_driver_handle(handle: &WindowHandle) -> Result<fantoccini::wd::WindowHandle, BrowserError> {
    fantoccini::wd::WindowHandle::try_from(handle.as_str().to_string())
        .map_err(|_| BrowserError::NoSuchWindow(handle.to_string()))
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await.map_err(command_error)
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.client.source().await.map_err(command_error)
    }

    async fn current_window(&mut self) -> Result<WindowHandle, BrowserError> {
        let handle = self.client.window().await.map_err(command_error)?;
        Ok(WindowHandle::new(String::from(handle)))
    }

    async fn windows(&mut self) -> Result<Vec<WindowHandle>, BrowserError> {
        let handles = self.client.windows().await.map_err(command_error)?;
        Ok(handles
            .into_iter()
            .map(|h| WindowHandle::new(String::from(h)))
            .collect())
    }

    async fn open_window(&mut self, url: &str) -> Result<(), BrowserError> {
        // URL goes in as a script argument, not spliced into the source
        self.client
            .execute("window.open(arguments[0]);", vec![json!(url)])
            .await
            .map(|_| ())
            .map_err(command_error)
    }

    async fn switch_to_window(&mut self, handle: &WindowHandle) -> Result<(), BrowserError> {
        let handle = to_driver_handle(handle)?;
        self.client
            .switch_to_window(handle)
            .await
            .map_err(command_error)
    }

    async fn close_window(&mut self) -> Result<(), BrowserError> {
        self.client.close_window().await.map_err(command_error)
    }

    async fn element_present(&mut self, css: &str) -> Result<bool, BrowserError> {
        let found = self
            .client
            .find_all(Locator::Css(css))
            .await
            .map_err(command_error)?;
        Ok(!found.is_empty())
    }

    async fn title(&mut self) -> Result<String, BrowserError> {
        self.client.title().await.map_err(command_error)
    }

    async fn ready_state(&mut self) -> Result<String, BrowserError> {
        let value = self
            .client
            .execute("return document.readyState", vec![])
            .await
            .map_err(command_error)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn quit(&mut self) -> Result<(), BrowserError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(command_error)
    }
}
