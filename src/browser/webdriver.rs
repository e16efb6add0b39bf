use super::{RenderError, RenderSession, SessionFactory};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tracing::debug;
use url::Url;

/// Launches Chrome sessions through a WebDriver endpoint
pub struct WebDriverFactory {
    webdriver_url: String,
    headless: bool,
    page_load_timeout: Duration,
    user_agent: String,
}

impl WebDriverFactory {
    /// Creates a factory from the browser settings
    ///
    /// # Arguments
    ///
    /// * `config` - Browser section of the crawl configuration
    /// * `user_agent` - User-Agent the rendered requests should carry
    pub fn new(config: &BrowserConfig, user_agent: impl Into<String>) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
            user_agent: user_agent.into(),
        }
    }
}

fn launch_error(e: WebDriverError) -> RenderError {
    RenderError::Launch(e.to_string())
}

#[async_trait]
impl SessionFactory for WebDriverFactory {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_arg(&format!("--user-agent={}", self.user_agent))
            .map_err(launch_error)?;
        if self.headless {
            caps.set_headless().map_err(launch_error)?;
        }
        caps.add_chrome_arg("--disable-dev-shm-usage")
            .map_err(launch_error)?;

        let driver = WebDriver::new(self.webdriver_url.as_str(), caps)
            .await
            .map_err(launch_error)?;
        driver
            .set_page_load_timeout(self.page_load_timeout)
            .await
            .map_err(launch_error)?;

        debug!("Connected to WebDriver at {}", self.webdriver_url);

        Ok(Box::new(WebDriverSession { driver }))
    }
}

/// One WebDriver browser session
pub struct WebDriverSession {
    driver: WebDriver,
}

#[async_trait]
impl RenderSession for WebDriverSession {
    async fn render(&mut self, url: &Url) -> Result<String, RenderError> {
        self.driver
            .goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        self.driver
            .source()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.driver.quit().await {
            debug!("Error closing WebDriver session: {}", e);
        }
    }
}
