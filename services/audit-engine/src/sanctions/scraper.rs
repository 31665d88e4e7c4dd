use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ScraperConfig;
use crate::outcome::Outcome;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("Browser session could not be started: {0}")]
    Session(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { seconds: u64, what: String },

    #[error("Text extraction failed: {0}")]
    Extraction(String),
}

/// Source of exclusive browser sessions.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

/// One automated browser window. Never shared between scrapes.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Block until at least one element matches `selector`, up to `timeout`.
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Visible text of every element matching `selector`, in document order.
    async fn element_texts(&mut self, selector: &str) -> Result<Vec<String>, ScrapeError>;

    async fn close(&mut self) -> Result<(), ScrapeError>;
}

/// Deduplicated, ascending set of country names read from the sanctions map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanctionedCountrySet(BTreeSet<String>);

impl SanctionedCountrySet {
    /// Trim every token and drop the ones left empty.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, country: &str) -> bool {
        self.0.contains(country)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub target_url: String,
    pub element_selector: String,
    pub wait_timeout: Duration,
    pub page_load_timeout: Duration,
}

impl From<&ScraperConfig> for ScrapeSettings {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            target_url: config.target_url.clone(),
            element_selector: config.element_selector.clone(),
            wait_timeout: Duration::from_secs(config.wait_timeout_secs),
            page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
        }
    }
}

pub struct SanctionsScraper {
    browser: Arc<dyn Browser>,
    settings: ScrapeSettings,
}

impl SanctionsScraper {
    pub fn new(browser: Arc<dyn Browser>, settings: ScrapeSettings) -> Self {
        Self { browser, settings }
    }

    /// Scrape the sanctioned-country names.
    ///
    /// Any failure while opening the session, navigating, waiting or reading
    /// text yields an empty set marked as degraded. The session is closed on
    /// every path once it has been opened.
    pub async fn scrape(&self) -> Outcome<SanctionedCountrySet> {
        let mut session = match self.browser.open_session().await {
            Ok(session) => session,
            Err(e) => return Outcome::degraded(SanctionedCountrySet::default(), e.to_string()),
        };

        let collected = self.collect(session.as_mut()).await;
        // A failed teardown does not invalidate text already read.
        let _ = session.close().await;

        Outcome::from_result(collected.map(SanctionedCountrySet::from_tokens))
    }

    async fn collect(&self, session: &mut dyn BrowserSession) -> Result<Vec<String>, ScrapeError> {
        let url = &self.settings.target_url;
        let page_load = self.settings.page_load_timeout;

        tokio::time::timeout(page_load, session.navigate(url))
            .await
            .map_err(|_| ScrapeError::Timeout {
                seconds: page_load.as_secs(),
                what: format!("page load of {}", url),
            })??;

        session
            .wait_for(&self.settings.element_selector, self.settings.wait_timeout)
            .await?;

        session.element_texts(&self.settings.element_selector).await
    }
}

// ===== WebDriver backend =====

/// Opens Chrome sessions through a WebDriver endpoint (chromedriver, selenium).
pub struct WebDriverBrowser {
    webdriver_url: String,
    headless: bool,
    browser_args: Vec<String>,
}

impl WebDriverBrowser {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            browser_args: config.browser_args.clone(),
        }
    }

    fn capabilities(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut args = self.browser_args.clone();
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        caps
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());

        let client = builder
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        Ok(Box::new(WebDriverSession {
            client: Some(client),
        }))
    }
}

struct WebDriverSession {
    client: Option<Client>,
}

impl WebDriverSession {
    fn client(&self) -> Result<&Client, ScrapeError> {
        self.client
            .as_ref()
            .ok_or_else(|| ScrapeError::Session("session already closed".to_string()))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.client()?
            .goto(url)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.client()?
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
            .map(|_| ())
            .map_err(|e| wait_error(e, selector, timeout))
    }

    async fn element_texts(&mut self, selector: &str) -> Result<Vec<String>, ScrapeError> {
        let elements = self
            .client()?
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| ScrapeError::Extraction(e.to_string()))?;

        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            let text = element
                .text()
                .await
                .map_err(|e| ScrapeError::Extraction(e.to_string()))?;
            texts.push(text);
        }

        Ok(texts)
    }

    async fn close(&mut self) -> Result<(), ScrapeError> {
        match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| ScrapeError::Session(e.to_string())),
            None => Ok(()),
        }
    }
}

// Only an expired wait is a timeout.
fn wait_error(err: CmdError, selector: &str, timeout: Duration) -> ScrapeError {
    match err {
        CmdError::WaitTimeout => ScrapeError::Timeout {
            seconds: timeout.as_secs(),
            what: format!("elements matching '{}'", selector),
        },
        CmdError::Lost(e) => ScrapeError::Session(e.to_string()),
        other => ScrapeError::Extraction(other.to_string()),
    }
}
