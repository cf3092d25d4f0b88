//! Shared HTTP client and the fetch-path page loader.
//!
//! One [`reqwest::Client`] is built per runner and shared by every
//! fetch-based adapter. It keeps no cookie store, so nothing a storefront
//! sets survives into the next query. The User-Agent is chosen per request
//! from a rotation of realistic desktop browsers unless overridden.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::adapter::PageLoader;
use crate::error::{Result, ScrapeError};

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Build the shared storefront client.
///
/// `timeout` is a transport-level backstop; the runner enforces the
/// per-adapter budget independently.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the client cannot be constructed.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ScrapeError::Http(format!("failed to build HTTP client: {e}")))
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // USER_AGENTS is a non-empty const array.
        .unwrap_or(USER_AGENTS[0])
}

/// Loads pages with a single GET on the shared client.
pub struct HttpLoader {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpLoader {
    /// Create a loader; `user_agent` of `None` picks one from the rotation.
    pub fn new(client: reqwest::Client, user_agent: Option<&str>) -> Self {
        let user_agent = user_agent.unwrap_or_else(|| random_user_agent()).to_string();
        Self { client, user_agent }
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn load(&mut self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ScrapeError::Http(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| ScrapeError::Http(format!("{url}: {e}")))?;

        response
            .text()
            .await
            .map_err(|e| ScrapeError::Http(format!("reading {url} failed: {e}")))
    }
}
