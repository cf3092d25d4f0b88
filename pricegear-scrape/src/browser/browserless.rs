//! Renderer backed by a Browserless-compatible rendering service.
//!
//! Pages are rendered with `POST {endpoint}/content`, which navigates a
//! fresh browser page, waits as instructed and returns the serialised DOM.
//! Every context owns its own HTTP client and cookie jar.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

use super::{RenderContext, Renderer};
use crate::adapter::RenderOptions;
use crate::error::{Result, ScrapeError};
use crate::http::random_user_agent;

/// Added to a context's navigation budget for the HTTP round trip.
const TRANSPORT_MARGIN: Duration = Duration::from_secs(5);

/// Scrolls the page to the bottom once it has loaded.
const SCROLL_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight);";

/// Renderer talking to a Browserless endpoint.
pub struct BrowserlessRenderer {
    endpoint: Url,
    token: Option<String>,
    user_agent: Option<String>,
    status_client: reqwest::Client,
}

impl BrowserlessRenderer {
    /// Create a renderer for `endpoint`, e.g. `http://localhost:3000`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] for an invalid endpoint URL, or
    /// [`ScrapeError::Http`] if the status client cannot be built.
    pub fn new(endpoint: &str, token: Option<&str>) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim().trim_end_matches('/'))
            .map_err(|e| ScrapeError::Config(format!("invalid browser endpoint {endpoint:?}: {e}")))?;
        let status_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ScrapeError::Http(format!("failed to build status client: {e}")))?;
        Ok(Self {
            endpoint,
            token: token.map(str::to_string).filter(|t| !t.is_empty()),
            user_agent: None,
            status_client,
        })
    }

    /// Fix the User-Agent; `None` rotates per context.
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// The configured endpoint, without credentials.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.endpoint.as_str().trim_end_matches('/');
        match &self.token {
            Some(token) => format!("{base}{path}?token={}", urlencoding::encode(token)),
            None => format!("{base}{path}"),
        }
    }

    /// The `/content` URL for a context; masking runs the page in stealth mode.
    fn content_url(&self, options: &RenderOptions) -> String {
        let url = self.api_url("/content");
        if !options.mask_automation {
            return url;
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}stealth=true")
    }
}

#[async_trait]
impl Renderer for BrowserlessRenderer {
    async fn new_context(&self, options: &RenderOptions) -> Result<Box<dyn RenderContext>> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(options.navigation_timeout + options.settle + TRANSPORT_MARGIN)
            .build()
            .map_err(|e| ScrapeError::Render(format!("failed to build context client: {e}")))?;
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| random_user_agent().to_string());

        Ok(Box::new(BrowserlessContext {
            client,
            content_url: self.content_url(options),
            options: options.clone(),
            user_agent,
            html: None,
        }))
    }

    async fn is_alive(&self) -> bool {
        match self.status_client.get(self.api_url("/json/version")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "browser endpoint status check failed");
                false
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        // Pages are closed by the service after every /content call.
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GotoOptions<'a> {
    wait_until: &'a str,
    timeout: u64,
}

#[derive(Serialize)]
struct ScriptTag<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    goto_options: GotoOptions<'a>,
    wait_for_timeout: u64,
    user_agent: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    add_script_tag: Vec<ScriptTag<'a>>,
}

struct BrowserlessContext {
    client: reqwest::Client,
    content_url: String,
    options: RenderOptions,
    user_agent: String,
    html: Option<String>,
}

#[async_trait]
impl RenderContext for BrowserlessContext {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let mut add_script_tag = Vec::new();
        if self.options.scroll_to_bottom {
            add_script_tag.push(ScriptTag {
                content: SCROLL_SCRIPT,
            });
        }
        let body = ContentRequest {
            url,
            goto_options: GotoOptions {
                wait_until: self.options.wait_until.as_event(),
                timeout: self.options.navigation_timeout.as_millis() as u64,
            },
            wait_for_timeout: self.options.settle.as_millis() as u64,
            user_agent: &self.user_agent,
            add_script_tag,
        };

        let response = self
            .client
            .post(&self.content_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrapeError::Render(format!("render request for {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Render(format!(
                "render service returned {status} for {url}: {}",
                message.trim()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Render(format!("reading rendered {url} failed: {e}")))?;
        self.html = Some(html);
        Ok(())
    }

    async fn html(&self) -> Result<String> {
        self.html
            .clone()
            .ok_or_else(|| ScrapeError::Render("no page has been navigated".into()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::WaitUntil;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options() -> RenderOptions {
        RenderOptions {
            navigation_timeout: Duration::from_secs(12),
            wait_until: WaitUntil::DomContentLoaded,
            settle: Duration::from_millis(1500),
            scroll_to_bottom: true,
            mask_automation: false,
        }
    }

    #[tokio::test]
    async fn navigate_posts_content_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "s3cret"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://shop.test/search/ssd",
                "gotoOptions": { "waitUntil": "domcontentloaded", "timeout": 12000 },
                "waitForTimeout": 1500,
                "userAgent": "TestBot/1.0",
                "addScriptTag": [{ "content": SCROLL_SCRIPT }],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rendered</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(&server.uri(), Some("s3cret"))
            .expect("renderer")
            .with_user_agent(Some("TestBot/1.0".into()));
        let mut context = renderer.new_context(&options()).await.expect("context");
        context.navigate("https://shop.test/search/ssd").await.expect("navigate");
        assert_eq!(context.html().await.expect("html"), "<html>rendered</html>");
        context.close().await.expect("close");
    }

    #[tokio::test]
    async fn service_error_is_render_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(&server.uri(), None).expect("renderer");
        let mut context = renderer.new_context(&options()).await.expect("context");
        let err = context.navigate("https://shop.test/").await.unwrap_err();
        assert!(matches!(err, ScrapeError::Render(_)));
        assert!(err.to_string().contains("429"));
        assert!(context.html().await.is_err());
    }

    #[tokio::test]
    async fn status_reports_liveness() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(&server.uri(), None).expect("renderer");
        assert!(renderer.is_alive().await);

        let dead = BrowserlessRenderer::new("http://127.0.0.1:1", None).expect("renderer");
        assert!(!dead.is_alive().await);
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let err = BrowserlessRenderer::new("not a url", None).err().expect("error");
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[tokio::test]
    async fn masked_context_requests_stealth_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "s3cret"))
            .and(query_param("stealth", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>masked</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(&server.uri(), Some("s3cret")).expect("renderer");
        let masked = RenderOptions {
            mask_automation: true,
            ..options()
        };
        let mut context = renderer.new_context(&masked).await.expect("context");
        context.navigate("https://shop.test/").await.expect("navigate");
        assert_eq!(context.html().await.expect("html"), "<html>masked</html>");
    }

    #[test]
    fn content_url_adds_stealth_only_when_masking() {
        let renderer = BrowserlessRenderer::new("http://render.local:3000", None).expect("ok");
        assert_eq!(renderer.content_url(&options()), "http://render.local:3000/content");
        let masked = RenderOptions {
            mask_automation: true,
            ..options()
        };
        assert_eq!(
            renderer.content_url(&masked),
            "http://render.local:3000/content?stealth=true"
        );
    }

    #[test]
    fn api_url_appends_token() {
        let renderer = BrowserlessRenderer::new("http://render.local:3000/", Some("a b")).expect("ok");
        assert_eq!(
            renderer.api_url("/content"),
            "http://render.local:3000/content?token=a%20b"
        );
    }
}
