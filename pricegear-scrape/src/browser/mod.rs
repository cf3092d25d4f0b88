//! Browser session shared by the render-based adapters.
//!
//! A [`Renderer`] is the browser engine; each render-based adapter
//! invocation gets its own [`RenderContext`] so cookies and navigation
//! state never cross adapters. [`BrowserSession`] owns the renderer and
//! bounds the number of simultaneously open contexts. Contexts are handed
//! out as [`ContextLease`]s which give the slot back on every exit path.

pub mod browserless;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::adapter::{PageLoader, RenderOptions};
use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};

pub use browserless::BrowserlessRenderer;

/// A browser engine that can create isolated rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a fresh context configured for one adapter invocation.
    async fn new_context(&self, options: &RenderOptions) -> Result<Box<dyn RenderContext>>;

    /// Whether the engine currently answers.
    async fn is_alive(&self) -> bool;

    /// Release engine-level resources.
    async fn shutdown(&self) -> Result<()>;

    /// `false` for a stand-in that can never render.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// One isolated browser context (cookie jar plus page).
#[async_trait]
pub trait RenderContext: Send {
    /// Navigate to `url` and wait according to the context's options.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Serialised DOM of the current page.
    async fn html(&self) -> Result<String>;

    /// Close the context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Renderer used when no rendering endpoint is configured.
///
/// Context creation always fails, so render-based adapters come back empty
/// while fetch-based adapters keep working.
pub struct DisabledRenderer;

#[async_trait]
impl Renderer for DisabledRenderer {
    async fn new_context(&self, _options: &RenderOptions) -> Result<Box<dyn RenderContext>> {
        Err(ScrapeError::Render(
            "browser rendering is disabled: no endpoint configured".into(),
        ))
    }

    async fn is_alive(&self) -> bool {
        false
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Health of the browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The renderer answers.
    Alive,
    /// A renderer is configured but does not answer, or the session is shut down.
    Unreachable,
    /// No renderer is configured.
    Disabled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alive => "alive",
            Self::Unreachable => "unreachable",
            Self::Disabled => "disabled",
        })
    }
}

/// Process-wide browser session.
///
/// Shared as `Arc<BrowserSession>` by every query; at most `max_contexts`
/// contexts are open at any time across all of them. Unlike the fetch
/// worker pool, slots are not per query: concurrent queries queue for the
/// same slots, and that wait is charged to each render adapter's
/// `render_timeout`. [`ScrapeConfig::validate`](crate::ScrapeConfig::validate)
/// requires enough slots for one query's render sources.
pub struct BrowserSession {
    renderer: Arc<dyn Renderer>,
    slots: Arc<Semaphore>,
    max_contexts: usize,
}

impl BrowserSession {
    /// Wrap a renderer, allowing `max_contexts` concurrent contexts (at least one).
    pub fn new(renderer: Arc<dyn Renderer>, max_contexts: usize) -> Self {
        let max_contexts = max_contexts.max(1);
        Self {
            renderer,
            slots: Arc::new(Semaphore::new(max_contexts)),
            max_contexts,
        }
    }

    /// A session whose render path always fails closed.
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledRenderer), 1)
    }

    /// Build the session described by `config`.
    ///
    /// No endpoint means a [`DisabledRenderer`].
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if the endpoint is not a valid URL.
    pub fn from_config(config: &BrowserConfig, user_agent: Option<&str>) -> Result<Self> {
        match config.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => {
                let renderer = BrowserlessRenderer::new(endpoint, config.token.as_deref())?
                    .with_user_agent(user_agent.map(str::to_string));
                tracing::info!(
                    endpoint = %renderer.endpoint(),
                    max_contexts = config.max_contexts,
                    "browser session configured"
                );
                Ok(Self::new(Arc::new(renderer), config.max_contexts))
            }
            _ => {
                tracing::info!("no browser endpoint configured, render-based sources disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Wait for a free slot and open a context configured with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Render`] if the session is shut down or the
    /// renderer cannot create a context.
    pub async fn acquire(&self, options: &RenderOptions) -> Result<ContextLease> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| ScrapeError::Render("browser session is shut down".into()))?;
        let context = self.renderer.new_context(options).await?;
        tracing::trace!(open = self.open_contexts(), "browser context opened");
        Ok(ContextLease {
            context: Some(context),
            permit: Some(permit),
        })
    }

    /// Number of contexts currently leased.
    pub fn open_contexts(&self) -> usize {
        if self.slots.is_closed() {
            return 0;
        }
        self.max_contexts
            .saturating_sub(self.slots.available_permits())
    }

    /// Configured context bound.
    pub fn max_contexts(&self) -> usize {
        self.max_contexts
    }

    /// Current health.
    pub async fn status(&self) -> SessionStatus {
        if !self.renderer.is_enabled() {
            SessionStatus::Disabled
        } else if !self.slots.is_closed() && self.renderer.is_alive().await {
            SessionStatus::Alive
        } else {
            SessionStatus::Unreachable
        }
    }

    /// Whether the session can currently render.
    pub async fn is_alive(&self) -> bool {
        self.status().await == SessionStatus::Alive
    }

    /// Refuse new leases and shut the renderer down.
    ///
    /// Leases already handed out stay usable until released.
    pub async fn shutdown(&self) {
        self.slots.close();
        if let Err(e) = self.renderer.shutdown().await {
            tracing::warn!(error = %e, "browser shutdown failed");
        }
    }
}

/// A leased context plus its session slot.
///
/// [`ContextLease::release`] closes the context and frees the slot. If the
/// lease is dropped instead (the adapter timed out, panicked or was
/// aborted) the close runs in the background and the slot is freed once
/// it finishes.
pub struct ContextLease {
    context: Option<Box<dyn RenderContext>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl ContextLease {
    /// Close the context and give the slot back.
    pub async fn release(mut self) {
        if let Some(context) = self.context.take() {
            if let Err(e) = context.close().await {
                tracing::debug!(error = %e, "browser context close failed");
            }
        }
        self.permit.take();
    }
}

#[async_trait]
impl PageLoader for ContextLease {
    async fn load(&mut self, url: &str) -> Result<String> {
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| ScrapeError::Render("browser context already released".into()))?;
        context.navigate(url).await?;
        context.html().await
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        let permit = self.permit.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = context.close().await {
                        tracing::debug!(error = %e, "background context close failed");
                    }
                    drop(permit);
                });
            }
            Err(_) => {
                tracing::debug!("no runtime to close abandoned browser context");
            }
        }
    }
}
