//! Browser rendering module for Product-Scout
//!
//! This module provides the rendering path of the hybrid fetcher: a bounded pool
//! of reusable browser sessions, and a WebDriver-backed session implementation.
//!
//! The pool is generic over [`SessionFactory`], so any backend able to load a
//! URL and hand back the rendered DOM can be plugged in.

mod pool;
mod webdriver;

pub use pool::{BrowserLease, BrowserPool};
pub use webdriver::{WebDriverFactory, WebDriverSession};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by browser sessions and the pool
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch browser session: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Render timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rendered page is incomplete ({0} bytes)")]
    Incomplete(usize),

    #[error("Browser pool is shut down")]
    PoolClosed,
}

impl RenderError {
    /// Returns true if another attempt may succeed
    ///
    /// Only a closed pool is final; crashes, navigation errors and timeouts are
    /// handled by replacing the session and trying again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::PoolClosed)
    }
}

/// A live browser session able to render pages
///
/// A session is owned by exactly one lease at a time and is never shared.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates to the URL and returns the rendered DOM as HTML
    async fn render(&mut self, url: &Url) -> Result<String, RenderError>;

    /// Shuts the session down
    async fn close(self: Box<Self>);
}

/// Creates new browser sessions for the pool
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError>;
}
