use crate::url::{classify_priority, extract_domain};
use crate::UrlError;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Frontier tier of a task
///
/// Dequeue order is strict: every HIGH task goes before any MEDIUM task, every
/// MEDIUM task before any LOW task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// All tiers in dequeue order
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Index of the tier's queue inside the frontier
    pub fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL waiting in (or taken from) the frontier
///
/// Everything but `retry_count` is fixed at creation.
#[derive(Debug, Clone)]
pub struct UrlTask {
    /// Normalized absolute URL
    pub url: Url,

    /// Lowercase host, the rate-limiting key
    pub domain: String,

    /// Tier assigned from the URL at creation
    pub priority: Priority,

    /// Link distance from the seed (seeds are depth 0)
    pub depth: u32,

    /// When the task was first created
    pub enqueued_at: DateTime<Utc>,

    /// Scheduling-level requeues so far
    pub retry_count: u32,
}

impl UrlTask {
    /// Creates a task for a normalized URL at the given depth
    pub fn new(url: Url, depth: u32) -> Result<Self, UrlError> {
        let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
        let priority = classify_priority(&url);

        Ok(Self {
            url,
            domain,
            priority,
            depth,
            enqueued_at: Utc::now(),
            retry_count: 0,
        })
    }

    /// Creates a task for a link found on this task's page
    pub fn child(&self, url: Url) -> Result<Self, UrlError> {
        Self::new(url, self.depth + 1)
    }

    /// Returns the task with its retry count incremented, ready to requeue
    pub fn into_retry(mut self) -> Self {
        self.retry_count += 1;
        self
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}
