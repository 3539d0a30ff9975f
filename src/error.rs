use thiserror::Error;

/// Everything that can go wrong while producing samples for one family.
///
/// None of these are retried here. A run that hits any of them still
/// completes, reports `ok = false` and publishes a degraded up-signal.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The initial listing call failed; no workers were started.
    #[error("listing for family '{family}' failed: {source}")]
    ListingFetch {
        family: String,
        #[source]
        source: Box<CollectError>,
    },

    /// One work item's upstream call failed; sibling items continue.
    #[error("item '{item}' failed: {source}")]
    ItemFetch {
        item: String,
        #[source]
        source: Box<CollectError>,
    },

    /// Response body did not match the expected shape.
    #[error("unexpected response body from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure from the HTTP client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {status} for {path}")]
    Status { path: String, status: u16 },

    /// A paginated listing still reported more pages after the configured cap.
    #[error("pagination of {path} exceeded {max_pages} pages")]
    PageLimit { path: String, max_pages: usize },

    /// Upstream failure reported by a non-HTTP collaborator.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("config error: {0}")]
    Config(String),
}

impl CollectError {
    /// Wrap an error raised by a family's listing call.
    pub fn listing(family: impl Into<String>, source: CollectError) -> Self {
        Self::ListingFetch {
            family: family.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while processing a single work item.
    pub fn item(item: impl Into<String>, source: CollectError) -> Self {
        Self::ItemFetch {
            item: item.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectError>;
