//! Error types for request execution and run configuration

use thiserror::Error;

/// Why a single request attempt produced no usable response.
///
/// None of these leave the worker loop: each one is folded into
/// [`Stats::num_errs`](crate::model::Stats::num_errs) and the next
/// iteration starts.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The request could not be constructed (bad URL, method or body)
    #[error("failed to build request: {0}")]
    Build(String),

    /// Connection refused, DNS, TLS or client-level timeout
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// No response headers arrived within the per-request timeout
    #[error("no response headers within {0:?}")]
    Timeout(std::time::Duration),

    /// The client produced no response object at all
    #[error("empty response: {0}")]
    EmptyResponse(String),
}

/// Problems detected before any worker starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid target url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to read request body: {0}")]
    Body(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
