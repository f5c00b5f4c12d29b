pub mod auth_api;
pub mod lockbox_api;
pub mod payloads;

use crate::models::SectionKind;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a single endpoint produced no usable payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("unexpected payload: {0}")]
    Parse(String),

    #[error("not signed in or session expired")]
    Auth,
}

impl FetchError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// A GET endpoint the dashboard polls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub kind: SectionKind,
    pub path: String,
    /// Sent with the stored bearer token
    pub protected: bool,
}

impl Endpoint {
    pub fn new(kind: SectionKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            protected: false,
        }
    }

    pub fn protected(kind: SectionKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            protected: true,
        }
    }
}

/// The settled outcome of one endpoint in one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointResult {
    pub endpoint: Endpoint,
    pub outcome: Result<Value, FetchError>,
}

impl EndpointResult {
    pub fn ok(endpoint: Endpoint, payload: Value) -> Self {
        Self {
            endpoint,
            outcome: Ok(payload),
        }
    }

    pub fn failed(endpoint: Endpoint, error: FetchError) -> Self {
        Self {
            endpoint,
            outcome: Err(error),
        }
    }
}

/// Anything that can settle a batch of endpoint requests.
///
/// Implementations must resolve every endpoint, success or typed failure,
/// and never short-circuit on the first error.
pub trait Fetch: Send + Sync + 'static {
    fn fetch_all(&self, endpoints: &[Endpoint])
        -> impl Future<Output = Vec<EndpointResult>> + Send;
}

impl<T: Fetch> Fetch for Arc<T> {
    fn fetch_all(
        &self,
        endpoints: &[Endpoint],
    ) -> impl Future<Output = Vec<EndpointResult>> + Send {
        (**self).fetch_all(endpoints)
    }
}
