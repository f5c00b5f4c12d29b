use crate::api::auth_api::TokenStore;
use crate::api::{Endpoint, EndpointResult, Fetch, FetchError};
use crate::config::ClientConfig;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client for the LockBox picks backend
#[derive(Debug, Clone)]
pub struct LockboxApiClient {
    pub(crate) base_url: String,
    pub(crate) client: reqwest::Client,
    pub(crate) timeout: Duration,
    pub(crate) tokens: Option<Arc<TokenStore>>,
}

impl LockboxApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .user_agent(concat!("lockbox_sync/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            timeout,
            tokens: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone(), config.request_timeout)
    }

    /// Attach the session store used for protected endpoints
    pub fn with_tokens(mut self, tokens: Arc<TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET one path and parse the body as JSON
    pub async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        self.send_json(self.client.get(self.url(path))).await
    }

    /// GET one endpoint, attaching the bearer token when it is protected
    pub async fn fetch_endpoint(&self, endpoint: &Endpoint) -> Result<Value, FetchError> {
        if !endpoint.protected {
            return self.get_json(&endpoint.path).await;
        }

        let token = self
            .tokens
            .as_ref()
            .and_then(|store| store.token())
            .ok_or(FetchError::Auth)?;

        let request = self.client.get(self.url(&endpoint.path)).bearer_auth(token);
        match self.send_json(request).await {
            Err(FetchError::Http {
                status: status @ (401 | 403),
            }) => {
                warn!(path = %endpoint.path, status, "session rejected, clearing stored credentials");
                if let Some(store) = &self.tokens {
                    if let Err(e) = store.clear() {
                        warn!(error = %e, "failed to clear stored credentials");
                    }
                }
                Err(FetchError::Auth)
            }
            other => other,
        }
    }

    /// Send a request and read a JSON body, bounded by the client timeout.
    /// Dropping the returned future aborts the request.
    pub(crate) async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, FetchError> {
        let timeout = self.timeout;
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Http {
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::from_reqwest(e, timeout))?;
            serde_json::from_slice::<Value>(&body).map_err(|e| FetchError::Parse(e.to_string()))
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
    }
}

impl Fetch for LockboxApiClient {
    /// Every endpoint runs concurrently and settles on its own
    async fn fetch_all(&self, endpoints: &[Endpoint]) -> Vec<EndpointResult> {
        let requests = endpoints.iter().map(|endpoint| async move {
            let outcome = self.fetch_endpoint(endpoint).await;
            match &outcome {
                Ok(_) => debug!(path = %endpoint.path, "endpoint fetched"),
                Err(e) => warn!(path = %endpoint.path, error = %e, "endpoint failed"),
            }
            EndpointResult {
                endpoint: endpoint.clone(),
                outcome,
            }
        });

        join_all(requests).await
    }
}
