//! License Server HTTP Client using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Outcome of a single request attempt.
enum Attempt {
    /// Final response, successful or not.
    Done(HttpResponse),
    /// Transient failure worth another attempt.
    Retry(BridgeError),
}

/// Reqwest-based [`HttpClient`] for license delivery.
///
/// Server errors (5xx) and throttling (429) are retried according to the
/// client's [`RetryPolicy`]; every other status is handed back to the caller.
pub struct ReqwestHttpClient {
    client: Client,
    policy: RetryPolicy,
}

impl ReqwestHttpClient {
    /// Client with a 30 second overall request timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(2)
            .user_agent(concat!("cenc-decrypt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used by [`HttpClient::execute`].
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(Self::method(request.method), &request.url);

        // reqwest computes Content-Length from the body itself
        for (name, value) in request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-length"))
        {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    fn is_retryable(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    fn transport_error(e: &reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("License server timed out".to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Cannot reach license server: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Attempt> {
        let response = match self.build_request(request).send().await {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(Self::transport_error(&e))),
        };

        let status = response.status();
        if Self::is_retryable(status) {
            return Ok(Attempt::Retry(BridgeError::Http {
                status: status.as_u16(),
            }));
        }

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Cannot read response: {}", e)))?;

        Ok(Attempt::Done(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        }))
    }

    async fn send(&self, request: HttpRequest, policy: &RetryPolicy) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(attempt, attempts, "Sending license request");

            match self.attempt(&request).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry(e) => {
                    warn!(error = %e, attempt, "License request attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                let delay = policy.delay_for(attempt);
                debug!(delay_ms = delay.as_millis() as u64, "Backing off");
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            BridgeError::OperationFailed("No license request attempt was made".to_string())
        }))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send(request, &self.policy).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.send(request, &policy).await
    }
}
