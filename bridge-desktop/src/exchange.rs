//! License Exchange over HTTP
//!
//! Delivers license challenges with an [`HttpClient`] on a tokio runtime.
//! Each submitted request runs as its own task; the response is handed to the
//! caller's [`ExchangeCallback`] from that task.

use bridge_traits::{
    error::{BridgeError, Result},
    exchange::{Exchange, ExchangeCallback, ExchangeFactory},
    http::{HttpClient, HttpRequest},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// [`ExchangeFactory`] backed by an [`HttpClient`] and a tokio runtime handle.
#[derive(Clone)]
pub struct HttpExchangeFactory {
    client: Arc<dyn HttpClient>,
    runtime: Handle,
}

impl HttpExchangeFactory {
    pub fn new(client: Arc<dyn HttpClient>, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    /// Use the runtime the caller is currently running on.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotAvailable`] when called outside a tokio runtime.
    pub fn from_current(client: Arc<dyn HttpClient>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            BridgeError::NotAvailable(format!("No tokio runtime for license exchange: {}", e))
        })?;
        Ok(Self::new(client, runtime))
    }
}

impl ExchangeFactory for HttpExchangeFactory {
    fn create(&self, url: &str) -> Result<Box<dyn Exchange>> {
        if url.is_empty() {
            return Err(BridgeError::OperationFailed(
                "License URL is empty".to_string(),
            ));
        }

        Ok(Box::new(HttpExchange {
            url: url.to_string(),
            client: Arc::clone(&self.client),
            runtime: self.runtime.clone(),
        }))
    }
}

struct HttpExchange {
    url: String,
    client: Arc<dyn HttpClient>,
    runtime: Handle,
}

impl Exchange for HttpExchange {
    fn submit(
        &self,
        request: HttpRequest,
        callback: Arc<dyn ExchangeCallback>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let mut request = request;
        request.url = self.url.clone();
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let client = Arc::clone(&self.client);
        debug!(bytes = request.content_length(), "Submitting license request");

        self.runtime.spawn(async move {
            let response = client.execute(request).await;
            if let Err(e) = &response {
                warn!(error = %e, "License exchange failed");
            }
            callback.on_response(response);
        });

        Ok(())
    }
}
