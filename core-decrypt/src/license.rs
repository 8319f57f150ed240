//! # License Responses
//!
//! Feeds license server responses back into the session that asked for them.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{DrmSession, ExchangeCallback, HttpResponse};
use std::sync::Arc;
use tracing::{debug, warn};

/// [`ExchangeCallback`] that updates a DRM session with the license body.
///
/// Non-2xx responses and transport errors are logged and dropped; the session
/// keeps its keys pending and any blocked decrypt keeps waiting.
pub struct LicenseResponseHandler {
    session: Arc<dyn DrmSession>,
}

impl LicenseResponseHandler {
    pub fn new(session: Arc<dyn DrmSession>) -> Self {
        Self { session }
    }
}

impl ExchangeCallback for LicenseResponseHandler {
    fn on_response(&self, response: BridgeResult<HttpResponse>) {
        match response {
            Ok(response) if response.is_success() => {
                debug!(
                    status = response.status,
                    bytes = response.body.len(),
                    "License response received"
                );
                if let Err(e) = self.session.update(&response.body) {
                    warn!(error = %e, "DRM session rejected license response");
                }
            }
            Ok(response) => {
                warn!(status = response.status, "License server returned an error");
            }
            Err(e) => {
                warn!(error = %e, "License request failed");
            }
        }
    }
}
