//! License Exchange Abstraction
//!
//! A request/response channel used to deliver license challenges produced by
//! the DRM engine to a remote license server.
//!
//! Submission is fire-and-forget from the caller's perspective: [`Exchange::submit`]
//! returns as soon as the request has been handed off, and the response arrives
//! later on the exchange's own execution context through [`ExchangeCallback`].
//! An exchange must keep its in-flight request alive after the `Exchange`
//! value itself has been dropped.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};
use crate::platform::PlatformSendSync;

/// Receives the outcome of a submitted request.
///
/// Called exactly once per successful [`Exchange::submit`], from whatever
/// thread the exchange completes on.
pub trait ExchangeCallback: PlatformSendSync {
    fn on_response(&self, response: Result<HttpResponse>);
}

/// A single request/response channel bound to one URL.
pub trait Exchange: PlatformSendSync {
    /// Hand `request` off for delivery.
    ///
    /// `timeout` of `None` means the exchange waits for the server for as long
    /// as the transport allows.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be scheduled at all; in
    /// that case `callback` is never invoked.
    fn submit(
        &self,
        request: HttpRequest,
        callback: Arc<dyn ExchangeCallback>,
        timeout: Option<Duration>,
    ) -> Result<()>;
}

/// Produces exchanges for the URLs a DRM engine asks challenges to be sent to.
pub trait ExchangeFactory: PlatformSendSync {
    fn create(&self, url: &str) -> Result<Box<dyn Exchange>>;
}
