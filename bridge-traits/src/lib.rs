//! # Host Bridge Traits
//!
//! Capability traits the host platform implements for the decryption core.
//!
//! ## Overview
//!
//! The core decrypts CENC buffers on behalf of a DRM client but owns neither
//! the DRM engine nor the network transport. Both are injected through the
//! traits in this crate so that the session logic can be exercised against
//! fakes in tests and against real engines (OpenCDM, platform CDMs) in
//! production.
//!
//! ## Traits
//!
//! ### Content Decryption
//! - [`DrmEngine`](drm::DrmEngine) - Creates a [`DrmSystem`](drm::DrmSystem) per key-system domain
//! - [`DrmSystem`](drm::DrmSystem) - Constructs license sessions from initialization data
//! - [`DrmSession`](drm::DrmSession) - Key status, in-place decrypt, license update
//! - [`SessionCallbacks`](drm::SessionCallbacks) - Asynchronous session notifications
//!
//! ### License Delivery
//! - [`ExchangeFactory`](exchange::ExchangeFactory) - Produces an [`Exchange`](exchange::Exchange) per license URL
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the desktop exchange
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). DRM engines
//! should report native error codes through [`BridgeError::Drm`].
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: engine callbacks and exchange
//! responses arrive on threads other than the pipeline's streaming thread.

pub mod drm;
pub mod error;
pub mod exchange;
pub mod http;
pub mod log;
pub mod platform;

pub use error::BridgeError;

// Re-export commonly used types
pub use drm::{
    DecryptRequest, DrmEngine, DrmSession, DrmSystem, KeyStatus, LicenseType, SessionCallbacks,
    SessionParams, Subsample,
};
pub use exchange::{Exchange, ExchangeCallback, ExchangeFactory};
pub use http::{ConnectionMode, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
