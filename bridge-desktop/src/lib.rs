//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the network-facing
//! bridge traits:
//! - `HttpClient` using `reqwest`
//! - `ExchangeFactory` delivering license challenges on a tokio runtime
//!
//! The DRM engine itself is never provided here; it is always injected by the
//! host.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{HttpExchangeFactory, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Arc::new(ReqwestHttpClient::new().unwrap());
//!     let exchanges = HttpExchangeFactory::from_current(client).unwrap();
//!
//!     // Use in runtime configuration
//! }
//! ```

mod exchange;
mod http;

pub use exchange::HttpExchangeFactory;
pub use http::ReqwestHttpClient;
