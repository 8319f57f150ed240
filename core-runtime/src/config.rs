//! # Runtime Configuration
//!
//! Collects the host capabilities a decryption element needs before it can
//! process any protected content.
//!
//! ## Overview
//!
//! [`RuntimeConfigBuilder`] gathers the injected bridges and validates them
//! fail-fast: a missing DRM engine or license transport is reported when the
//! element is configured, not when the first protection event arrives.
//!
//! ## Required Dependencies
//!
//! - `DrmEngine` - Creates key systems and sessions
//! - `ExchangeFactory` - Delivers license challenges (desktop default: reqwest)
//!
//! ## Optional
//!
//! - `LoggingConfig` - Applied by the host through [`crate::logging::init_logging`]
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::RuntimeConfig;
//! use std::sync::Arc;
//!
//! let config = RuntimeConfig::builder()
//!     .drm_engine(Arc::new(MyOpenCdmEngine::new()))
//!     .exchange_factory(Arc::new(MyExchangeFactory))
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::builder()
//!     .build()
//!     .expect("Should fail - missing DrmEngine");
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use bridge_traits::{DrmEngine, ExchangeFactory};
use std::sync::Arc;

/// Host capabilities shared by every decryptor built from this config.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// DRM engine used to create key systems (required)
    pub drm_engine: Arc<dyn DrmEngine>,

    /// License transport (required unless `desktop-shims` provides one)
    pub exchange_factory: Arc<dyn ExchangeFactory>,

    /// Logging settings the host may apply at startup
    pub logging: Option<LoggingConfig>,
}

impl std::fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("drm_engine", &"DrmEngine { ... }")
            .field("exchange_factory", &"ExchangeFactory { ... }")
            .field("logging", &self.logging)
            .finish()
    }
}

impl RuntimeConfig {
    /// Creates a new builder for constructing a `RuntimeConfig`.
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }
}

fn drm_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "DrmEngine".to_string(),
        message: "DrmEngine implementation is required to create key systems. \
                 Inject the platform content decryption module (e.g. an OpenCDM client)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn exchange_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ExchangeFactory".to_string(),
        message: "ExchangeFactory implementation is required to deliver license challenges. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default HttpExchangeFactory. \
                 Embedded: inject the platform's license transport."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_exchange_factory() -> Result<Arc<dyn ExchangeFactory>> {
    use bridge_desktop::{HttpExchangeFactory, ReqwestHttpClient};

    let client = ReqwestHttpClient::new()?;
    let factory = HttpExchangeFactory::from_current(Arc::new(client)).map_err(|e| {
        Error::CapabilityMissing {
            capability: "ExchangeFactory".to_string(),
            message: format!(
                "Default HttpExchangeFactory needs a tokio runtime; build the config \
                 inside one or inject an ExchangeFactory explicitly ({})",
                e
            ),
        }
    })?;

    let factory: Arc<dyn ExchangeFactory> = Arc::new(factory);
    Ok(factory)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_exchange_factory() -> Result<Arc<dyn ExchangeFactory>> {
    Err(exchange_factory_missing_error())
}

/// Builder for [`RuntimeConfig`].
#[derive(Default)]
pub struct RuntimeConfigBuilder {
    drm_engine: Option<Arc<dyn DrmEngine>>,
    exchange_factory: Option<Arc<dyn ExchangeFactory>>,
    logging: Option<LoggingConfig>,
}

impl RuntimeConfigBuilder {
    /// Sets the DRM engine (required).
    pub fn drm_engine(mut self, engine: Arc<dyn DrmEngine>) -> Self {
        self.drm_engine = Some(engine);
        self
    }

    /// Sets the license exchange factory.
    ///
    /// If not provided, the desktop default (reqwest over the current tokio
    /// runtime) is used when the `desktop-shims` feature is enabled.
    pub fn exchange_factory(mut self, factory: Arc<dyn ExchangeFactory>) -> Self {
        self.exchange_factory = Some(factory);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `RuntimeConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] if the DRM engine is missing, or
    /// if no exchange factory was injected and no desktop default is
    /// available.
    pub fn build(self) -> Result<RuntimeConfig> {
        let drm_engine = self.drm_engine.ok_or_else(drm_engine_missing_error)?;

        let exchange_factory = match self.exchange_factory {
            Some(factory) => factory,
            None => provide_default_exchange_factory()?,
        };

        Ok(RuntimeConfig {
            drm_engine,
            exchange_factory,
            logging: self.logging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{DrmSystem, Exchange, LogLevel};

    struct NoopEngine;

    impl DrmEngine for NoopEngine {
        fn create_system(&self, key_system: &str) -> BridgeResult<Arc<dyn DrmSystem>> {
            Err(BridgeError::NotAvailable(key_system.to_string()))
        }
    }

    struct NoopExchangeFactory;

    impl ExchangeFactory for NoopExchangeFactory {
        fn create(&self, url: &str) -> BridgeResult<Box<dyn Exchange>> {
            Err(BridgeError::NotAvailable(url.to_string()))
        }
    }

    #[test]
    fn test_builder_requires_drm_engine() {
        let result = RuntimeConfig::builder()
            .exchange_factory(Arc::new(NoopExchangeFactory))
            .build();

        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("DrmEngine"));
        assert!(err_msg.contains("key systems"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_exchange_factory() {
        let result = RuntimeConfig::builder()
            .drm_engine(Arc::new(NoopEngine))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "ExchangeFactory");
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_with_all_capabilities() {
        let config = RuntimeConfig::builder()
            .drm_engine(Arc::new(NoopEngine))
            .exchange_factory(Arc::new(NoopExchangeFactory))
            .logging(LoggingConfig::default().with_level(LogLevel::Debug))
            .build()
            .unwrap();

        assert_eq!(
            config.logging.as_ref().map(|l| l.level),
            Some(LogLevel::Debug)
        );
        assert!(config.drm_engine.create_system("com.widevine.alpha").is_err());
    }

    #[test]
    fn test_debug_hides_capabilities() {
        let config = RuntimeConfig::builder()
            .drm_engine(Arc::new(NoopEngine))
            .exchange_factory(Arc::new(NoopExchangeFactory))
            .build()
            .unwrap();

        let rendered = format!("{:?}", config);
        assert!(rendered.contains("DrmEngine { ... }"));
        assert!(rendered.contains("logging: None"));
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_build_with_desktop_exchange_inside_runtime() {
        let config = RuntimeConfig::builder()
            .drm_engine(Arc::new(NoopEngine))
            .build()
            .expect("desktop exchange default should succeed inside runtime");

        assert!(config.exchange_factory.create("").is_err());
        assert!(config
            .exchange_factory
            .create("https://license.example.com/wv")
            .is_ok());
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_exchange_outside_runtime() {
        let result = RuntimeConfig::builder()
            .drm_engine(Arc::new(NoopEngine))
            .build();

        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
    }
}
