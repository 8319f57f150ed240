//! # Decryptor Configuration
//!
//! Settings for one decryption element: which key systems it resolves, which
//! clear content types it advertises and how long it is willing to wait.

use crate::error::{DecryptError, Result};
use crate::key_systems::{
    KeySystemRegistry, PLAYREADY_DOMAIN, PLAYREADY_SYSTEM_ID, WIDEVINE_DOMAIN, WIDEVINE_SYSTEM_ID,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One row of the key-system registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySystemEntry {
    /// Protection-system GUID as found in the container
    pub system_id: String,
    /// Canonical key-system domain name passed to the DRM engine
    pub domain: String,
}

impl KeySystemEntry {
    pub fn new(system_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            domain: domain.into(),
        }
    }
}

/// Configuration for a decryption session engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptorConfig {
    /// Key systems this element resolves and advertises
    #[serde(default = "default_key_systems")]
    pub key_systems: Vec<KeySystemEntry>,

    /// Media types accepted once decrypted
    #[serde(default = "default_clear_content_types")]
    pub clear_content_types: Vec<String>,

    /// Upper bound on waiting for a key to become usable.
    ///
    /// `None` waits until the key arrives or the wait is cancelled.
    #[serde(default)]
    pub key_wait_timeout: Option<Duration>,

    /// Timeout handed to the exchange for each license request.
    ///
    /// `None` leaves the request open for as long as the transport allows.
    #[serde(default)]
    pub license_request_timeout: Option<Duration>,
}

fn default_key_systems() -> Vec<KeySystemEntry> {
    vec![
        KeySystemEntry::new(WIDEVINE_SYSTEM_ID, WIDEVINE_DOMAIN),
        KeySystemEntry::new(PLAYREADY_SYSTEM_ID, PLAYREADY_DOMAIN),
    ]
}

fn default_clear_content_types() -> Vec<String> {
    ["video/mp4", "audio/mp4", "audio/mpeg", "video/x-h264"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl Default for DecryptorConfig {
    fn default() -> Self {
        Self {
            key_systems: default_key_systems(),
            clear_content_types: default_clear_content_types(),
            key_wait_timeout: None,
            license_request_timeout: None,
        }
    }
}

impl DecryptorConfig {
    /// Bound the key wait.
    pub fn with_key_wait_timeout(mut self, timeout: Duration) -> Self {
        self.key_wait_timeout = Some(timeout);
        self
    }

    /// Bound each license request.
    pub fn with_license_request_timeout(mut self, timeout: Duration) -> Self {
        self.license_request_timeout = Some(timeout);
        self
    }

    /// Replace the key-system registry.
    pub fn with_key_systems(mut self, key_systems: Vec<KeySystemEntry>) -> Self {
        self.key_systems = key_systems;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.key_systems.is_empty() {
            return Err(DecryptError::Config(
                "At least one key system must be configured".to_string(),
            ));
        }

        // Checks GUID syntax, domains and duplicates
        KeySystemRegistry::from_entries(&self.key_systems)?;

        if self.clear_content_types.is_empty() {
            return Err(DecryptError::Config(
                "At least one clear content type must be configured".to_string(),
            ));
        }

        if self.clear_content_types.iter().any(|t| t.is_empty()) {
            return Err(DecryptError::Config(
                "Clear content types cannot be empty strings".to_string(),
            ));
        }

        if self.key_wait_timeout == Some(Duration::ZERO) {
            return Err(DecryptError::Config(
                "Key wait timeout must be greater than zero".to_string(),
            ));
        }

        if self.license_request_timeout == Some(Duration::ZERO) {
            return Err(DecryptError::Config(
                "License request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the registry described by `key_systems`.
    pub fn registry(&self) -> Result<KeySystemRegistry> {
        KeySystemRegistry::from_entries(&self.key_systems)
    }
}
