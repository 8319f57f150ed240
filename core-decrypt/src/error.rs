//! # Decrypt Error Types
//!
//! Errors raised while establishing a DRM session or decrypting buffers.
//!
//! The variants fall into two groups. Setup failures ([`DecryptError::is_fatal`])
//! leave the track undecryptable. Everything else affects only the buffer that
//! triggered it and the pipeline carries on with the next one.

use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while handling protection signals or decrypting.
#[derive(Error, Debug)]
pub enum DecryptError {
    // ========================================================================
    // Signal Rejection
    // ========================================================================
    /// Protection signal is missing its key system, origin or init data.
    #[error("Invalid protection signal: {0}")]
    InvalidProtectionSignal(String),

    /// Key-system identifier is not in the registry.
    #[error("Unsupported key system: {0}")]
    UnsupportedKeySystem(String),

    // ========================================================================
    // Session Setup Failures
    // ========================================================================
    /// The DRM engine could not create a system for the resolved domain.
    #[error("Failed to create DRM system for {key_system}: {source}")]
    SystemCreationFailed {
        key_system: String,
        #[source]
        source: BridgeError,
    },

    /// The DRM engine rejected the session's initialization data.
    #[error("Failed to construct DRM session: {0}")]
    SessionConstructionFailed(#[source] BridgeError),

    /// An earlier setup failure already made this track undecryptable.
    #[error("DRM session setup previously failed")]
    SessionFailed,

    // ========================================================================
    // Per-Buffer Failures
    // ========================================================================
    /// Buffer carries protection metadata that cannot be used.
    #[error("Invalid decryption metadata: {0}")]
    InvalidMetadata(String),

    /// Key did not become usable within the configured wait.
    #[error("Timed out after {0:?} waiting for a usable key")]
    KeyWaitTimeout(Duration),

    /// Key wait was interrupted by [`cancel_key_waits`](crate::SessionDecryptor::cancel_key_waits).
    #[error("Key wait cancelled")]
    KeyWaitCancelled,

    /// Encrypted buffer arrived before any session was established.
    #[error("No DRM session available")]
    NoSession,

    /// The engine's decrypt primitive reported an error.
    #[error("Decryption failed: {0}")]
    DecryptFailed(#[source] BridgeError),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Invalid decryptor configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from core-runtime.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl DecryptError {
    /// Returns `true` if the track cannot be decrypted after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecryptError::UnsupportedKeySystem(_)
                | DecryptError::SystemCreationFailed { .. }
                | DecryptError::SessionConstructionFailed(_)
                | DecryptError::SessionFailed
        )
    }

    /// Returns `true` if this error only affects the buffer being processed.
    pub fn is_per_buffer(&self) -> bool {
        matches!(
            self,
            DecryptError::InvalidMetadata(_)
                | DecryptError::KeyWaitTimeout(_)
                | DecryptError::KeyWaitCancelled
                | DecryptError::NoSession
                | DecryptError::DecryptFailed(_)
        )
    }
}

/// Result type for decrypt operations.
pub type Result<T> = std::result::Result<T, DecryptError>;
