use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("DRM engine error {code:#x}: {message}")]
    Drm { code: u32, message: String },

    #[error("HTTP status {status}")]
    Http { status: u16 },
}

impl BridgeError {
    /// Shorthand for a DRM engine failure with the engine's native error code.
    pub fn drm(code: u32, message: impl Into<String>) -> Self {
        BridgeError::Drm {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
