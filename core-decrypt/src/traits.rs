//! # Decryptor Trait
//!
//! Seam between the pipeline adapter and the session engine, so the element
//! can be driven by any decryptor implementation.

use std::sync::Arc;

use bridge_traits::ExchangeFactory;

use crate::buffer::MediaBuffer;
use crate::error::Result;
use crate::protection::ProtectionEvent;

/// What [`Decryptor::decrypt`] did to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Buffer was not encrypted and is untouched apart from a stripped
    /// no-op side-channel.
    Clear,
    /// Buffer was decrypted in place and its side-channel removed.
    Decrypted,
}

/// Decryption session engine as seen by the pipeline.
pub trait Decryptor: Send + Sync {
    /// Record the factory used to deliver license challenges.
    fn initialize(&self, factory: Arc<dyn ExchangeFactory>);

    /// Act on a protection signal.
    ///
    /// Only the first valid signal sets up a session. Later calls succeed
    /// without doing anything.
    fn handle_protection(&self, event: &ProtectionEvent) -> Result<()>;

    /// Decrypt `buffer` in place, blocking until its key is usable.
    fn decrypt(&self, buffer: &mut MediaBuffer) -> Result<DecryptOutcome>;
}
