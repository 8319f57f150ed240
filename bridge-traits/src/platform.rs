//! Thread-safety helper bounds shared by the bridge traits.
//!
//! DRM engines deliver their callbacks on engine-owned notification threads
//! while the pipeline thread decrypts, so every bridge implementation must be
//! shareable across threads. The marker traits below keep that bound in one
//! place instead of repeating `Send + Sync` on every trait definition.

/// Marker trait for bridge implementations shared between the pipeline thread
/// and engine notification threads.
pub trait PlatformSendSync: Send + Sync {}

impl<T> PlatformSendSync for T where T: Send + Sync {}

