//! DRM Engine Abstraction
//!
//! The opaque content-decryption capability supplied by the host platform
//! (e.g. an OpenCDM client). The core never sees key material: it asks the
//! engine to create a system for a key-system domain, constructs a session
//! with initialization data, polls per-key status and hands buffers to the
//! engine's decrypt primitive together with the per-sample crypto layout.
//!
//! ## Callbacks
//!
//! Sessions report asynchronous progress through [`SessionCallbacks`]. Engines
//! may invoke these from their own notification threads at any time after
//! [`DrmSystem::construct_session`] has been entered, including before it
//! returns.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::platform::PlatformSendSync;

/// Usability of a single content key inside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyStatus {
    Usable,
    Expired,
    Released,
    OutputRestricted,
    OutputDownscaled,
    StatusPending,
    InternalError,
}

impl KeyStatus {
    /// Returns `true` if the key can be used for decryption right now.
    pub fn is_usable(&self) -> bool {
        matches!(self, KeyStatus::Usable)
    }
}

/// License persistence requested when constructing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    Temporary,
    PersistentUsageRecord,
    PersistentLicense,
}

/// One `(clear, encrypted)` run of a CENC subsample layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subsample {
    pub clear_bytes: u16,
    pub encrypted_bytes: u32,
}

impl Subsample {
    pub fn new(clear_bytes: u16, encrypted_bytes: u32) -> Self {
        Self {
            clear_bytes,
            encrypted_bytes,
        }
    }

    /// Total bytes covered by this run.
    pub fn len(&self) -> usize {
        self.clear_bytes as usize + self.encrypted_bytes as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parameters for [`DrmSystem::construct_session`].
#[derive(Debug, Clone, Copy)]
pub struct SessionParams<'a> {
    pub license_type: LicenseType,
    /// Container format tag of the initialization data (e.g. `"cenc"`).
    pub init_data_type: &'a str,
    pub init_data: &'a [u8],
    pub custom_data: &'a [u8],
}

/// Per-buffer inputs for the engine's decrypt primitive.
#[derive(Debug, Clone, Copy)]
pub struct DecryptRequest<'a> {
    pub key_id: &'a [u8],
    pub iv: &'a [u8],
    pub subsamples: &'a [Subsample],
}

/// Asynchronous notifications raised by a session.
pub trait SessionCallbacks: PlatformSendSync {
    /// A license challenge must be delivered to `url`.
    ///
    /// `session` is the session the resulting license response must be fed
    /// back into via [`DrmSession::update`].
    fn process_challenge(&self, session: Arc<dyn DrmSession>, url: &str, challenge: &[u8]);

    /// Status of a single key changed.
    fn key_update(&self, key_id: &[u8]);

    /// The engine reported an error for this session.
    fn error_message(&self, message: &str);

    /// A batch of key status updates has been applied.
    fn keys_updated(&self);
}

/// One license negotiation.
pub trait DrmSession: PlatformSendSync {
    fn key_status(&self, key_id: &[u8]) -> KeyStatus;

    /// Decrypt `data` in place with the key identified by `request.key_id`.
    fn decrypt(&self, data: &mut [u8], request: &DecryptRequest<'_>) -> Result<()>;

    /// Feed a license server response into the session.
    fn update(&self, response: &[u8]) -> Result<()>;
}

/// DRM engine instance for one key-system domain.
pub trait DrmSystem: PlatformSendSync {
    fn key_system(&self) -> &str;

    fn construct_session(
        &self,
        params: SessionParams<'_>,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<Arc<dyn DrmSession>>;
}

/// Entry point into the host's DRM engine.
pub trait DrmEngine: PlatformSendSync {
    /// Create a system for a canonical key-system domain name
    /// (e.g. `com.widevine.alpha`).
    fn create_system(&self, key_system: &str) -> Result<Arc<dyn DrmSystem>>;
}
