//! # Session Engine
//!
//! Owns the DRM system and session for one track and decrypts its buffers.
//!
//! ## State machine
//!
//! ```text
//! Uninitialized ──create system──▶ SystemCreated ──construct session──▶ SessionConstructed
//!       │                               │
//!       └──────── setup failure ────────┴──────────────▶ Failed (terminal)
//! ```
//!
//! Only the first valid protection signal is acted on. A malformed signal is
//! rejected without leaving `Uninitialized`; an unresolvable key system or an
//! engine failure moves the engine to `Failed` and every later signal is
//! rejected.
//!
//! ## Threading
//!
//! `decrypt` runs on the pipeline's streaming thread and may block waiting
//! for a key. Engine callbacks arrive on the engine's notification threads and
//! are routed through [`EngineCallbacks`] as [`SessionEvent`]s. Callback
//! handling never takes the setup lock, so an engine may call back from inside
//! `construct_session` without deadlocking. Decrypt clones the session handle
//! under the lock and calls into the engine after releasing it.

use bridge_traits::{
    DecryptRequest, DrmEngine, DrmSession, DrmSystem, ExchangeFactory, LicenseType, SessionParams,
};
use core_runtime::RuntimeConfig;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::buffer::{BufferView, MediaBuffer};
use crate::callbacks::{EngineCallbacks, SessionEvent, SessionEventSink};
use crate::challenge::prepare_challenge;
use crate::config::DecryptorConfig;
use crate::error::{DecryptError, Result};
use crate::key_systems::KeySystemRegistry;
use crate::license::LicenseResponseHandler;
use crate::metadata::{parse_decryption_metadata, DecryptionMetadata, EncryptedSample};
use crate::protection::{parse_protection_event, ProtectionEvent};
use crate::readiness::{KeyReadiness, WaitError};
use crate::traits::{DecryptOutcome, Decryptor};

/// Init-data container format passed to the engine.
pub const INIT_DATA_TYPE_CENC: &str = "cenc";

/// Setup progress of a [`SessionDecryptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    SystemCreated,
    SessionConstructed,
    Failed,
}

impl SessionState {
    /// Returns `true` once a protection signal has been acted on.
    pub fn is_established(&self) -> bool {
        matches!(
            self,
            SessionState::SystemCreated | SessionState::SessionConstructed
        )
    }
}

struct Protection {
    state: SessionState,
    system: Option<Arc<dyn DrmSystem>>,
    session: Option<Arc<dyn DrmSession>>,
}

struct Shared {
    engine: Arc<dyn DrmEngine>,
    registry: KeySystemRegistry,
    config: DecryptorConfig,
    exchange_factory: RwLock<Option<Arc<dyn ExchangeFactory>>>,
    protection: Mutex<Protection>,
    readiness: KeyReadiness,
}

/// DRM session engine for a single track.
pub struct SessionDecryptor {
    shared: Arc<Shared>,
}

impl SessionDecryptor {
    /// Create a session engine on top of `engine`.
    ///
    /// Challenges cannot be delivered until [`initialize`](Decryptor::initialize)
    /// provides an exchange factory.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::Config`] if `config` does not validate.
    pub fn new(engine: Arc<dyn DrmEngine>, config: DecryptorConfig) -> Result<Self> {
        config.validate()?;
        let registry = config.registry()?;

        Ok(Self {
            shared: Arc::new(Shared {
                engine,
                registry,
                config,
                exchange_factory: RwLock::new(None),
                protection: Mutex::new(Protection {
                    state: SessionState::Uninitialized,
                    system: None,
                    session: None,
                }),
                readiness: KeyReadiness::new(),
            }),
        })
    }

    /// Create a session engine from the runtime's bridges, already initialized
    /// with its exchange factory.
    pub fn from_runtime(runtime: &RuntimeConfig, config: DecryptorConfig) -> Result<Self> {
        let decryptor = Self::new(Arc::clone(&runtime.drm_engine), config)?;
        decryptor.initialize(Arc::clone(&runtime.exchange_factory));
        Ok(decryptor)
    }

    pub fn state(&self) -> SessionState {
        self.shared.protection.lock().state
    }

    /// Domain name of the DRM system in use, once one has been created.
    pub fn key_system(&self) -> Option<String> {
        self.shared
            .protection
            .lock()
            .system
            .as_ref()
            .map(|system| system.key_system().to_string())
    }

    pub fn config(&self) -> &DecryptorConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &KeySystemRegistry {
        &self.shared.registry
    }

    /// Wake every decrypt blocked on a key and fail it with
    /// [`DecryptError::KeyWaitCancelled`]. Later waits fail the same way until
    /// [`reset_cancellation`](Self::reset_cancellation) is called.
    pub fn cancel_key_waits(&self) {
        info!("Cancelling key waits");
        self.shared.readiness.cancel();
    }

    /// Re-arm key waits after [`cancel_key_waits`](Self::cancel_key_waits).
    pub fn reset_cancellation(&self) {
        self.shared.readiness.reset();
    }

    fn current_session(&self) -> Option<Arc<dyn DrmSession>> {
        self.shared.protection.lock().session.clone()
    }

    fn callbacks(&self) -> Arc<EngineCallbacks> {
        let weak = Arc::downgrade(&self.shared);
        let target: Weak<dyn SessionEventSink> = weak;
        Arc::new(EngineCallbacks::new(target))
    }

    /// Block until `key_id` is usable in `session`.
    fn await_usable_key(&self, session: &dyn DrmSession, key_id: BufferView<'_>) -> Result<()> {
        let timeout = self.shared.config.key_wait_timeout;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            // Generation first, so a notification racing the status query
            // still wakes the wait below.
            let seen = self.shared.readiness.generation();
            let status = session.key_status(key_id.raw());
            if status.is_usable() {
                return Ok(());
            }

            debug!(key_id = %key_id.to_hex(), ?status, ?timeout, "Waiting for key");

            self.shared
                .readiness
                .wait_for_change(seen, deadline)
                .map_err(|e| match e {
                    WaitError::TimedOut => {
                        DecryptError::KeyWaitTimeout(timeout.unwrap_or_default())
                    }
                    WaitError::Cancelled => DecryptError::KeyWaitCancelled,
                })?;
        }
    }

    fn decrypt_sample(&self, buffer: &mut MediaBuffer, sample: &EncryptedSample) -> Result<()> {
        let session = self.current_session().ok_or(DecryptError::NoSession)?;
        let key_id = BufferView::from(&sample.key_id);

        if let Err(e) = self.await_usable_key(session.as_ref(), key_id) {
            warn!(key_id = %key_id.to_hex(), error = %e, "Abandoning decryption");
            return Err(e);
        }

        debug!(
            key_id = %key_id.to_hex(),
            subsamples = sample.subsample_count(),
            "Decrypting sample"
        );
        let request = DecryptRequest {
            key_id: key_id.raw(),
            iv: &sample.iv,
            subsamples: &sample.subsamples,
        };
        let result = session.decrypt(buffer.data_mut(), &request);

        // Stripped either way so the buffer is never decrypted twice
        buffer.remove_protection_meta();

        result.map_err(|e| {
            warn!(key_id = %key_id.to_hex(), error = %e, "Decrypt primitive failed");
            DecryptError::DecryptFailed(e)
        })
    }
}

impl Decryptor for SessionDecryptor {
    fn initialize(&self, factory: Arc<dyn ExchangeFactory>) {
        *self.shared.exchange_factory.write() = Some(factory);
    }

    #[instrument(skip(self, event), fields(system_id = %event.system_id(), origin = %event.origin()))]
    fn handle_protection(&self, event: &ProtectionEvent) -> Result<()> {
        let mut protection = self.shared.protection.lock();

        if protection.state.is_established() {
            debug!("Session already established, ignoring protection signal");
            return Ok(());
        }
        if protection.state == SessionState::Failed {
            return Err(DecryptError::SessionFailed);
        }

        let metadata = parse_protection_event(event).map_err(|e| {
            warn!(error = %e, "Rejecting protection signal");
            e
        })?;

        let key_system = match self.shared.registry.resolve(metadata.key_system) {
            Ok(domain) => domain,
            Err(e) => {
                error!(error = %e, "Cannot resolve key system");
                protection.state = SessionState::Failed;
                return Err(e);
            }
        };

        let system = match self.shared.engine.create_system(key_system) {
            Ok(system) => system,
            Err(source) => {
                error!(key_system, error = %source, "Cannot create DRM system");
                protection.state = SessionState::Failed;
                return Err(DecryptError::SystemCreationFailed {
                    key_system: key_system.to_string(),
                    source,
                });
            }
        };
        protection.system = Some(Arc::clone(&system));
        protection.state = SessionState::SystemCreated;

        let params = SessionParams {
            license_type: LicenseType::Temporary,
            init_data_type: INIT_DATA_TYPE_CENC,
            init_data: metadata.init_data.raw(),
            custom_data: &[],
        };

        match system.construct_session(params, self.callbacks()) {
            Ok(session) => {
                info!(
                    key_system,
                    init_data_len = metadata.init_data.len(),
                    "DRM session constructed"
                );
                protection.session = Some(session);
                protection.state = SessionState::SessionConstructed;
                Ok(())
            }
            Err(e) => {
                error!(key_system, error = %e, "Failed to construct DRM session");
                protection.system = None;
                protection.state = SessionState::Failed;
                Err(DecryptError::SessionConstructionFailed(e))
            }
        }
    }

    fn decrypt(&self, buffer: &mut MediaBuffer) -> Result<DecryptOutcome> {
        let sample = match parse_decryption_metadata(buffer) {
            DecryptionMetadata::Clear => return Ok(DecryptOutcome::Clear),
            DecryptionMetadata::Invalid(reason) => {
                warn!(%reason, "Invalid decryption metadata");
                return Err(DecryptError::InvalidMetadata(reason));
            }
            DecryptionMetadata::Encrypted(sample) => sample,
        };

        self.decrypt_sample(buffer, &sample)?;
        Ok(DecryptOutcome::Decrypted)
    }
}

impl Shared {
    fn submit_challenge(&self, session: Arc<dyn DrmSession>, url: &str, challenge: &[u8]) {
        let url_for_log = core_runtime::logging::redact_url(url);

        let Some(factory) = self.exchange_factory.read().clone() else {
            error!(url = url_for_log, "No exchange factory, dropping license challenge");
            return;
        };

        let exchange = match factory.create(url) {
            Ok(exchange) => exchange,
            Err(e) => {
                error!(url = url_for_log, error = %e, "Cannot create license exchange");
                return;
            }
        };

        let request = prepare_challenge(url, challenge);
        debug!(
            url = url_for_log,
            bytes = request.content_length(),
            "Submitting license challenge"
        );

        let handler = Arc::new(LicenseResponseHandler::new(session));
        if let Err(e) = exchange.submit(request, handler, self.config.license_request_timeout) {
            error!(url = url_for_log, error = %e, "Failed to submit license challenge");
        }
    }
}

impl SessionEventSink for Shared {
    fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Challenge {
                session,
                url,
                challenge,
            } => self.submit_challenge(session, &url, &challenge),
            SessionEvent::KeyUpdated { key_id } => {
                debug!(key_id = %hex::encode(&key_id), "Key status updated");
            }
            SessionEvent::Error { message } => {
                warn!(%message, "DRM engine reported an error");
            }
            SessionEvent::KeysUpdated => {
                debug!("Keys updated, waking decrypt");
                self.readiness.notify();
            }
        }
    }
}
