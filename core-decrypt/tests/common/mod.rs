//! Hand-written fake DRM engine and license exchange shared by the
//! integration tests.
//!
//! Fakes never hold one of their own locks while calling out into the code
//! under test, since callbacks may re-enter the fake.

#![allow(dead_code)]

use bridge_traits::error::Result;
use bridge_traits::{
    BridgeError, DecryptRequest, DrmEngine, DrmSession, DrmSystem, Exchange, ExchangeCallback,
    ExchangeFactory, HttpRequest, HttpResponse, KeyStatus, LicenseType, SessionCallbacks,
    SessionParams, Subsample,
};
use bytes::Bytes;
use core_decrypt::metadata::{
    pack_subsamples, FIELD_ENCRYPTED, FIELD_IV, FIELD_IV_SIZE, FIELD_KID, FIELD_SUBSAMPLES,
    FIELD_SUBSAMPLE_COUNT,
};
use core_decrypt::{MediaBuffer, ProtectionEvent, Structure};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub const WIDEVINE: &str = "edef8ba9-79d6-4ace-a3c8-27dcd51d21ed";
pub const PLAYREADY: &str = "9a04f079-9840-4286-ab92-e65be0885f95";
pub const KEY_ID: [u8; 16] = [0x11; 16];
pub const IV: [u8; 8] = [0x22; 8];
pub const INIT_DATA: &[u8] = b"pssh-box";

/// Byte pattern the fake session "decrypts" with.
pub const XOR_MASK: u8 = 0xff;

// =============================================================================
// DRM session
// =============================================================================

/// Arguments of one decrypt primitive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptCall {
    pub key_id: Vec<u8>,
    pub iv: Vec<u8>,
    pub subsamples: Vec<Subsample>,
}

#[derive(Default)]
pub struct FakeSession {
    statuses: Mutex<HashMap<Vec<u8>, KeyStatus>>,
    callbacks: Mutex<Option<Arc<dyn SessionCallbacks>>>,
    decrypts: Mutex<Vec<DecryptCall>>,
    updates: Mutex<Vec<Vec<u8>>>,
    granted_on_update: Mutex<Vec<Vec<u8>>>,
    fail_decrypt: AtomicBool,
}

impl FakeSession {
    pub fn set_status(&self, key_id: &[u8], status: KeyStatus) {
        self.statuses.lock().insert(key_id.to_vec(), status);
    }

    /// Mark `key_id` usable and raise keys-updated.
    pub fn make_usable(&self, key_id: &[u8]) {
        self.set_status(key_id, KeyStatus::Usable);
        self.fire_keys_updated();
    }

    /// Raise keys-updated without changing any status.
    pub fn fire_keys_updated(&self) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.keys_updated();
        }
    }

    pub fn fire_error(&self, message: &str) {
        let callbacks = self.callbacks.lock().clone();
        if let Some(callbacks) = callbacks {
            callbacks.error_message(message);
        }
    }

    /// Keys that become usable when a license update arrives.
    pub fn grant_on_update(&self, key_id: &[u8]) {
        self.granted_on_update.lock().push(key_id.to_vec());
    }

    pub fn fail_decrypts(&self) {
        self.fail_decrypt.store(true, Ordering::SeqCst);
    }

    pub fn decrypt_calls(&self) -> Vec<DecryptCall> {
        self.decrypts.lock().clone()
    }

    pub fn updates(&self) -> Vec<Vec<u8>> {
        self.updates.lock().clone()
    }

    pub fn has_callbacks(&self) -> bool {
        self.callbacks.lock().is_some()
    }

    fn attach(&self, callbacks: Arc<dyn SessionCallbacks>) {
        *self.callbacks.lock() = Some(callbacks);
    }
}

impl DrmSession for FakeSession {
    fn key_status(&self, key_id: &[u8]) -> KeyStatus {
        self.statuses
            .lock()
            .get(key_id)
            .copied()
            .unwrap_or(KeyStatus::StatusPending)
    }

    fn decrypt(&self, data: &mut [u8], request: &DecryptRequest<'_>) -> Result<()> {
        self.decrypts.lock().push(DecryptCall {
            key_id: request.key_id.to_vec(),
            iv: request.iv.to_vec(),
            subsamples: request.subsamples.to_vec(),
        });

        if self.fail_decrypt.load(Ordering::SeqCst) {
            return Err(BridgeError::drm(0x2a, "decrypt failed"));
        }

        let mut offset = 0;
        for run in request.subsamples {
            offset += run.clear_bytes as usize;
            let end = offset + run.encrypted_bytes as usize;
            let Some(region) = data.get_mut(offset..end) else {
                return Err(BridgeError::drm(0x2b, "subsamples exceed buffer"));
            };
            region.iter_mut().for_each(|b| *b ^= XOR_MASK);
            offset = end;
        }
        Ok(())
    }

    fn update(&self, response: &[u8]) -> Result<()> {
        self.updates.lock().push(response.to_vec());

        let granted: Vec<_> = self.granted_on_update.lock().drain(..).collect();
        if granted.is_empty() {
            return Ok(());
        }
        for key_id in &granted {
            self.set_status(key_id, KeyStatus::Usable);
        }
        self.fire_keys_updated();
        Ok(())
    }
}

// =============================================================================
// DRM engine / system
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructCall {
    pub key_system: String,
    pub license_type: LicenseType,
    pub init_data_type: String,
    pub init_data: Vec<u8>,
    pub custom_data: Vec<u8>,
}

#[derive(Default)]
struct EngineState {
    session: Arc<FakeSession>,
    created: Mutex<Vec<String>>,
    constructed: Mutex<Vec<ConstructCall>>,
    challenge: Mutex<Option<(String, Vec<u8>)>>,
    fail_create: AtomicBool,
    fail_construct: AtomicBool,
}

/// DRM engine whose every system hands out the same [`FakeSession`].
#[derive(Default)]
pub struct FakeEngine {
    state: Arc<EngineState>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session(&self) -> Arc<FakeSession> {
        Arc::clone(&self.state.session)
    }

    /// Raise a license challenge from inside `construct_session`.
    pub fn challenge_on_construct(&self, url: &str, challenge: &[u8]) {
        *self.state.challenge.lock() = Some((url.to_string(), challenge.to_vec()));
    }

    pub fn fail_create(&self) {
        self.state.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_construct(&self) {
        self.state.fail_construct.store(true, Ordering::SeqCst);
    }

    /// Key systems `create_system` was called with.
    pub fn created_systems(&self) -> Vec<String> {
        self.state.created.lock().clone()
    }

    pub fn constructed_sessions(&self) -> Vec<ConstructCall> {
        self.state.constructed.lock().clone()
    }
}

impl DrmEngine for FakeEngine {
    fn create_system(&self, key_system: &str) -> Result<Arc<dyn DrmSystem>> {
        self.state.created.lock().push(key_system.to_string());

        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable(format!(
                "{} is not provisioned",
                key_system
            )));
        }

        Ok(Arc::new(FakeSystem {
            key_system: key_system.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSystem {
    key_system: String,
    state: Arc<EngineState>,
}

impl DrmSystem for FakeSystem {
    fn key_system(&self) -> &str {
        &self.key_system
    }

    fn construct_session(
        &self,
        params: SessionParams<'_>,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<Arc<dyn DrmSession>> {
        self.state.constructed.lock().push(ConstructCall {
            key_system: self.key_system.clone(),
            license_type: params.license_type,
            init_data_type: params.init_data_type.to_string(),
            init_data: params.init_data.to_vec(),
            custom_data: params.custom_data.to_vec(),
        });

        if self.state.fail_construct.load(Ordering::SeqCst) {
            return Err(BridgeError::drm(0x10, "session construction failed"));
        }

        let session = Arc::clone(&self.state.session);
        session.attach(Arc::clone(&callbacks));

        let challenge = self.state.challenge.lock().clone();
        if let Some((url, challenge)) = challenge {
            let handle: Arc<dyn DrmSession> = session.clone();
            callbacks.process_challenge(handle, &url, &challenge);
        }

        Ok(session)
    }
}

// =============================================================================
// License exchange
// =============================================================================

#[derive(Debug, Clone)]
pub struct SubmittedRequest {
    pub url: String,
    pub request: HttpRequest,
    pub timeout: Option<Duration>,
}

#[derive(Default)]
struct ExchangeState {
    created: Mutex<Vec<String>>,
    submitted: Mutex<Vec<SubmittedRequest>>,
    response: Mutex<Option<HttpResponse>>,
    runtime: Mutex<Option<Handle>>,
    submissions: AtomicUsize,
}

/// Exchange factory that records requests and optionally answers them.
#[derive(Default)]
pub struct FakeExchangeFactory {
    state: Arc<ExchangeState>,
}

impl FakeExchangeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request with `status` and `body`.
    pub fn respond_with(&self, status: u16, body: &'static [u8]) {
        *self.state.response.lock() = Some(HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body),
        });
    }

    /// Deliver responses from a task on `runtime` instead of inline.
    pub fn respond_on(&self, runtime: Handle) {
        *self.state.runtime.lock() = Some(runtime);
    }

    pub fn created_urls(&self) -> Vec<String> {
        self.state.created.lock().clone()
    }

    pub fn submitted(&self) -> Vec<SubmittedRequest> {
        self.state.submitted.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state.submissions.load(Ordering::SeqCst)
    }
}

impl ExchangeFactory for FakeExchangeFactory {
    fn create(&self, url: &str) -> Result<Box<dyn Exchange>> {
        self.state.created.lock().push(url.to_string());
        Ok(Box::new(FakeExchange {
            url: url.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeExchange {
    url: String,
    state: Arc<ExchangeState>,
}

impl Exchange for FakeExchange {
    fn submit(
        &self,
        request: HttpRequest,
        callback: Arc<dyn ExchangeCallback>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.state.submissions.fetch_add(1, Ordering::SeqCst);
        self.state.submitted.lock().push(SubmittedRequest {
            url: self.url.clone(),
            request,
            timeout,
        });

        let Some(response) = self.state.response.lock().clone() else {
            return Ok(());
        };

        let runtime = self.state.runtime.lock().clone();
        match runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    callback.on_response(Ok(response));
                });
            }
            None => callback.on_response(Ok(response)),
        }
        Ok(())
    }
}

// =============================================================================
// Buffers and signals
// =============================================================================

pub fn widevine_signal() -> ProtectionEvent {
    ProtectionEvent::new(WIDEVINE, "isobmff/pssh", Some(Bytes::from_static(INIT_DATA)))
}

/// Complete side-channel for an encrypted sample.
pub fn cenc_meta(subsamples: &[Subsample]) -> Structure {
    Structure::new("application/x-cenc")
        .with_field(FIELD_IV_SIZE, IV.len() as u32)
        .with_field(FIELD_ENCRYPTED, true)
        .with_field(FIELD_KID, Bytes::copy_from_slice(&KEY_ID))
        .with_field(FIELD_IV, Bytes::copy_from_slice(&IV))
        .with_field(FIELD_SUBSAMPLE_COUNT, subsamples.len() as u32)
        .with_field(FIELD_SUBSAMPLES, pack_subsamples(subsamples))
}

/// Eight-byte buffer with two subsamples: bytes 2..5 and 6..8 encrypted.
pub fn encrypted_buffer() -> MediaBuffer {
    MediaBuffer::new([0u8, 1, 2, 3, 4, 5, 6, 7])
        .with_protection(cenc_meta(&[Subsample::new(2, 3), Subsample::new(1, 2)]))
}

/// What [`encrypted_buffer`]'s payload looks like after a fake decrypt.
pub fn decrypted_payload() -> Vec<u8> {
    vec![0, 1, 2 ^ XOR_MASK, 3 ^ XOR_MASK, 4 ^ XOR_MASK, 5, 6 ^ XOR_MASK, 7 ^ XOR_MASK]
}
