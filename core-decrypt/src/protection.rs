//! # Protection Signals
//!
//! In-band event announcing that a track is protected. The demuxer emits one
//! per key system found in the container, carrying the system GUID, where the
//! data came from (e.g. `isobmff/pssh` or `dash/mpd`) and the init data.

use bytes::Bytes;

use crate::buffer::BufferView;
use crate::error::{DecryptError, Result};

/// Protection event as delivered by the host pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionEvent {
    system_id: String,
    origin: String,
    data: Option<Bytes>,
}

impl ProtectionEvent {
    pub fn new(system_id: impl Into<String>, origin: impl Into<String>, data: Option<Bytes>) -> Self {
        Self {
            system_id: system_id.into(),
            origin: origin.into(),
            data,
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn data(&self) -> Option<&Bytes> {
        self.data.as_ref()
    }
}

/// Fields of a protection event that passed validation.
///
/// Borrows from the event; nothing is copied.
#[derive(Debug, Clone, Copy)]
pub struct ProtectionMetadata<'a> {
    pub key_system: &'a str,
    pub origin: &'a str,
    pub init_data: BufferView<'a>,
}

/// Extract the actionable fields of a protection event.
///
/// # Errors
///
/// Returns [`DecryptError::InvalidProtectionSignal`] if the key system or
/// origin is empty, or if the event carries no init data.
pub fn parse_protection_event(event: &ProtectionEvent) -> Result<ProtectionMetadata<'_>> {
    if event.system_id.is_empty() {
        return Err(DecryptError::InvalidProtectionSignal(
            "key system identifier is empty".to_string(),
        ));
    }

    if event.origin.is_empty() {
        return Err(DecryptError::InvalidProtectionSignal(
            "origin is empty".to_string(),
        ));
    }

    let init_data = event.data.as_ref().ok_or_else(|| {
        DecryptError::InvalidProtectionSignal("no initialization data".to_string())
    })?;

    Ok(ProtectionMetadata {
        key_system: &event.system_id,
        origin: &event.origin,
        init_data: BufferView::from(init_data),
    })
}
