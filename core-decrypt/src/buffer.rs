//! # Media Buffers
//!
//! Media bytes as they flow through the pipeline, plus the borrowed views
//! handed to the DRM engine.

use bytes::{Bytes, BytesMut};
use std::ops::Deref;

use crate::structure::Structure;

/// Read-only view over a byte region owned by someone else.
///
/// Key ids, IVs and initialization data are passed to the engine through
/// views. A view never outlives the call it was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferView<'a> {
    data: &'a [u8],
}

impl<'a> BufferView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn raw(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Lowercase hex rendering for log fields.
    pub fn to_hex(&self) -> String {
        hex::encode(self.data)
    }
}

impl Deref for BufferView<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

impl<'a> From<&'a Bytes> for BufferView<'a> {
    fn from(bytes: &'a Bytes) -> Self {
        Self::new(bytes.as_ref())
    }
}

/// Crypto side-channel attached to an encrypted buffer by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionMeta {
    pub info: Structure,
}

impl ProtectionMeta {
    pub fn new(info: Structure) -> Self {
        Self { info }
    }
}

/// One unit of media travelling through the element.
#[derive(Debug, Clone, Default)]
pub struct MediaBuffer {
    data: BytesMut,
    protection: Option<ProtectionMeta>,
}

impl MediaBuffer {
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self {
            data: BytesMut::from(data.as_ref()),
            protection: None,
        }
    }

    /// Builder form that attaches a protection side-channel.
    pub fn with_protection(mut self, info: Structure) -> Self {
        self.add_protection_meta(info);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn protection_meta(&self) -> Option<&ProtectionMeta> {
        self.protection.as_ref()
    }

    pub fn protection_meta_mut(&mut self) -> Option<&mut ProtectionMeta> {
        self.protection.as_mut()
    }

    pub fn has_protection_meta(&self) -> bool {
        self.protection.is_some()
    }

    pub fn add_protection_meta(&mut self, info: Structure) {
        self.protection = Some(ProtectionMeta::new(info));
    }

    /// Detach the side-channel so downstream elements see a clear buffer.
    pub fn remove_protection_meta(&mut self) -> Option<ProtectionMeta> {
        self.protection.take()
    }

    /// Freeze the payload, discarding any remaining side-channel.
    pub fn into_bytes(self) -> Bytes {
        self.data.freeze()
    }
}
