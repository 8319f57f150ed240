//! # Decryption Metadata
//!
//! Per-buffer crypto parameters read from the side-channel the demuxer
//! attaches to each encrypted sample.
//!
//! ## Side-channel layout
//!
//! | Field             | Type   | Meaning |
//! |-------------------|--------|---------|
//! | `kid`             | buffer | Key id |
//! | `iv_size`         | uint   | IV length in bytes, `0` for clear samples |
//! | `encrypted`       | bool   | `false` for clear samples |
//! | `subsample_count` | uint   | Number of entries in `subsamples` |
//! | `subsamples`      | buffer | Packed big-endian `u16 clear, u32 encrypted` entries |
//! | `iv`              | buffer | Initialization vector |
//!
//! Malformed side-channels never fail the pipeline: they parse to
//! [`DecryptionMetadata::Invalid`] and the buffer is rejected on its own.

use bridge_traits::Subsample;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::buffer::MediaBuffer;

pub const FIELD_KID: &str = "kid";
pub const FIELD_IV_SIZE: &str = "iv_size";
pub const FIELD_ENCRYPTED: &str = "encrypted";
pub const FIELD_SUBSAMPLE_COUNT: &str = "subsample_count";
pub const FIELD_SUBSAMPLES: &str = "subsamples";
pub const FIELD_IV: &str = "iv";
pub const FIELD_STREAM_ENCRYPTION_EVENTS: &str = "stream-encryption-events";

/// Bytes per packed subsample entry.
pub const SUBSAMPLE_ENTRY_SIZE: usize = 6;

/// Crypto parameters of one encrypted sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSample {
    pub key_id: Bytes,
    pub iv: Bytes,
    pub subsamples: Vec<Subsample>,
}

impl EncryptedSample {
    pub fn subsample_count(&self) -> usize {
        self.subsamples.len()
    }

    /// Total bytes covered by the subsample layout.
    pub fn covered_len(&self) -> usize {
        self.subsamples.iter().map(Subsample::len).sum()
    }
}

/// Outcome of inspecting a buffer's side-channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionMetadata {
    /// Nothing to decrypt.
    Clear,
    /// Side-channel present but unusable.
    Invalid(String),
    Encrypted(EncryptedSample),
}

impl DecryptionMetadata {
    pub fn is_clear(&self) -> bool {
        matches!(self, DecryptionMetadata::Clear)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DecryptionMetadata::Encrypted(_))
    }
}

/// Inspect and normalize the side-channel of `buffer`.
///
/// - no side-channel: [`DecryptionMetadata::Clear`]
/// - `iv_size == 0` or `encrypted == false`: the side-channel is removed and
///   the buffer reads as clear
/// - otherwise the key id, IV and subsample layout are extracted
///
/// Besides missing or wrongly typed fields, two layouts are rejected as
/// [`DecryptionMetadata::Invalid`] because the engine cannot act on them. An
/// IV whose length differs from `iv_size` is one. A subsample layout covering
/// more bytes than the buffer holds is the other.
///
/// The `stream-encryption-events` field is dropped from any side-channel that
/// is left in place.
pub fn parse_decryption_metadata(buffer: &mut MediaBuffer) -> DecryptionMetadata {
    let buffer_len = buffer.len();
    let Some(meta) = buffer.protection_meta_mut() else {
        return DecryptionMetadata::Clear;
    };

    let info = &mut meta.info;
    info.remove_field(FIELD_STREAM_ENCRYPTION_EVENTS);

    let Some(iv_size) = info.get_uint(FIELD_IV_SIZE) else {
        return DecryptionMetadata::Invalid(format!("missing or non-uint '{}'", FIELD_IV_SIZE));
    };
    let Some(encrypted) = info.get_bool(FIELD_ENCRYPTED) else {
        return DecryptionMetadata::Invalid(format!("missing or non-bool '{}'", FIELD_ENCRYPTED));
    };

    if iv_size == 0 || !encrypted {
        buffer.remove_protection_meta();
        return DecryptionMetadata::Clear;
    }

    let key_id = match info.get_buffer(FIELD_KID) {
        Some(kid) if !kid.is_empty() => kid.clone(),
        _ => return DecryptionMetadata::Invalid("missing key id".to_string()),
    };

    let count = info.get_uint(FIELD_SUBSAMPLE_COUNT).unwrap_or(0);
    if count == 0 {
        return DecryptionMetadata::Invalid("no subsamples".to_string());
    }

    let Some(packed) = info.get_buffer(FIELD_SUBSAMPLES) else {
        return DecryptionMetadata::Invalid(format!(
            "subsample_count is {} but '{}' is missing",
            count, FIELD_SUBSAMPLES
        ));
    };
    let subsamples = match unpack_subsamples(packed, count as usize) {
        Ok(subsamples) => subsamples,
        Err(reason) => return DecryptionMetadata::Invalid(reason),
    };

    let iv = match info.get_buffer(FIELD_IV) {
        Some(iv) if !iv.is_empty() => iv.clone(),
        _ => return DecryptionMetadata::Invalid("missing IV".to_string()),
    };
    if iv.len() != iv_size as usize {
        return DecryptionMetadata::Invalid(format!(
            "IV is {} bytes but iv_size is {}",
            iv.len(),
            iv_size
        ));
    }

    let sample = EncryptedSample {
        key_id,
        iv,
        subsamples,
    };
    if sample.covered_len() > buffer_len {
        return DecryptionMetadata::Invalid(format!(
            "{} subsamples cover {} bytes of a {} byte buffer",
            sample.subsample_count(),
            sample.covered_len(),
            buffer_len
        ));
    }

    DecryptionMetadata::Encrypted(sample)
}

/// Decode `count` packed subsample entries.
///
/// Trailing bytes beyond `count` entries are ignored.
pub fn unpack_subsamples(packed: &[u8], count: usize) -> Result<Vec<Subsample>, String> {
    let needed = count.saturating_mul(SUBSAMPLE_ENTRY_SIZE);
    if packed.len() < needed {
        return Err(format!(
            "subsample buffer is {} bytes, {} entries need {}",
            packed.len(),
            count,
            needed
        ));
    }

    let mut cursor = packed;
    let mut subsamples = Vec::with_capacity(count);
    for _ in 0..count {
        let clear = cursor.get_u16();
        let encrypted = cursor.get_u32();
        subsamples.push(Subsample::new(clear, encrypted));
    }
    Ok(subsamples)
}

/// Encode subsamples in the side-channel wire layout.
pub fn pack_subsamples(subsamples: &[Subsample]) -> Bytes {
    let mut packed = BytesMut::with_capacity(subsamples.len() * SUBSAMPLE_ENTRY_SIZE);
    for subsample in subsamples {
        packed.put_u16(subsample.clear_bytes);
        packed.put_u32(subsample.encrypted_bytes);
    }
    packed.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;

    const KID: &[u8] = &[0x10; 16];
    const IV: &[u8] = &[0x22; 8];

    fn encrypted_info() -> Structure {
        Structure::new("application/x-cenc")
            .with_field(FIELD_IV_SIZE, 8u32)
            .with_field(FIELD_ENCRYPTED, true)
            .with_field(FIELD_KID, Bytes::from_static(KID))
            .with_field(FIELD_IV, Bytes::from_static(IV))
            .with_field(FIELD_SUBSAMPLE_COUNT, 2u32)
            .with_field(
                FIELD_SUBSAMPLES,
                Bytes::from_static(&[0x00, 0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x05, 0x00, 0x00, 0x01, 0x00]),
            )
    }

    fn parse(info: Structure) -> (DecryptionMetadata, MediaBuffer) {
        let mut buffer = MediaBuffer::new([0u8; 320]).with_protection(info);
        let metadata = parse_decryption_metadata(&mut buffer);
        (metadata, buffer)
    }

    #[test]
    fn test_no_side_channel_is_clear() {
        let mut buffer = MediaBuffer::new(b"clear");
        assert!(parse_decryption_metadata(&mut buffer).is_clear());
        assert_eq!(buffer.data(), b"clear");
    }

    #[test]
    fn test_encrypted_sample() {
        let (metadata, buffer) = parse(encrypted_info());

        let DecryptionMetadata::Encrypted(sample) = metadata else {
            panic!("expected encrypted metadata, got {:?}", metadata);
        };
        assert_eq!(sample.key_id.as_ref(), KID);
        assert_eq!(sample.iv.as_ref(), IV);
        assert_eq!(
            sample.subsamples,
            vec![Subsample::new(16, 32), Subsample::new(5, 256)]
        );
        assert_eq!(sample.covered_len(), 309);
        assert!(buffer.has_protection_meta());
    }

    #[test]
    fn test_stream_encryption_events_removed() {
        let info = encrypted_info().with_field(FIELD_STREAM_ENCRYPTION_EVENTS, true);
        let (metadata, buffer) = parse(info);

        assert!(metadata.is_valid());
        let meta = buffer.protection_meta().unwrap();
        assert!(!meta.info.has_field(FIELD_STREAM_ENCRYPTION_EVENTS));
    }

    #[test]
    fn test_zero_iv_size_is_clear_and_stripped() {
        let mut info = encrypted_info();
        info.set(FIELD_IV_SIZE, 0u32);
        let (metadata, buffer) = parse(info);

        assert!(metadata.is_clear());
        assert!(!buffer.has_protection_meta());
    }

    #[test]
    fn test_not_encrypted_flag_is_clear_and_stripped() {
        let mut info = encrypted_info();
        info.set(FIELD_ENCRYPTED, false);
        let (metadata, buffer) = parse(info);

        assert!(metadata.is_clear());
        assert!(!buffer.has_protection_meta());
    }

    #[test]
    fn test_zero_subsample_count_is_invalid() {
        let mut info = encrypted_info();
        info.set(FIELD_SUBSAMPLE_COUNT, 0u32);
        let (metadata, buffer) = parse(info);

        assert!(matches!(metadata, DecryptionMetadata::Invalid(_)));
        assert!(buffer.has_protection_meta());
    }

    #[test]
    fn test_missing_fields_are_invalid() {
        for field in [FIELD_KID, FIELD_IV, FIELD_SUBSAMPLES, FIELD_IV_SIZE, FIELD_ENCRYPTED] {
            let mut info = encrypted_info();
            info.remove_field(field);
            let (metadata, _) = parse(info);
            assert!(
                matches!(metadata, DecryptionMetadata::Invalid(_)),
                "removing {} gave {:?}",
                field,
                metadata
            );
        }
    }

    #[test]
    fn test_wrongly_typed_iv_size_is_invalid() {
        let mut info = encrypted_info();
        info.set(FIELD_IV_SIZE, "8");
        let (metadata, _) = parse(info);
        assert!(matches!(metadata, DecryptionMetadata::Invalid(_)));
    }

    #[test]
    fn test_short_subsample_buffer_is_invalid() {
        let mut info = encrypted_info();
        info.set(FIELD_SUBSAMPLE_COUNT, 3u32);
        let (metadata, _) = parse(info);

        let DecryptionMetadata::Invalid(reason) = metadata else {
            panic!("expected invalid metadata");
        };
        assert!(reason.contains("12 bytes"));
    }

    #[test]
    fn test_iv_size_mismatch_is_invalid() {
        let mut info = encrypted_info();
        info.set(FIELD_IV_SIZE, 16u32);
        let (metadata, _) = parse(info);
        assert!(matches!(metadata, DecryptionMetadata::Invalid(_)));
    }

    #[test]
    fn test_layout_past_buffer_end_is_invalid() {
        let mut info = encrypted_info();
        info.set(FIELD_SUBSAMPLE_COUNT, 1u32);
        info.set(FIELD_SUBSAMPLES, pack_subsamples(&[Subsample::new(10, 1_000_000)]));

        let mut buffer = MediaBuffer::new([0u8; 4]).with_protection(info);
        let DecryptionMetadata::Invalid(reason) = parse_decryption_metadata(&mut buffer) else {
            panic!("expected invalid metadata");
        };
        assert!(reason.contains("4 byte buffer"), "{reason}");
        assert!(buffer.has_protection_meta());
    }

    #[test]
    fn test_layout_shorter_than_buffer_is_valid() {
        let mut info = encrypted_info();
        info.set(FIELD_SUBSAMPLE_COUNT, 1u32);
        info.set(FIELD_SUBSAMPLES, pack_subsamples(&[Subsample::new(2, 2)]));

        let mut buffer = MediaBuffer::new([0u8; 4]).with_protection(info);
        assert!(parse_decryption_metadata(&mut buffer).is_valid());

        let mut info = encrypted_info();
        info.set(FIELD_SUBSAMPLE_COUNT, 1u32);
        info.set(FIELD_SUBSAMPLES, pack_subsamples(&[Subsample::new(1, 1)]));
        let mut buffer = MediaBuffer::new([0u8; 4]).with_protection(info);
        let DecryptionMetadata::Encrypted(sample) = parse_decryption_metadata(&mut buffer) else {
            panic!("expected encrypted metadata");
        };
        assert_eq!(sample.subsample_count(), 1);
        assert_eq!(sample.covered_len(), 2);
    }

    #[test]
    fn test_pack_matches_wire_layout() {
        let packed = pack_subsamples(&[Subsample::new(0x0102, 0x0304_0506)]);
        assert_eq!(packed.as_ref(), &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

        let unpacked = unpack_subsamples(&packed, 1).unwrap();
        assert_eq!(unpacked, vec![Subsample::new(0x0102, 0x0304_0506)]);
    }
}
