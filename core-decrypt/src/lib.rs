//! # CENC Decryption Module
//!
//! Inline decryption of Common Encryption (CENC) buffers for a streaming
//! pipeline.
//!
//! ## Overview
//!
//! This module handles:
//! - Parsing in-band protection signals and per-buffer crypto side-channels
//! - DRM system and session setup through the host's [`DrmEngine`](bridge_traits::DrmEngine)
//! - License challenge delivery through the host's [`ExchangeFactory`](bridge_traits::ExchangeFactory)
//! - Blocking decrypt gated on key usability
//! - Capability advertisement for format negotiation
//!
//! ## Usage
//!
//! ```ignore
//! use core_decrypt::{CencDecrypt, DecryptorConfig, FlowReturn, PipelineEvent};
//!
//! let runtime = RuntimeConfig::builder()
//!     .drm_engine(engine)
//!     .exchange_factory(factory)
//!     .build()?;
//! let element = CencDecrypt::new(&runtime, DecryptorConfig::default())?;
//!
//! element.sink_event(PipelineEvent::Protection(signal));
//! if element.transform_ip(&mut buffer) != FlowReturn::Ok {
//!     // drop or report the buffer
//! }
//! ```

pub mod buffer;
pub mod callbacks;
pub mod capabilities;
pub mod challenge;
pub mod config;
pub mod decryptor;
pub mod element;
pub mod error;
pub mod key_systems;
pub mod license;
pub mod metadata;
pub mod protection;
pub mod readiness;
pub mod structure;
pub mod traits;

pub use buffer::{BufferView, MediaBuffer, ProtectionMeta};
pub use capabilities::{Caps, PadDirection};
pub use config::{DecryptorConfig, KeySystemEntry};
pub use decryptor::{SessionDecryptor, SessionState};
pub use element::{CencDecrypt, DecryptStatsSnapshot, EventHandling, FlowReturn, PipelineEvent};
pub use error::{DecryptError, Result};
pub use key_systems::KeySystemRegistry;
pub use metadata::{parse_decryption_metadata, DecryptionMetadata, EncryptedSample};
pub use protection::{parse_protection_event, ProtectionEvent, ProtectionMetadata};
pub use structure::{FieldValue, Structure};
pub use traits::{DecryptOutcome, Decryptor};
