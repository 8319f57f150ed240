//! # Pipeline Adapter
//!
//! Host-facing side of the decryptor. [`CencDecrypt`] takes protection
//! signals and buffers from the host pipeline, hands them to a [`Decryptor`]
//! and maps the outcome to the pipeline's acknowledgement and flow-return
//! vocabulary. It also answers capability queries.
//!
//! ## Flow mapping
//!
//! | Decryptor result          | Pipeline result              |
//! |---------------------------|------------------------------|
//! | `handle_protection` Ok    | [`EventHandling::Accepted`]  |
//! | `handle_protection` Err   | [`EventHandling::Rejected`]  |
//! | `decrypt` Ok              | [`FlowReturn::Ok`]           |
//! | `decrypt` Err             | [`FlowReturn::NotSupported`] |

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use core_runtime::RuntimeConfig;
use tracing::{debug, error, warn};

use crate::buffer::MediaBuffer;
use crate::capabilities::{self, Caps, PadDirection};
use crate::config::DecryptorConfig;
use crate::decryptor::SessionDecryptor;
use crate::error::Result;
use crate::protection::ProtectionEvent;
use crate::traits::{DecryptOutcome, Decryptor};

/// Result of transforming a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowReturn {
    Ok,
    NotSupported,
}

impl FlowReturn {
    pub fn is_ok(&self) -> bool {
        matches!(self, FlowReturn::Ok)
    }
}

/// Event arriving on the sink pad.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// In-band protection signal for the track.
    Protection(ProtectionEvent),
    /// Any other event, identified by name. Passed through untouched.
    Other(String),
}

/// What the element did with a sink event.
#[derive(Debug, Clone)]
pub enum EventHandling {
    /// Protection signal acted on (or already acted on).
    Accepted,
    /// Protection signal refused. The host should treat the track as
    /// undecryptable.
    Rejected,
    /// Not handled here; forward downstream.
    Forward(PipelineEvent),
}

/// Counters for protection signals and buffers seen by the element.
#[derive(Debug, Default)]
pub struct DecryptStats {
    protection_accepted: AtomicU64,
    protection_rejected: AtomicU64,
    buffers_clear: AtomicU64,
    buffers_decrypted: AtomicU64,
    buffers_rejected: AtomicU64,
}

/// Point-in-time copy of [`DecryptStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecryptStatsSnapshot {
    pub protection_accepted: u64,
    pub protection_rejected: u64,
    pub buffers_clear: u64,
    pub buffers_decrypted: u64,
    pub buffers_rejected: u64,
}

impl DecryptStats {
    pub fn snapshot(&self) -> DecryptStatsSnapshot {
        DecryptStatsSnapshot {
            protection_accepted: self.protection_accepted.load(Ordering::Relaxed),
            protection_rejected: self.protection_rejected.load(Ordering::Relaxed),
            buffers_clear: self.buffers_clear.load(Ordering::Relaxed),
            buffers_decrypted: self.buffers_decrypted.load(Ordering::Relaxed),
            buffers_rejected: self.buffers_rejected.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// In-place CENC decrypt element.
pub struct CencDecrypt {
    decryptor: Arc<dyn Decryptor>,
    sink_caps: Caps,
    src_caps: Caps,
    stats: DecryptStats,
}

impl CencDecrypt {
    /// Build an element backed by a [`SessionDecryptor`] on the runtime's
    /// DRM engine and exchange factory.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::Config`](crate::DecryptError::Config) if
    /// `config` does not validate.
    pub fn new(runtime: &RuntimeConfig, config: DecryptorConfig) -> Result<Self> {
        let decryptor = SessionDecryptor::from_runtime(runtime, config.clone())?;
        Self::with_decryptor(Arc::new(decryptor), &config)
    }

    /// Build an element around an existing decryptor.
    ///
    /// `config` determines the advertised capabilities and must describe the
    /// same key systems the decryptor resolves.
    pub fn with_decryptor(decryptor: Arc<dyn Decryptor>, config: &DecryptorConfig) -> Result<Self> {
        config.validate()?;
        let registry = config.registry()?;

        Ok(Self {
            decryptor,
            sink_caps: capabilities::sink_caps(&registry, &config.clear_content_types),
            src_caps: capabilities::src_caps(&config.clear_content_types),
            stats: DecryptStats::default(),
        })
    }

    pub fn decryptor(&self) -> &Arc<dyn Decryptor> {
        &self.decryptor
    }

    /// Formats accepted on the sink pad.
    pub fn sink_caps(&self) -> &Caps {
        &self.sink_caps
    }

    /// Formats produced on the source pad.
    pub fn src_caps(&self) -> &Caps {
        &self.src_caps
    }

    pub fn transform_caps(
        &self,
        direction: PadDirection,
        caps: &Caps,
        filter: Option<&Caps>,
    ) -> Caps {
        let result = capabilities::transform_caps(direction, caps, filter);
        debug!(?direction, from = caps.len(), to = result.len(), "Transformed caps");
        result
    }

    pub fn stats(&self) -> DecryptStatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle an event arriving on the sink pad.
    pub fn sink_event(&self, event: PipelineEvent) -> EventHandling {
        let protection = match event {
            PipelineEvent::Protection(protection) => protection,
            other => return EventHandling::Forward(other),
        };

        match self.decryptor.handle_protection(&protection) {
            Ok(()) => {
                DecryptStats::bump(&self.stats.protection_accepted);
                EventHandling::Accepted
            }
            Err(e) => {
                DecryptStats::bump(&self.stats.protection_rejected);
                if e.is_fatal() {
                    error!(error = %e, "Protection setup failed, track cannot be decrypted");
                } else {
                    warn!(error = %e, "Protection signal rejected");
                }
                EventHandling::Rejected
            }
        }
    }

    /// Decrypt `buffer` in place.
    ///
    /// Blocks the calling streaming thread while the buffer's key is not yet
    /// usable.
    pub fn transform_ip(&self, buffer: &mut MediaBuffer) -> FlowReturn {
        match self.decryptor.decrypt(buffer) {
            Ok(DecryptOutcome::Clear) => {
                DecryptStats::bump(&self.stats.buffers_clear);
                FlowReturn::Ok
            }
            Ok(DecryptOutcome::Decrypted) => {
                DecryptStats::bump(&self.stats.buffers_decrypted);
                FlowReturn::Ok
            }
            Err(e) => {
                DecryptStats::bump(&self.stats.buffers_rejected);
                debug!(error = %e, len = buffer.len(), "Buffer not decrypted");
                FlowReturn::NotSupported
            }
        }
    }
}
