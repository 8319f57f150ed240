//! # Engine Callback Adapter
//!
//! DRM engines report session progress through [`SessionCallbacks`] on their
//! own notification threads. [`EngineCallbacks`] turns each call into a
//! [`SessionEvent`] and hands it to the session engine that owns the session.
//!
//! The adapter only holds a weak reference to its target. Notifications that
//! arrive after the session engine has been dropped are discarded.

use bridge_traits::{DrmSession, SessionCallbacks};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Message form of a [`SessionCallbacks`] invocation.
pub enum SessionEvent {
    /// A license challenge must be delivered to `url`.
    Challenge {
        session: Arc<dyn DrmSession>,
        url: String,
        challenge: Vec<u8>,
    },
    /// Status of a single key changed.
    KeyUpdated { key_id: Vec<u8> },
    /// Engine-reported error.
    Error { message: String },
    /// A batch of key status updates has been applied.
    KeysUpdated,
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::Challenge { url, challenge, .. } => f
                .debug_struct("Challenge")
                .field("url", url)
                .field("challenge_len", &challenge.len())
                .finish(),
            SessionEvent::KeyUpdated { key_id } => f
                .debug_struct("KeyUpdated")
                .field("key_id", &hex::encode(key_id))
                .finish(),
            SessionEvent::Error { message } => {
                f.debug_struct("Error").field("message", message).finish()
            }
            SessionEvent::KeysUpdated => f.write_str("KeysUpdated"),
        }
    }
}

/// Receiver of session events.
pub trait SessionEventSink: Send + Sync {
    fn handle_event(&self, event: SessionEvent);
}

/// [`SessionCallbacks`] implementation registered with the DRM engine.
pub struct EngineCallbacks {
    target: Weak<dyn SessionEventSink>,
}

impl EngineCallbacks {
    pub fn new(target: Weak<dyn SessionEventSink>) -> Self {
        Self { target }
    }

    fn dispatch(&self, event: SessionEvent) {
        match self.target.upgrade() {
            Some(target) => target.handle_event(event),
            None => trace!(?event, "Session engine gone, dropping event"),
        }
    }
}

impl SessionCallbacks for EngineCallbacks {
    fn process_challenge(&self, session: Arc<dyn DrmSession>, url: &str, challenge: &[u8]) {
        self.dispatch(SessionEvent::Challenge {
            session,
            url: url.to_string(),
            challenge: challenge.to_vec(),
        });
    }

    fn key_update(&self, key_id: &[u8]) {
        self.dispatch(SessionEvent::KeyUpdated {
            key_id: key_id.to_vec(),
        });
    }

    fn error_message(&self, message: &str) {
        self.dispatch(SessionEvent::Error {
            message: message.to_string(),
        });
    }

    fn keys_updated(&self) {
        self.dispatch(SessionEvent::KeysUpdated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl SessionEventSink for RecordingSink {
        fn handle_event(&self, event: SessionEvent) {
            self.events.lock().push(format!("{:?}", event));
        }
    }

    #[test]
    fn test_callbacks_become_events() {
        let sink = Arc::new(RecordingSink::default());
        let weak = Arc::downgrade(&sink);
        let target: Weak<dyn SessionEventSink> = weak;
        let callbacks = EngineCallbacks::new(target);

        callbacks.key_update(&[0xab, 0xcd]);
        callbacks.error_message("provisioning required");
        callbacks.keys_updated();

        let events = sink.events.lock();
        assert_eq!(
            *events,
            vec![
                "KeyUpdated { key_id: \"abcd\" }".to_string(),
                "Error { message: \"provisioning required\" }".to_string(),
                "KeysUpdated".to_string(),
            ]
        );
    }

    #[test]
    fn test_events_after_drop_are_discarded() {
        let sink = Arc::new(RecordingSink::default());
        let weak = Arc::downgrade(&sink);
        let target: Weak<dyn SessionEventSink> = weak;
        let callbacks = EngineCallbacks::new(target);
        drop(sink);

        // Must not panic
        callbacks.keys_updated();
        callbacks.error_message("late");
    }
}
