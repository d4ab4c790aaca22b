//! Events consumed by the call runtime.

use palaver_common::models::{MediaKind, UserId};
use tokio::sync::{mpsc, oneshot};

use crate::error::CallError;
use crate::media::{LocalStreamHandle, MediaSession, RemoteStreamHandle};
use crate::signaling::SignalData;
use crate::state::CallSnapshot;

/// Everything that can move the call state machine.
#[derive(Debug)]
pub enum CallEvent {
    // === User actions ===
    /// Start a call to `target`.
    Start { target: UserId, kind: MediaKind },

    /// Answer the ringing inbound call.
    Answer,

    /// Hang up whatever is in progress.
    Hangup,

    // === Relay ===
    /// A call signal from another user.
    Signal { from: UserId, signal: SignalData },

    // === Media ===
    /// A capture request finished.
    LocalMedia {
        attempt: u64,
        result: Result<LocalStreamHandle, CallError>,
    },

    /// The media library received a direct session dialed by someone else.
    InboundSession(Box<dyn MediaSession>),

    /// Activity on the direct session of call `attempt`.
    Session { attempt: u64, event: SessionEvent },

    /// The media library itself failed (not tied to one session).
    MediaFailure(String),

    // === Runtime control ===
    Snapshot(oneshot::Sender<CallSnapshot>),

    Shutdown,
}

/// Activity on a direct media session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Remote media is available for playback.
    RemoteStream(RemoteStreamHandle),
    Closed,
    Error(String),
}

/// Handed to media adapters so they can report session activity.
///
/// Tagged with the call attempt it belongs to; reports about a call that is
/// already over are dropped by the controller. Holds only a weak reference
/// to the runtime queue, so a lingering adapter never keeps it alive.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    attempt: u64,
    tx: mpsc::WeakUnboundedSender<CallEvent>,
}

impl SessionEvents {
    pub(crate) fn new(attempt: u64, tx: mpsc::WeakUnboundedSender<CallEvent>) -> Self {
        Self { attempt, tx }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn remote_stream(&self, stream: RemoteStreamHandle) {
        self.emit(SessionEvent::RemoteStream(stream));
    }

    pub fn closed(&self) {
        self.emit(SessionEvent::Closed);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Error(message.into()));
    }

    fn emit(&self, event: SessionEvent) {
        let Some(tx) = self.tx.upgrade() else {
            tracing::debug!(attempt = self.attempt, "Call runtime gone, dropping session event");
            return;
        };
        let _ = tx.send(CallEvent::Session {
            attempt: self.attempt,
            event,
        });
    }
}
