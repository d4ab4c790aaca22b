//! Call state: the single active-call record.
//!
//! At most one call exists at a time. `None` in the controller means idle;
//! every other phase lives on an [`ActiveCall`], which exclusively owns the
//! local capture and the direct session so both can be released together.

use palaver_common::models::{MediaKind, UserId};
use serde::Serialize;

use crate::media::{LocalStreamHandle, MediaSession, RemoteStreamHandle};

/// Lifecycle phase of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPhase {
    Idle,
    /// Waiting for the capture API (before dialing, or after answering).
    AwaitingLocalMedia,
    /// Request sent, waiting for the callee's session identity.
    RingingOutbound,
    /// Request received and acknowledged, waiting for the user to answer.
    RingingInbound,
    Connected,
    /// Terminal. Reported once, then the controller is idle again.
    Ended,
}

impl CallPhase {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Outbound,
    Inbound,
}

/// The live call record, owned by the controller.
#[derive(Debug)]
pub(crate) struct ActiveCall {
    /// Distinguishes this call from earlier ones in late-arriving events.
    pub attempt: u64,
    pub partner: UserId,
    pub kind: MediaKind,
    pub direction: CallDirection,
    pub phase: CallPhase,
    pub local_stream: Option<LocalStreamHandle>,
    /// Direct session that is dialed or answered.
    pub session: Option<Box<dyn MediaSession>>,
    /// Inbound session that arrived before we could answer it.
    pub pending_inbound: Option<Box<dyn MediaSession>>,
    pub remote_stream: Option<RemoteStreamHandle>,
}

impl ActiveCall {
    pub fn new(
        attempt: u64,
        partner: UserId,
        kind: MediaKind,
        direction: CallDirection,
        phase: CallPhase,
    ) -> Self {
        Self {
            attempt,
            partner,
            kind,
            direction,
            phase,
            local_stream: None,
            session: None,
            pending_inbound: None,
            remote_stream: None,
        }
    }

    /// Close every session and stop the capture.
    pub fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        if let Some(mut pending) = self.pending_inbound.take() {
            pending.close();
        }
        if let Some(stream) = self.local_stream.take() {
            stream.stop();
        }
        self.remote_stream = None;
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            phase: self.phase,
            partner: Some(self.partner),
            kind: Some(self.kind),
            direction: Some(self.direction),
            local_stream: self.local_stream.clone(),
            remote_stream: self.remote_stream.clone(),
        }
    }
}

/// Read-only view of the call, handed to observers and callers.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub phase: CallPhase,
    pub partner: Option<UserId>,
    pub kind: Option<MediaKind>,
    pub direction: Option<CallDirection>,
    pub local_stream: Option<LocalStreamHandle>,
    pub remote_stream: Option<RemoteStreamHandle>,
}

impl CallSnapshot {
    pub fn idle() -> Self {
        Self {
            phase: CallPhase::Idle,
            partner: None,
            kind: None,
            direction: None,
            local_stream: None,
            remote_stream: None,
        }
    }

    pub fn has_video(&self) -> bool {
        self.kind.is_some_and(MediaKind::has_video)
    }
}
