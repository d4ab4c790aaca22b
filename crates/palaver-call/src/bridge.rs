//! Signaling bridge: maps call intents onto relay `call_user` frames and
//! relay frames back onto call events.
//!
//! Signals are addressed by logical user identity. The relay never sees a
//! media session identity except inside a `response_id` payload.

use std::sync::Arc;

use palaver_common::models::{MediaKind, UserId};
use palaver_common::relay::IncomingCallSignal;

use crate::error::CallResult;
use crate::event::CallEvent;
use crate::media::SessionId;
use crate::signaling::SignalData;

/// Outbound half of the relay, as seen by the call layer.
pub trait SignalSink: Send + Sync {
    fn send_signal(&self, to: UserId, signal: &SignalData) -> CallResult<()>;
}

#[derive(Clone)]
pub struct SignalingBridge {
    sink: Arc<dyn SignalSink>,
}

impl SignalingBridge {
    pub fn new(sink: Arc<dyn SignalSink>) -> Self {
        Self { sink }
    }

    /// `request_id`: announce a call.
    pub fn request(&self, to: UserId, kind: MediaKind) -> CallResult<()> {
        self.send(to, SignalData::request(kind))
    }

    /// `response_id`: hand our session identity to the caller.
    pub fn respond(&self, to: UserId, session: &SessionId) -> CallResult<()> {
        self.send(
            to,
            SignalData::ResponseId {
                peer_id: session.clone(),
            },
        )
    }

    /// `end_call`: hang up (or refuse).
    pub fn end(&self, to: UserId) -> CallResult<()> {
        self.send(to, SignalData::EndCall)
    }

    fn send(&self, to: UserId, signal: SignalData) -> CallResult<()> {
        tracing::debug!(to, signal = signal.kind(), "Sending call signal");
        self.sink.send_signal(to, &signal)
    }

    /// Decode an inbound relay envelope into a call event.
    pub fn decode(incoming: IncomingCallSignal) -> CallResult<CallEvent> {
        let signal: SignalData = serde_json::from_value(incoming.signal)?;
        tracing::debug!(
            from = incoming.from,
            from_username = ?incoming.from_username,
            signal = signal.kind(),
            "Received call signal"
        );
        Ok(CallEvent::Signal {
            from: incoming.from,
            signal,
        })
    }
}
