//! Call lifecycle controller: the state machine behind every call.
//!
//! ```text
//!            start                 media ok              response_id
//!   Idle ──────────▶ AwaitingLocalMedia ────▶ RingingOutbound ──────▶ Connected
//!    │                      ▲                                           ▲
//!    │ request_id           │ answer            inbound session + media │
//!    └──────────▶ RingingInbound ─────────────────────────────────────┘
//!
//!   any non-idle ── end_call / hangup / session closed or failed ──▶ Ended ─▶ Idle
//! ```
//!
//! The controller is driven one [`CallEvent`] at a time by the runtime task.
//! It never blocks: media capture runs on a spawned task that posts its
//! result back to the queue tagged with the call attempt, so a capture that
//! completes after the call is gone is recognised and released.

use std::sync::Arc;

use palaver_common::models::{MediaKind, UserId};
use tokio::sync::mpsc;

use crate::bridge::SignalingBridge;
use crate::error::CallError;
use crate::event::{CallEvent, SessionEvent, SessionEvents};
use crate::media::{DirectMedia, LocalStreamHandle, MediaDevices, MediaSession, SessionId};
use crate::signaling::SignalData;
use crate::state::{ActiveCall, CallDirection, CallPhase, CallSnapshot};
use crate::view::{CallObserver, CallView};

pub struct CallController {
    local_user: UserId,
    bridge: SignalingBridge,
    devices: Arc<dyn MediaDevices>,
    media: Arc<dyn DirectMedia>,
    observers: Vec<Arc<dyn CallObserver>>,
    /// Queue the controller itself is fed from.
    events: mpsc::WeakUnboundedSender<CallEvent>,
    call: Option<ActiveCall>,
    next_attempt: u64,
}

impl CallController {
    pub fn new(
        local_user: UserId,
        bridge: SignalingBridge,
        devices: Arc<dyn MediaDevices>,
        media: Arc<dyn DirectMedia>,
        events: mpsc::WeakUnboundedSender<CallEvent>,
    ) -> Self {
        Self {
            local_user,
            bridge,
            devices,
            media,
            observers: Vec::new(),
            events,
            call: None,
            next_attempt: 1,
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn CallObserver>) {
        self.observers.push(observer);
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.call
            .as_ref()
            .map(ActiveCall::snapshot)
            .unwrap_or_else(CallSnapshot::idle)
    }

    pub fn phase(&self) -> CallPhase {
        self.call.as_ref().map_or(CallPhase::Idle, |c| c.phase)
    }

    /// Apply one event.
    pub fn handle(&mut self, event: CallEvent) {
        match event {
            CallEvent::Start { target, kind } => self.start_call(target, kind),
            CallEvent::Answer => self.answer(),
            CallEvent::Hangup => self.hang_up(),
            CallEvent::Signal { from, signal } => self.on_signal(from, signal),
            CallEvent::LocalMedia { attempt, result } => self.on_local_media(attempt, result),
            CallEvent::InboundSession(session) => self.on_inbound_session(session),
            CallEvent::Session { attempt, event } => self.on_session_event(attempt, event),
            CallEvent::MediaFailure(message) => self.on_media_failure(message),
            CallEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            CallEvent::Shutdown => self.shutdown(),
        }
    }

    /// Release everything without signaling. Used when the runtime stops.
    pub fn shutdown(&mut self) {
        if self.call.is_some() {
            tracing::info!("Call runtime stopping, releasing active call");
            self.teardown();
        }
    }

    // ── User actions ──────────────────────────────────────────────────────────

    fn start_call(&mut self, target: UserId, kind: MediaKind) {
        if let Some(call) = &self.call {
            self.alert(&CallError::Busy {
                partner: call.partner,
            });
            return;
        }
        if target == self.local_user {
            self.alert(&CallError::SelfCall);
            return;
        }

        let attempt = self.next_attempt();
        tracing::info!(partner = target, ?kind, attempt, "Starting call");
        self.call = Some(ActiveCall::new(
            attempt,
            target,
            kind,
            CallDirection::Outbound,
            CallPhase::AwaitingLocalMedia,
        ));
        self.notify();
        self.spawn_capture(attempt, kind);
    }

    fn answer(&mut self) {
        let Some(call) = self.call.as_mut() else {
            tracing::debug!("Answer with no call, ignoring");
            return;
        };
        if call.phase != CallPhase::RingingInbound {
            tracing::debug!(phase = ?call.phase, "Answer outside ringing-inbound, ignoring");
            return;
        }

        tracing::info!(partner = call.partner, kind = ?call.kind, "Answering call");
        call.phase = CallPhase::AwaitingLocalMedia;
        let (attempt, kind) = (call.attempt, call.kind);
        self.notify();
        self.spawn_capture(attempt, kind);
    }

    fn hang_up(&mut self) {
        let Some(call) = &self.call else {
            tracing::debug!("Hang up with no call, ignoring");
            return;
        };
        let partner = call.partner;
        tracing::info!(partner, phase = ?call.phase, "Ending call");
        if let Err(e) = self.bridge.end(partner) {
            tracing::warn!(partner, "Failed to send end_call: {e}");
        }
        self.teardown();
    }

    // ── Relay signals ─────────────────────────────────────────────────────────

    fn on_signal(&mut self, from: UserId, signal: SignalData) {
        match signal {
            SignalData::RequestId { is_video } => {
                self.on_request(from, MediaKind::from_video_flag(is_video))
            }
            SignalData::ResponseId { peer_id } => self.on_response(from, peer_id),
            SignalData::EndCall => self.on_remote_end(from),
        }
    }

    fn on_request(&mut self, from: UserId, kind: MediaKind) {
        if let Some(call) = &self.call {
            if call.partner == from {
                if call.phase == CallPhase::RingingInbound {
                    tracing::debug!(from, "Duplicate call request, ignoring");
                    return;
                }
                // The partner redialed, so their side of this call is gone.
                tracing::warn!(from, phase = ?call.phase, "Call request from current partner, ending call");
                self.hang_up();
                return;
            }
            tracing::warn!(from, partner = call.partner, "Call request while busy, refusing");
            self.refuse(from);
            return;
        }

        let Some(session_id) = self.media.session_id() else {
            tracing::warn!(from, "{}", CallError::NoSessionIdentity);
            self.refuse(from);
            return;
        };

        let attempt = self.next_attempt();
        tracing::info!(from, ?kind, attempt, "Incoming call");
        self.call = Some(ActiveCall::new(
            attempt,
            from,
            kind,
            CallDirection::Inbound,
            CallPhase::RingingInbound,
        ));

        // Acknowledge right away; the user's answer only gates capture and
        // accepting the direct session.
        if let Err(e) = self.bridge.respond(from, &session_id) {
            tracing::error!(from, "Failed to send response_id: {e}");
            self.teardown();
            return;
        }
        self.notify();
    }

    fn on_response(&mut self, from: UserId, peer_id: SessionId) {
        let Some(call) = self.call.as_mut() else {
            tracing::debug!(from, "response_id with no call, ignoring");
            return;
        };
        if call.partner != from || call.phase != CallPhase::RingingOutbound {
            tracing::debug!(from, phase = ?call.phase, "Unexpected response_id, ignoring");
            return;
        }
        let Some(local) = call.local_stream.clone() else {
            tracing::debug!(from, "response_id before local media, ignoring");
            return;
        };

        tracing::info!(from, peer = %peer_id, "Dialing direct session");
        let events = SessionEvents::new(call.attempt, self.events.clone());
        match self.media.call(&peer_id, local, events) {
            Ok(session) => {
                call.session = Some(session);
                call.phase = CallPhase::Connected;
                self.notify();
            }
            Err(e) => self.fail(e),
        }
    }

    fn on_remote_end(&mut self, from: UserId) {
        match &self.call {
            Some(call) if call.partner == from => {
                tracing::info!(from, phase = ?call.phase, "Partner ended the call");
                self.teardown();
            }
            Some(call) => {
                tracing::debug!(from, partner = call.partner, "end_call from non-partner, ignoring");
            }
            None => tracing::debug!(from, "end_call with no call, ignoring"),
        }
    }

    // ── Media ─────────────────────────────────────────────────────────────────

    fn on_local_media(&mut self, attempt: u64, result: Result<LocalStreamHandle, CallError>) {
        let current = self
            .call
            .as_mut()
            .filter(|c| c.attempt == attempt && c.phase == CallPhase::AwaitingLocalMedia);
        let Some(call) = current else {
            tracing::debug!(attempt, "Stale capture result, releasing");
            if let Ok(stream) = result {
                stream.stop();
            }
            return;
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(attempt, "Local media capture failed: {e}");
                if call.direction == CallDirection::Inbound {
                    // The caller already has our session identity; don't leave it ringing.
                    let partner = call.partner;
                    if let Err(e) = self.bridge.end(partner) {
                        tracing::warn!(partner, "Failed to send end_call: {e}");
                    }
                }
                self.fail(e);
                return;
            }
        };

        call.local_stream = Some(stream.clone());
        match call.direction {
            CallDirection::Outbound => {
                let (partner, kind) = (call.partner, call.kind);
                if let Err(e) = self.bridge.request(partner, kind) {
                    tracing::error!(partner, "Failed to send request_id: {e}");
                    self.fail(e);
                    return;
                }
                if let Some(call) = self.call.as_mut() {
                    call.phase = CallPhase::RingingOutbound;
                }
                self.notify();
            }
            CallDirection::Inbound => match call.pending_inbound.take() {
                Some(session) => self.accept_inbound(session, stream),
                None => {
                    tracing::debug!(attempt, "Local media ready, waiting for inbound session");
                    self.notify();
                }
            },
        }
    }

    fn on_inbound_session(&mut self, mut session: Box<dyn MediaSession>) {
        let acceptable = self.call.as_ref().is_some_and(|c| {
            c.direction == CallDirection::Inbound
                && c.session.is_none()
                && c.pending_inbound.is_none()
                && matches!(
                    c.phase,
                    CallPhase::RingingInbound | CallPhase::AwaitingLocalMedia
                )
        });
        if !acceptable {
            tracing::warn!(phase = ?self.phase(), "Unexpected inbound session, closing");
            session.close();
            return;
        }

        let Some(call) = self.call.as_mut() else {
            return;
        };
        if call.phase == CallPhase::AwaitingLocalMedia {
            if let Some(stream) = call.local_stream.clone() {
                self.accept_inbound(session, stream);
                return;
            }
        }
        tracing::debug!(partner = call.partner, "Inbound session parked until answered");
        call.pending_inbound = Some(session);
    }

    fn accept_inbound(&mut self, mut session: Box<dyn MediaSession>, stream: LocalStreamHandle) {
        let Some(call) = self.call.as_mut() else {
            session.close();
            return;
        };
        let events = SessionEvents::new(call.attempt, self.events.clone());
        match session.answer(stream, events) {
            Ok(()) => {
                tracing::info!(partner = call.partner, "Inbound session accepted");
                call.session = Some(session);
                call.phase = CallPhase::Connected;
                self.notify();
            }
            Err(e) => {
                session.close();
                self.fail(e);
            }
        }
    }

    fn on_session_event(&mut self, attempt: u64, event: SessionEvent) {
        let Some(call) = self
            .call
            .as_mut()
            .filter(|c| c.attempt == attempt && c.session.is_some())
        else {
            tracing::debug!(attempt, ?event, "Session event for a finished call, ignoring");
            return;
        };

        match event {
            SessionEvent::RemoteStream(stream) => {
                tracing::info!(partner = call.partner, video = stream.has_video(), "Remote stream attached");
                call.remote_stream = Some(stream);
                call.phase = CallPhase::Connected;
                self.notify();
            }
            SessionEvent::Closed => {
                tracing::info!(partner = call.partner, "Direct session closed");
                self.teardown();
            }
            SessionEvent::Error(message) => {
                tracing::error!(partner = call.partner, "Direct session error: {message}");
                self.fail(CallError::Session(message));
            }
        }
    }

    fn on_media_failure(&mut self, message: String) {
        tracing::error!("Media library error: {message}");
        let err = CallError::Session(message);
        if self.call.is_some() {
            self.fail(err);
        } else {
            self.alert(&err);
        }
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn next_attempt(&mut self) -> u64 {
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        attempt
    }

    fn spawn_capture(&self, attempt: u64, kind: MediaKind) {
        let Some(tx) = self.events.upgrade() else {
            tracing::debug!(attempt, "Call runtime gone, not capturing");
            return;
        };
        let devices = Arc::clone(&self.devices);
        tokio::spawn(async move {
            let result = devices.capture(kind).await;
            if let Err(tokio::sync::mpsc::error::SendError(CallEvent::LocalMedia {
                result: Ok(stream),
                ..
            })) = tx.send(CallEvent::LocalMedia { attempt, result })
            {
                stream.stop();
            }
        });
    }

    fn refuse(&self, to: UserId) {
        if let Err(e) = self.bridge.end(to) {
            tracing::warn!(to, "Failed to refuse call: {e}");
        }
    }

    /// Surface `err`, then end the call without signaling.
    fn fail(&mut self, err: CallError) {
        self.alert(&err);
        self.teardown();
    }

    /// Release resources, report `Ended`, then `Idle`.
    fn teardown(&mut self) {
        let Some(mut call) = self.call.take() else {
            return;
        };
        call.release();
        call.phase = CallPhase::Ended;
        tracing::info!(partner = call.partner, attempt = call.attempt, "Call ended");
        self.publish(&call.snapshot());
        self.publish(&CallSnapshot::idle());
    }

    fn notify(&self) {
        self.publish(&self.snapshot());
    }

    fn publish(&self, snapshot: &CallSnapshot) {
        let view = CallView::render(snapshot);
        for observer in &self.observers {
            observer.on_view(&view);
        }
    }

    fn alert(&self, err: &CallError) {
        if err.is_user_visible() {
            let message = err.to_string();
            for observer in &self.observers {
                observer.on_alert(&message);
            }
        }
    }
}

#[cfg(test)]
mod tests;
