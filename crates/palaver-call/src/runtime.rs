//! Call runtime: the actor task that owns the [`CallController`].
//!
//! Everything that can move the call (user actions, relay signals, capture
//! results, media-session callbacks) is posted to one unbounded queue and
//! applied in order. [`CallHandle`] is the cheap, cloneable front door.

use std::sync::Arc;

use palaver_common::models::{MediaKind, UserId};
use palaver_common::relay::IncomingCallSignal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bridge::{SignalSink, SignalingBridge};
use crate::controller::CallController;
use crate::error::{CallError, CallResult};
use crate::event::CallEvent;
use crate::media::{DirectMedia, MediaDevices, MediaSession};
use crate::state::CallSnapshot;
use crate::view::CallObserver;

pub struct CallRuntime;

impl CallRuntime {
    /// Spawn the call task for `local_user` and return a handle to it.
    ///
    /// The task stops when [`CallHandle::shutdown`] is called or every handle
    /// is dropped; either way the active call is released without signaling.
    pub fn spawn(
        local_user: UserId,
        sink: Arc<dyn SignalSink>,
        devices: Arc<dyn MediaDevices>,
        media: Arc<dyn DirectMedia>,
        observers: Vec<Arc<dyn CallObserver>>,
    ) -> (CallHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel::<CallEvent>();
        let mut controller = CallController::new(
            local_user,
            SignalingBridge::new(sink),
            devices,
            media,
            tx.downgrade(),
        );
        for observer in observers {
            controller.subscribe(observer);
        }

        let task = tokio::spawn(async move {
            run_call_loop(local_user, controller, rx).await;
            tracing::info!(user = local_user, "Call runtime shut down");
        });

        (CallHandle { tx }, task)
    }
}

async fn run_call_loop(
    local_user: UserId,
    mut controller: CallController,
    mut rx: mpsc::UnboundedReceiver<CallEvent>,
) {
    tracing::debug!(user = local_user, "Call runtime started");
    while let Some(event) = rx.recv().await {
        match event {
            CallEvent::Shutdown => {
                tracing::info!(user = local_user, "Call runtime shutting down by command");
                controller.shutdown();
                return;
            }
            other => controller.handle(other),
        }
    }
    // Every handle dropped.
    controller.shutdown();
}

/// Handle to a running call task.
#[derive(Clone, Debug)]
pub struct CallHandle {
    tx: mpsc::UnboundedSender<CallEvent>,
}

impl CallHandle {
    pub fn start_call(&self, target: UserId, kind: MediaKind) -> CallResult<()> {
        self.post(CallEvent::Start { target, kind })
    }

    pub fn answer(&self) -> CallResult<()> {
        self.post(CallEvent::Answer)
    }

    pub fn end_call(&self) -> CallResult<()> {
        self.post(CallEvent::Hangup)
    }

    /// Feed a `call_user` frame received from the relay.
    ///
    /// Malformed signals are rejected here and never reach the controller.
    pub fn deliver_signal(&self, incoming: IncomingCallSignal) -> CallResult<()> {
        let event = SignalingBridge::decode(incoming)?;
        self.post(event)
    }

    /// Hand over a direct session the media library accepted from a caller.
    pub fn inbound_session(&self, session: Box<dyn MediaSession>) -> CallResult<()> {
        self.tx.send(CallEvent::InboundSession(session)).map_err(|e| {
            if let CallEvent::InboundSession(mut session) = e.0 {
                session.close();
            }
            CallError::RuntimeStopped
        })
    }

    /// Report a failure of the media library itself.
    pub fn media_error(&self, message: impl Into<String>) -> CallResult<()> {
        self.post(CallEvent::MediaFailure(message.into()))
    }

    pub async fn snapshot(&self) -> CallResult<CallSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.post(CallEvent::Snapshot(reply))?;
        rx.await.map_err(|_| CallError::RuntimeStopped)
    }

    pub fn shutdown(&self) -> CallResult<()> {
        self.post(CallEvent::Shutdown)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    fn post(&self, event: CallEvent) -> CallResult<()> {
        self.tx.send(event).map_err(|_| CallError::RuntimeStopped)
    }
}
