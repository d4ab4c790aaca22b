//! Test doubles for the media capabilities, the relay sink and the UI.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use palaver_common::models::{MediaKind, UserId};
use tokio::sync::mpsc;

use crate::bridge::{SignalSink, SignalingBridge};
use crate::controller::CallController;
use crate::error::{CallError, CallResult};
use crate::event::{CallEvent, SessionEvents};
use crate::media::{
    DirectMedia, LocalStream, LocalStreamHandle, MediaDevices, MediaSession, RemoteStream,
    SessionId,
};
use crate::signaling::SignalData;
use crate::view::{CallObserver, CallView};

#[derive(Debug)]
pub struct FakeStream {
    kind: MediaKind,
    stops: AtomicUsize,
}

impl FakeStream {
    pub fn is_stopped(&self) -> bool {
        self.stops.load(Ordering::SeqCst) > 0
    }
}

impl LocalStream for FakeStream {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct FakeRemote {
    pub video: bool,
}

impl RemoteStream for FakeRemote {
    fn has_video(&self) -> bool {
        self.video
    }
}

/// Capture API that grants or denies every request and keeps what it handed out.
#[derive(Default)]
pub struct FakeDevices {
    deny: AtomicBool,
    captured: Mutex<Vec<Arc<FakeStream>>>,
}

impl FakeDevices {
    pub fn denying() -> Self {
        let devices = Self::default();
        devices.deny.store(true, Ordering::SeqCst);
        devices
    }

    pub fn captured(&self) -> Vec<Arc<FakeStream>> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    async fn capture(&self, kind: MediaKind) -> CallResult<LocalStreamHandle> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(CallError::MediaAccessDenied("Permission denied".into()));
        }
        let stream = Arc::new(FakeStream {
            kind,
            stops: AtomicUsize::new(0),
        });
        self.captured.lock().unwrap().push(stream.clone());
        Ok(stream)
    }
}

/// Shared view into a [`FakeSession`] after the controller took ownership.
#[derive(Debug, Default)]
pub struct SessionProbe {
    closed: AtomicBool,
    answered: AtomicBool,
    events: Mutex<Option<SessionEvents>>,
}

impl SessionProbe {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_answered(&self) -> bool {
        self.answered.load(Ordering::SeqCst)
    }

    /// Events handle given to the session when dialed or answered.
    pub fn events(&self) -> SessionEvents {
        self.events
            .lock()
            .unwrap()
            .clone()
            .expect("session was never dialed or answered")
    }
}

#[derive(Debug)]
pub struct FakeSession {
    probe: Arc<SessionProbe>,
}

impl FakeSession {
    pub fn inbound() -> (Box<dyn MediaSession>, Arc<SessionProbe>) {
        let probe = Arc::new(SessionProbe::default());
        (
            Box::new(FakeSession {
                probe: probe.clone(),
            }),
            probe,
        )
    }
}

impl MediaSession for FakeSession {
    fn answer(&mut self, _local: LocalStreamHandle, events: SessionEvents) -> CallResult<()> {
        self.probe.answered.store(true, Ordering::SeqCst);
        *self.probe.events.lock().unwrap() = Some(events);
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// Media library with a fixed session identity that records every dial.
pub struct FakeMedia {
    session_id: Option<SessionId>,
    fail_dial: AtomicBool,
    dialed: Mutex<Vec<(SessionId, Arc<SessionProbe>)>>,
}

impl FakeMedia {
    pub fn new(session_id: Option<&str>) -> Self {
        Self {
            session_id: session_id.map(SessionId::new),
            fail_dial: AtomicBool::new(false),
            dialed: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_dials(&self) {
        self.fail_dial.store(true, Ordering::SeqCst);
    }

    pub fn dialed(&self) -> Vec<(SessionId, Arc<SessionProbe>)> {
        self.dialed.lock().unwrap().clone()
    }
}

impl DirectMedia for FakeMedia {
    fn session_id(&self) -> Option<SessionId> {
        self.session_id.clone()
    }

    fn call(
        &self,
        remote: &SessionId,
        _local: LocalStreamHandle,
        events: SessionEvents,
    ) -> CallResult<Box<dyn MediaSession>> {
        if self.fail_dial.load(Ordering::SeqCst) {
            return Err(CallError::Session("peer-unavailable".into()));
        }
        let probe = Arc::new(SessionProbe::default());
        *probe.events.lock().unwrap() = Some(events);
        self.dialed.lock().unwrap().push((remote.clone(), probe.clone()));
        Ok(Box::new(FakeSession { probe }))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(UserId, SignalData)>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<(UserId, SignalData)> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain what was sent since the last call.
    pub fn take(&self) -> Vec<(UserId, SignalData)> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }
}

impl SignalSink for RecordingSink {
    fn send_signal(&self, to: UserId, signal: &SignalData) -> CallResult<()> {
        self.sent.lock().unwrap().push((to, signal.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    views: Mutex<Vec<CallView>>,
    alerts: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn views(&self) -> Vec<CallView> {
        self.views.lock().unwrap().clone()
    }

    pub fn last(&self) -> CallView {
        self.views().last().cloned().expect("no view rendered yet")
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl CallObserver for RecordingObserver {
    fn on_view(&self, view: &CallView) {
        self.views.lock().unwrap().push(view.clone());
    }

    fn on_alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_owned());
    }
}

/// One party: a controller fed by hand from its own queue.
pub struct Party {
    pub user: UserId,
    pub controller: CallController,
    pub sink: Arc<RecordingSink>,
    pub devices: Arc<FakeDevices>,
    pub media: Arc<FakeMedia>,
    pub observer: Arc<RecordingObserver>,
    rx: mpsc::UnboundedReceiver<CallEvent>,
    _tx: mpsc::UnboundedSender<CallEvent>,
}

impl Party {
    pub fn new(user: UserId, session_id: &str) -> Self {
        Self::with(user, FakeDevices::default(), FakeMedia::new(Some(session_id)))
    }

    pub fn with(user: UserId, devices: FakeDevices, media: FakeMedia) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::default());
        let devices = Arc::new(devices);
        let media = Arc::new(media);
        let observer = Arc::new(RecordingObserver::default());
        let mut controller = CallController::new(
            user,
            SignalingBridge::new(sink.clone()),
            devices.clone(),
            media.clone(),
            tx.downgrade(),
        );
        controller.subscribe(observer.clone());
        Self {
            user,
            controller,
            sink,
            devices,
            media,
            observer,
            rx,
            _tx: tx,
        }
    }

    pub fn handle(&mut self, event: CallEvent) {
        self.controller.handle(event);
    }

    /// Feed the next queued event (capture result, session event) to the controller.
    pub async fn pump(&mut self) {
        let event = self.rx.recv().await.expect("queue closed");
        self.controller.handle(event);
    }

    /// Deliver everything `self` sent to `other` as inbound signals.
    pub fn relay_to(&self, other: &mut Party) {
        for (to, signal) in self.sink.take() {
            assert_eq!(to, other.user, "signal addressed to someone else");
            other.handle(CallEvent::Signal {
                from: self.user,
                signal,
            });
        }
    }
}
