use std::sync::Arc;

use super::*;
use crate::media::LocalStream;
use crate::testing::{FakeDevices, FakeMedia, FakeRemote, FakeSession, Party, SessionProbe};
use crate::view::CallStatus;

const ALICE: UserId = 1;
const BOB: UserId = 2;
const CAROL: UserId = 3;

fn alice() -> Party {
    Party::new(ALICE, "peer-a")
}

fn bob() -> Party {
    Party::new(BOB, "peer-b")
}

/// Drive a full handshake until both sides are connected with remote media.
async fn connect(a: &mut Party, b: &mut Party, kind: MediaKind) -> (Arc<SessionProbe>, Arc<SessionProbe>) {
    a.handle(CallEvent::Start { target: b.user, kind });
    a.pump().await;
    a.relay_to(b);
    b.relay_to(a);

    let (inbound, b_probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    b.handle(CallEvent::Answer);
    b.pump().await;

    let (_, a_probe) = a.media.dialed().pop().expect("alice never dialed");
    a_probe.events().remote_stream(Arc::new(FakeRemote { video: kind.has_video() }));
    a.pump().await;
    b_probe.events().remote_stream(Arc::new(FakeRemote { video: kind.has_video() }));
    b.pump().await;

    assert_eq!(a.controller.phase(), CallPhase::Connected);
    assert_eq!(b.controller.phase(), CallPhase::Connected);
    (a_probe, b_probe)
}

fn assert_released(party: &Party) {
    assert_eq!(party.controller.phase(), CallPhase::Idle);
    assert!(party.controller.snapshot().partner.is_none());
    for stream in party.devices.captured() {
        assert!(stream.is_stopped(), "capture left running");
    }
    let last = party.observer.last();
    assert_eq!(last.phase, CallPhase::Idle);
    assert!(!last.modal_visible);
}

#[tokio::test]
async fn test_video_call_handshake() {
    let mut a = alice();
    let mut b = bob();

    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Video });
    assert_eq!(a.controller.phase(), CallPhase::AwaitingLocalMedia);
    assert_eq!(a.controller.snapshot().partner, Some(BOB));
    assert_eq!(a.observer.last().status, Some(CallStatus::Connecting));
    assert!(a.observer.last().local_video_visible);
    assert!(a.sink.sent().is_empty(), "nothing sent before media is captured");

    a.pump().await;
    assert_eq!(a.controller.phase(), CallPhase::RingingOutbound);
    assert_eq!(a.sink.sent(), vec![(BOB, SignalData::RequestId { is_video: true })]);

    a.relay_to(&mut b);
    assert_eq!(b.controller.phase(), CallPhase::RingingInbound);
    assert_eq!(b.controller.snapshot().partner, Some(ALICE));
    assert_eq!(
        b.sink.sent(),
        vec![(ALICE, SignalData::ResponseId { peer_id: SessionId::new("peer-b") })]
    );
    let incoming = b.observer.last();
    assert_eq!(incoming.status_text().as_deref(), Some("Incoming Video Call..."));
    assert!(incoming.answer_visible);
    assert!(incoming.remote_video_visible);

    b.relay_to(&mut a);
    let dialed = a.media.dialed();
    assert_eq!(dialed.len(), 1);
    assert_eq!(dialed[0].0, SessionId::new("peer-b"));
    assert_eq!(a.controller.phase(), CallPhase::Connected);
    assert_eq!(a.observer.last().status, Some(CallStatus::Ringing));

    // Alice's dial reaches Bob's media library before he answers.
    let (inbound, b_probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    assert!(!b_probe.is_answered());
    assert_eq!(b.controller.phase(), CallPhase::RingingInbound);

    b.handle(CallEvent::Answer);
    assert_eq!(b.controller.phase(), CallPhase::AwaitingLocalMedia);
    assert!(!b.observer.last().answer_visible);
    b.pump().await;
    assert!(b_probe.is_answered());
    assert_eq!(b.controller.phase(), CallPhase::Connected);

    let a_probe = dialed[0].1.clone();
    a_probe.events().remote_stream(Arc::new(FakeRemote { video: true }));
    a.pump().await;
    b_probe.events().remote_stream(Arc::new(FakeRemote { video: true }));
    b.pump().await;

    for party in [&a, &b] {
        let view = party.observer.last();
        assert_eq!(view.status, Some(CallStatus::Connected));
        assert!(view.remote_video_visible);
        assert!(view.remote_playback.is_some());
        assert!(view.local_preview.is_some());
    }
}

#[tokio::test]
async fn test_capture_failure_sends_nothing() {
    let mut a = Party::with(ALICE, FakeDevices::denying(), FakeMedia::new(Some("peer-a")));

    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Video });
    a.pump().await;

    assert_eq!(a.controller.phase(), CallPhase::Idle);
    assert!(a.sink.sent().is_empty());
    assert_eq!(a.observer.alerts().len(), 1);
    assert!(a.observer.alerts()[0].contains("camera/microphone"));

    let phases: Vec<_> = a.observer.views().iter().map(|v| v.phase).collect();
    assert_eq!(
        phases,
        vec![CallPhase::AwaitingLocalMedia, CallPhase::Ended, CallPhase::Idle]
    );
}

#[tokio::test]
async fn test_hangup_releases_both_sides() {
    let mut a = alice();
    let mut b = bob();
    let (a_probe, b_probe) = connect(&mut a, &mut b, MediaKind::Video).await;

    a.handle(CallEvent::Hangup);
    assert_eq!(a.sink.sent(), vec![(BOB, SignalData::EndCall)]);
    assert!(a_probe.is_closed());
    assert_released(&a);

    a.relay_to(&mut b);
    assert!(b_probe.is_closed());
    assert_released(&b);
    assert!(b.sink.sent().is_empty());
}

#[tokio::test]
async fn test_end_call_in_every_phase_returns_to_idle() {
    // Outbound, still capturing.
    let mut a = alice();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.handle(CallEvent::Signal { from: BOB, signal: SignalData::EndCall });
    assert_eq!(a.controller.phase(), CallPhase::Idle);
    a.pump().await; // late capture result
    assert_released(&a);

    // Outbound, ringing.
    let mut a = alice();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.pump().await;
    assert_eq!(a.controller.phase(), CallPhase::RingingOutbound);
    a.handle(CallEvent::Signal { from: BOB, signal: SignalData::EndCall });
    assert_released(&a);

    // Inbound, ringing with a parked session.
    let mut b = bob();
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: false } });
    let (inbound, probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::EndCall });
    assert!(probe.is_closed());
    assert_released(&b);

    // Connected.
    let mut a = alice();
    let mut b = bob();
    let (a_probe, _) = connect(&mut a, &mut b, MediaKind::Audio).await;
    a.handle(CallEvent::Signal { from: BOB, signal: SignalData::EndCall });
    assert!(a_probe.is_closed());
    assert_released(&a);
    assert!(a.sink.take().iter().all(|(_, s)| *s != SignalData::EndCall));
}

#[tokio::test]
async fn test_stale_capture_is_released() {
    let mut a = alice();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Video });
    a.handle(CallEvent::Hangup);
    assert_eq!(a.controller.phase(), CallPhase::Idle);

    // A new call starts before the first capture resolves.
    a.handle(CallEvent::Start { target: CAROL, kind: MediaKind::Audio });
    a.pump().await;
    a.pump().await;

    let captured = a.devices.captured();
    assert_eq!(captured.len(), 2);
    let stale = captured.iter().find(|s| s.kind() == MediaKind::Video).unwrap();
    assert!(stale.is_stopped());
    let live = captured.iter().find(|s| s.kind() == MediaKind::Audio).unwrap();
    assert!(!live.is_stopped());

    assert_eq!(a.controller.phase(), CallPhase::RingingOutbound);
    assert_eq!(a.controller.snapshot().partner, Some(CAROL));
    assert_eq!(
        a.sink.sent(),
        vec![
            (BOB, SignalData::EndCall),
            (CAROL, SignalData::RequestId { is_video: false }),
        ]
    );
}

#[tokio::test]
async fn test_request_while_busy_is_refused() {
    let mut a = alice();
    let mut b = bob();
    connect(&mut a, &mut b, MediaKind::Audio).await;
    b.sink.take();

    b.handle(CallEvent::Signal { from: CAROL, signal: SignalData::RequestId { is_video: true } });

    assert_eq!(b.sink.take(), vec![(CAROL, SignalData::EndCall)]);
    assert_eq!(b.controller.phase(), CallPhase::Connected);
    assert_eq!(b.controller.snapshot().partner, Some(ALICE));
}

#[tokio::test]
async fn test_redial_from_partner_ends_call_on_both_sides() {
    // Connected.
    let mut a = alice();
    let mut b = bob();
    let (a_probe, b_probe) = connect(&mut a, &mut b, MediaKind::Audio).await;
    b.sink.take();

    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: false } });
    assert_eq!(b.sink.sent(), vec![(ALICE, SignalData::EndCall)]);
    assert!(b_probe.is_closed());
    assert_released(&b);

    b.relay_to(&mut a);
    assert!(a_probe.is_closed());
    assert_released(&a);

    // Answered, still capturing.
    let mut b = bob();
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: true } });
    b.handle(CallEvent::Answer);
    assert_eq!(b.controller.phase(), CallPhase::AwaitingLocalMedia);
    b.sink.take();

    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: true } });
    assert_eq!(b.sink.take(), vec![(ALICE, SignalData::EndCall)]);
    assert_eq!(b.controller.phase(), CallPhase::Idle);
    b.pump().await; // late capture result
    assert_released(&b);
}

#[tokio::test]
async fn test_end_call_from_stranger_is_ignored() {
    let mut b = bob();
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: false } });
    b.handle(CallEvent::Signal { from: CAROL, signal: SignalData::EndCall });
    assert_eq!(b.controller.phase(), CallPhase::RingingInbound);
    assert_eq!(b.controller.snapshot().partner, Some(ALICE));
}

#[tokio::test]
async fn test_request_without_session_identity_is_refused() {
    let mut b = Party::with(BOB, FakeDevices::default(), FakeMedia::new(None));
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: true } });
    assert_eq!(b.controller.phase(), CallPhase::Idle);
    assert_eq!(b.sink.sent(), vec![(ALICE, SignalData::EndCall)]);
}

#[tokio::test]
async fn test_session_error_ends_without_signaling() {
    let mut a = alice();
    let mut b = bob();
    let (a_probe, _) = connect(&mut a, &mut b, MediaKind::Video).await;
    a.sink.take();

    a_probe.events().error("ice-failed");
    a.pump().await;

    assert_released(&a);
    assert!(a_probe.is_closed());
    assert!(a.sink.sent().is_empty());
    assert_eq!(a.observer.alerts(), vec!["Call error: ice-failed".to_string()]);
}

#[tokio::test]
async fn test_session_close_ends_without_signaling() {
    let mut a = alice();
    let mut b = bob();
    let (_, b_probe) = connect(&mut a, &mut b, MediaKind::Audio).await;
    b.sink.take();

    b_probe.events().closed();
    b.pump().await;

    assert_released(&b);
    assert!(b.sink.sent().is_empty());
    assert!(b.observer.alerts().is_empty());
}

#[tokio::test]
async fn test_events_from_previous_session_are_ignored() {
    let mut a = alice();
    let mut b = bob();
    let (old_probe, _) = connect(&mut a, &mut b, MediaKind::Audio).await;
    a.handle(CallEvent::Hangup);

    a.handle(CallEvent::Start { target: CAROL, kind: MediaKind::Audio });
    a.pump().await;
    old_probe.events().closed();
    a.pump().await;

    assert_eq!(a.controller.phase(), CallPhase::RingingOutbound);
}

#[tokio::test]
async fn test_inbound_session_after_capture_is_answered_at_once() {
    let mut b = bob();
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: true } });
    b.handle(CallEvent::Answer);
    b.pump().await;
    assert_eq!(b.controller.phase(), CallPhase::AwaitingLocalMedia);

    let (inbound, probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    assert!(probe.is_answered());
    assert_eq!(b.controller.phase(), CallPhase::Connected);
    assert_eq!(b.observer.last().status, Some(CallStatus::Connected));
}

#[tokio::test]
async fn test_inbound_session_while_idle_is_closed() {
    let mut b = bob();
    let (inbound, probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    assert!(probe.is_closed());
    assert_eq!(b.controller.phase(), CallPhase::Idle);
}

#[tokio::test]
async fn test_answer_capture_failure_hangs_up_caller() {
    let mut b = Party::with(BOB, FakeDevices::denying(), FakeMedia::new(Some("peer-b")));
    b.handle(CallEvent::Signal { from: ALICE, signal: SignalData::RequestId { is_video: false } });
    let (inbound, probe) = FakeSession::inbound();
    b.handle(CallEvent::InboundSession(inbound));
    b.sink.take();

    b.handle(CallEvent::Answer);
    b.pump().await;

    assert_eq!(b.sink.sent(), vec![(ALICE, SignalData::EndCall)]);
    assert!(probe.is_closed());
    assert_released(&b);
    assert_eq!(b.observer.alerts().len(), 1);
}

#[tokio::test]
async fn test_dial_failure_ends_call() {
    let mut a = alice();
    a.media.fail_dials();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.pump().await;
    a.handle(CallEvent::Signal {
        from: BOB,
        signal: SignalData::ResponseId { peer_id: SessionId::new("peer-b") },
    });

    assert_released(&a);
    assert_eq!(a.observer.alerts(), vec!["Call error: peer-unavailable".to_string()]);
}

#[tokio::test]
async fn test_response_from_stranger_is_ignored() {
    let mut a = alice();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.pump().await;
    a.handle(CallEvent::Signal {
        from: CAROL,
        signal: SignalData::ResponseId { peer_id: SessionId::new("peer-c") },
    });

    assert!(a.media.dialed().is_empty());
    assert_eq!(a.controller.phase(), CallPhase::RingingOutbound);
}

#[tokio::test]
async fn test_start_rejected_while_busy_or_self() {
    let mut a = alice();
    a.handle(CallEvent::Start { target: ALICE, kind: MediaKind::Audio });
    assert_eq!(a.controller.phase(), CallPhase::Idle);
    assert_eq!(a.observer.alerts(), vec!["Cannot call yourself".to_string()]);

    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.handle(CallEvent::Start { target: CAROL, kind: MediaKind::Audio });
    assert_eq!(a.controller.snapshot().partner, Some(BOB));
    assert_eq!(a.observer.alerts().len(), 2);
}

#[tokio::test]
async fn test_media_failure_ends_active_call() {
    let mut a = alice();
    a.handle(CallEvent::Start { target: BOB, kind: MediaKind::Audio });
    a.pump().await;

    a.handle(CallEvent::MediaFailure("server-error".into()));
    assert_released(&a);
    assert_eq!(a.observer.alerts(), vec!["Call error: server-error".to_string()]);
}

#[tokio::test]
async fn test_audio_inbound_call_never_shows_video() {
    let mut a = alice();
    let mut b = bob();
    connect(&mut a, &mut b, MediaKind::Audio).await;

    for party in [&a, &b] {
        for view in party.observer.views() {
            assert!(!view.local_video_visible);
            assert!(!view.remote_video_visible);
            assert!(view.local_preview.is_none());
        }
    }
}
