//! Call view model: what the UI shows for a given call snapshot.
//!
//! The UI is a fixed set of regions: the call modal, its status line, the
//! answer button, and the local/remote video panes. [`CallView::render`] is a
//! pure function of the snapshot; observers only paint the result.

use std::fmt;

use crate::media::{LocalStreamHandle, RemoteStreamHandle};
use crate::state::{CallDirection, CallPhase, CallSnapshot};

/// Status line shown in the call modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Connecting,
    Ringing,
    IncomingVoice,
    IncomingVideo,
    Connected,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "Connecting...",
            Self::Ringing => "Ringing...",
            Self::IncomingVoice => "Incoming Voice Call...",
            Self::IncomingVideo => "Incoming Video Call...",
            Self::Connected => "Connected",
        })
    }
}

/// Visibility and content of every call region.
#[derive(Debug, Clone)]
pub struct CallView {
    pub phase: CallPhase,
    pub modal_visible: bool,
    pub status: Option<CallStatus>,
    pub answer_visible: bool,
    pub local_video_visible: bool,
    pub remote_video_visible: bool,
    /// Attach to the local preview (video calls only).
    pub local_preview: Option<LocalStreamHandle>,
    /// Attach to playback.
    pub remote_playback: Option<RemoteStreamHandle>,
}

impl CallView {
    pub fn render(snapshot: &CallSnapshot) -> Self {
        let video = snapshot.has_video();
        let inbound = snapshot.direction == Some(CallDirection::Inbound);

        let status = match snapshot.phase {
            CallPhase::Idle | CallPhase::Ended => None,
            CallPhase::AwaitingLocalMedia | CallPhase::RingingOutbound => {
                Some(CallStatus::Connecting)
            }
            CallPhase::RingingInbound if video => Some(CallStatus::IncomingVideo),
            CallPhase::RingingInbound => Some(CallStatus::IncomingVoice),
            CallPhase::Connected if snapshot.remote_stream.is_none() && !inbound => {
                Some(CallStatus::Ringing)
            }
            CallPhase::Connected => Some(CallStatus::Connected),
        };

        let modal_visible = status.is_some();
        let video_visible = modal_visible && video;

        Self {
            phase: snapshot.phase,
            modal_visible,
            status,
            answer_visible: snapshot.phase == CallPhase::RingingInbound,
            local_video_visible: video_visible,
            remote_video_visible: video_visible,
            local_preview: video_visible
                .then(|| snapshot.local_stream.clone())
                .flatten(),
            remote_playback: modal_visible
                .then(|| snapshot.remote_stream.clone())
                .flatten(),
        }
    }

    pub fn status_text(&self) -> Option<String> {
        self.status.map(|s| s.to_string())
    }
}

/// Rendering layer subscribed to call changes.
pub trait CallObserver: Send + Sync {
    /// Called after every state change with the freshly rendered view.
    fn on_view(&self, view: &CallView);

    /// Blocking user-visible alert (capture denied, session error, busy).
    fn on_alert(&self, _message: &str) {}
}
