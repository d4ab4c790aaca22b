//! Call signaling: the three messages exchanged over the relay.
//!
//! The relay only negotiates *who dials whom*:
//! - `request_id`: the caller announces a call and its media kind
//! - `response_id`: the callee hands back its media session identity
//! - `end_call`: either side hangs up
//!
//! The actual media (audio/video) flows over a direct session opened by the
//! media library, NOT through this channel.

use palaver_common::models::MediaKind;
use serde::{Deserialize, Serialize};

use crate::media::SessionId;

/// Payload of a `call_user` relay frame (`signalData` outbound, `signal` inbound).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalData {
    /// Caller → Callee: "I want to call you"
    RequestId {
        #[serde(rename = "isVideo")]
        is_video: bool,
    },

    /// Callee → Caller: "dial this session"
    ResponseId {
        #[serde(rename = "peerId")]
        peer_id: SessionId,
    },

    /// Bidirectional: hang up
    EndCall,
}

impl SignalData {
    pub fn request(kind: MediaKind) -> Self {
        Self::RequestId {
            is_video: kind.has_video(),
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestId { .. } => "request_id",
            Self::ResponseId { .. } => "response_id",
            Self::EndCall => "end_call",
        }
    }
}
