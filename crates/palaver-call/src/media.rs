//! Media capabilities consumed by the controller.
//!
//! Two external collaborators sit behind these traits:
//! - [`MediaDevices`]: the capture API (camera/microphone access)
//! - [`DirectMedia`]: the peer-to-peer media library that dials and answers
//!   direct sessions by session identity
//!
//! Adapters report asynchronous session activity through the
//! [`SessionEvents`](crate::event::SessionEvents) handle they are given.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use palaver_common::models::MediaKind;
use serde::{Deserialize, Serialize};

use crate::error::CallResult;
use crate::event::SessionEvents;

/// Identity assigned to a process by the media library. Distinct from the
/// logical user identity the relay routes on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local capture (microphone, plus camera for video calls).
pub trait LocalStream: Send + Sync + fmt::Debug {
    fn kind(&self) -> MediaKind;

    /// Stop every capture track and release the devices. Must be idempotent.
    fn stop(&self);
}

pub type LocalStreamHandle = Arc<dyn LocalStream>;

/// Media arriving from the other party, ready to attach to playback.
pub trait RemoteStream: Send + Sync + fmt::Debug {
    fn has_video(&self) -> bool;
}

pub type RemoteStreamHandle = Arc<dyn RemoteStream>;

/// Capture API.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire audio, plus video when `kind` asks for it.
    ///
    /// Fails with [`CallError::MediaAccessDenied`](crate::CallError::MediaAccessDenied)
    /// when the user or platform refuses access.
    async fn capture(&self, kind: MediaKind) -> CallResult<LocalStreamHandle>;
}

/// One direct media session, outbound or inbound.
pub trait MediaSession: Send + Sync + fmt::Debug {
    /// Accept an inbound session with our local stream. Activity on the
    /// session is reported through `events` from then on.
    fn answer(&mut self, local: LocalStreamHandle, events: SessionEvents) -> CallResult<()>;

    /// Close the session. Must be idempotent.
    fn close(&mut self);
}

/// Peer-to-peer media library.
pub trait DirectMedia: Send + Sync {
    /// This process's session identity, once the library has connected.
    fn session_id(&self) -> Option<SessionId>;

    /// Dial `remote` with our local stream.
    fn call(
        &self,
        remote: &SessionId,
        local: LocalStreamHandle,
        events: SessionEvents,
    ) -> CallResult<Box<dyn MediaSession>>;
}
