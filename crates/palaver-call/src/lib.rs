//! # palaver-call
//!
//! One-to-one audio/video calls for Palaver.
//!
//! Architecture:
//! ```text
//!   Caller                     relay                      Callee
//!   capture media
//!   request_id{isVideo} ──────────────────────────────▶  ringing-inbound
//!                       ◀──────────────────────────────  response_id{peerId}
//!   media.call(peerId) ═══════ direct media session ════▶ parked until answered
//!   connected          ◀═══════ remote streams ═════════▶ connected
//!   end_call ─────────────────────────────────────────▶  released, idle
//! ```
//!
//! The relay only carries three tiny signals. Audio and video never touch it:
//! they flow over a direct session opened by a separate media library, which
//! this crate consumes through the [`media`] traits.
//!
//! Everything runs on one actor task ([`runtime`]): user actions, relay
//! signals, capture completions, and media-session events all arrive on the
//! same queue, so the [`controller`] never needs locks.

pub mod bridge;
pub mod controller;
pub mod error;
pub mod event;
pub mod media;
pub mod runtime;
pub mod signaling;
pub mod state;
pub mod view;

#[cfg(test)]
mod testing;

pub use bridge::{SignalSink, SignalingBridge};
pub use controller::CallController;
pub use error::{CallError, CallResult};
pub use event::{CallEvent, SessionEvent, SessionEvents};
pub use media::{
    DirectMedia, LocalStream, LocalStreamHandle, MediaDevices, MediaSession, RemoteStream,
    RemoteStreamHandle, SessionId,
};
pub use palaver_common::models::MediaKind;
pub use runtime::{CallHandle, CallRuntime};
pub use signaling::SignalData;
pub use state::{CallDirection, CallPhase, CallSnapshot};
pub use view::{CallObserver, CallStatus, CallView};
