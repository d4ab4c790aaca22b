//! Call error taxonomy.

use palaver_common::models::UserId;

/// Everything that can go wrong while placing or holding a call.
///
/// Cloneable so failures can travel through the call event queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    /// The capture API refused camera/microphone access.
    #[error("Could not access camera/microphone: {0}")]
    MediaAccessDenied(String),

    /// The direct media library reported a failure.
    #[error("Call error: {0}")]
    Session(String),

    /// A call is already in progress.
    #[error("Already in a call with user {partner}")]
    Busy { partner: UserId },

    #[error("Cannot call yourself")]
    SelfCall,

    /// The media library has not assigned this process a session identity yet.
    #[error("Media session identity not assigned yet")]
    NoSessionIdentity,

    /// The relay refused or dropped an outbound signal.
    #[error("Relay unavailable: {0}")]
    Relay(String),

    #[error("Malformed call signal: {0}")]
    InvalidSignal(String),

    #[error("Call runtime has stopped")]
    RuntimeStopped,
}

impl CallError {
    /// Whether this failure should interrupt the user with an alert.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::MediaAccessDenied(_) | Self::Session(_) | Self::Busy { .. } | Self::SelfCall
        )
    }
}

impl From<serde_json::Error> for CallError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidSignal(e.to_string())
    }
}

pub type CallResult<T> = Result<T, CallError>;
