//! Core domain models shared by the Palaver crates.
//!
//! These mirror what the chat server serializes over REST and the relay.

pub mod media;
pub mod message;
pub mod user;

/// Re-export all model types for convenience.
pub use media::*;
pub use message::*;
pub use user::*;
