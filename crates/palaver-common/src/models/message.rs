//! Message model: one direct message between two users.
//!
//! Read receipts are per (sender, receiver) pair: when the receiver opens the
//! conversation every message from the sender is flagged read at once.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::user::UserId;

/// A direct message as served by history and relayed live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    /// Server timestamp (UTC, no offset on the wire)
    pub timestamp: NaiveDateTime,
    pub sender_username: String,
    #[serde(default)]
    pub is_read: bool,
}

impl ChatMessage {
    /// Whether this message belongs to the conversation between `a` and `b`.
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }

    /// Short `HH:MM` label for the message bubble.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Send-message request pushed over the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SendMessage {
    pub receiver_id: UserId,
    #[validate(length(min = 1, max = 500, message = "Message must be 1-500 characters"))]
    pub content: String,
}

/// "I have read everything `sender_id` sent me."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRead {
    pub sender_id: UserId,
}

/// Notification to the original sender that `reader_id` read their messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub reader_id: UserId,
    pub sender_id: UserId,
}
