//! Relay wire frames: what travels over the relay WebSocket.
//!
//! Every frame is `{ "event": <name>, "data": <payload> }`. Chat traffic and
//! call signaling share the socket but use disjoint event names, so each
//! consumer only ever sees its own namespace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ChatMessage, MarkRead, ReadReceipt, SendMessage, UserId};

/// Relay event names.
pub mod event {
    /// Synthesised locally once the socket is open.
    pub const CONNECT: &str = "connect";
    /// Synthesised locally once the socket is gone.
    pub const DISCONNECT: &str = "disconnect";
    pub const CALL_USER: &str = "call_user";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const RECEIVE_MESSAGE: &str = "receive_message";
    pub const MARK_READ: &str = "mark_read";
    pub const MESSAGES_READ: &str = "messages_read";
}

/// A raw relay frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound call envelope: `{ userToCall, signalData, from }`.
///
/// `signal_data` is opaque here; the call crate owns its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEnvelope {
    pub user_to_call: UserId,
    pub signal_data: Value,
    pub from: UserId,
}

/// Inbound call envelope as forwarded by the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCallSignal {
    pub signal: Value,
    pub from: UserId,
    #[serde(default)]
    pub from_username: Option<String>,
}

/// Frames a client can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Connected,
    Disconnected,
    CallSignal(IncomingCallSignal),
    MessageReceived(ChatMessage),
    MessagesRead(ReadReceipt),
    /// Anything this client does not understand.
    Unknown(String),
}

impl InboundEvent {
    /// Decode a frame. Unknown event names are not an error.
    pub fn from_frame(frame: RelayFrame) -> Result<Self, serde_json::Error> {
        Ok(match frame.event.as_str() {
            event::CONNECT => Self::Connected,
            event::DISCONNECT => Self::Disconnected,
            event::CALL_USER => Self::CallSignal(serde_json::from_value(frame.data)?),
            event::RECEIVE_MESSAGE => Self::MessageReceived(serde_json::from_value(frame.data)?),
            event::MESSAGES_READ => Self::MessagesRead(serde_json::from_value(frame.data)?),
            _ => Self::Unknown(frame.event),
        })
    }
}

/// Frames a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    CallUser(CallEnvelope),
    SendMessage(SendMessage),
    MarkRead(MarkRead),
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallUser(_) => event::CALL_USER,
            Self::SendMessage(_) => event::SEND_MESSAGE,
            Self::MarkRead(_) => event::MARK_READ,
        }
    }

    pub fn into_frame(self) -> Result<RelayFrame, serde_json::Error> {
        let event = self.name().to_owned();
        let data = match self {
            Self::CallUser(env) => serde_json::to_value(env)?,
            Self::SendMessage(msg) => serde_json::to_value(msg)?,
            Self::MarkRead(mark) => serde_json::to_value(mark)?,
        };
        Ok(RelayFrame { event, data })
    }
}
