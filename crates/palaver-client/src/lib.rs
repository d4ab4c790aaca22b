//! # palaver-client
//!
//! The Palaver chat client: roster and history over REST, live messages,
//! read receipts and call signaling over the relay WebSocket, and one-to-one
//! calls driven by `palaver-call`.
//!
//! ```text
//!   RestClient ── /api/users, /api/messages/{id}, /edit_profile
//!   RelayClient ─ broadcast ─▶ Dispatcher ─┬─▶ ChatState ─▶ ChatUpdate
//!        ▲                                 └─▶ CallHandle ─▶ CallController
//!        └──── RelayOutbound: SignalSink (call_user) ◀────────┘
//! ```
//!
//! Media capture and the direct media session are supplied by the embedding
//! application through the `palaver_call::media` traits.

pub mod chat;
pub mod client;
pub mod error;
pub mod relay;
pub mod rest;
pub mod telemetry;

pub use chat::{ChatEffect, ChatState, RosterView, Tick};
pub use client::{ChatUpdate, PalaverClient};
pub use error::{ClientError, Result};
pub use relay::{RelayClient, RelayOutbound};
pub use rest::RestClient;
