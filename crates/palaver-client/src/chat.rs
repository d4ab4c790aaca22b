//! Chat state for the roster and the open conversation.
//!
//! Pure state: nothing here touches the network. Methods return the frames
//! or follow-ups the caller must act on.

use palaver_common::models::{
    ChatMessage, MarkRead, ReadReceipt, SendMessage, User, UserId, UserSummary,
};
use palaver_common::validation::{matches_filter, validate_request};

use crate::error::{ClientError, Result};

/// Follow-up required after an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEffect {
    /// Tell the relay we read the open conversation.
    MarkRead(MarkRead),
    /// A message for another conversation arrived; unread counts changed.
    ReloadRoster,
}

/// Delivery marker on a sent message. Received messages carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Sent,
    Read,
}

/// Roster filtered by the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterView {
    pub visible: Vec<UserSummary>,
    /// Roster is not empty but nothing matches.
    pub no_results: bool,
}

#[derive(Debug, Clone)]
pub struct ChatState {
    local_user: UserId,
    roster: Vec<UserSummary>,
    active: Option<UserId>,
    messages: Vec<ChatMessage>,
    filter: String,
}

impl ChatState {
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            roster: Vec::new(),
            active: None,
            messages: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    // ── Roster ────────────────────────────────────────────────────────────────

    pub fn set_roster(&mut self, roster: Vec<UserSummary>) {
        self.roster = roster;
    }

    pub fn roster(&self) -> &[UserSummary] {
        &self.roster
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.roster.iter().map(|s| &s.user).find(|u| u.id == id)
    }

    pub fn unread_total(&self) -> u32 {
        self.roster.iter().map(|s| s.unread).sum()
    }

    /// Update the search filter and return what the roster shows now.
    pub fn search(&mut self, filter: &str) -> RosterView {
        self.filter = filter.to_owned();
        self.roster_view()
    }

    pub fn roster_view(&self) -> RosterView {
        let visible: Vec<_> = self
            .roster
            .iter()
            .filter(|s| matches_filter(&s.user.username, &self.filter))
            .cloned()
            .collect();
        RosterView {
            no_results: !self.roster.is_empty() && visible.is_empty(),
            visible,
        }
    }

    // ── Conversation ──────────────────────────────────────────────────────────

    pub fn active(&self) -> Option<UserId> {
        self.active
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Switch to the conversation with `user`, replacing the history.
    pub fn open_conversation(&mut self, user: UserId, history: Vec<ChatMessage>) -> MarkRead {
        self.active = Some(user);
        self.messages = history;
        if let Some(entry) = self.roster.iter_mut().find(|s| s.user.id == user) {
            entry.unread = 0;
        }
        MarkRead { sender_id: user }
    }

    pub fn close_conversation(&mut self) {
        self.active = None;
        self.messages.clear();
    }

    /// Apply a `receive_message` frame (our own echoes included).
    pub fn on_message(&mut self, msg: ChatMessage) -> Option<ChatEffect> {
        match self.active {
            Some(partner) if msg.is_between(self.local_user, partner) => {
                let from_partner = msg.sender_id == partner;
                self.messages.push(msg);
                from_partner.then_some(ChatEffect::MarkRead(MarkRead { sender_id: partner }))
            }
            _ => Some(ChatEffect::ReloadRoster),
        }
    }

    /// Apply a `messages_read` frame. Returns whether anything changed.
    pub fn on_messages_read(&mut self, receipt: ReadReceipt) -> bool {
        if self.active != Some(receipt.reader_id) {
            return false;
        }
        let me = self.local_user;
        let mut changed = false;
        for msg in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id == me && !m.is_read)
        {
            msg.is_read = true;
            changed = true;
        }
        changed
    }

    /// Build a send request for the open conversation.
    pub fn compose(&self, text: &str) -> Result<SendMessage> {
        let receiver_id = self.active.ok_or(ClientError::NoConversation)?;
        let request = SendMessage {
            receiver_id,
            content: text.trim().to_owned(),
        };
        validate_request(&request)?;
        Ok(request)
    }

    // ── Rendering helpers ─────────────────────────────────────────────────────

    pub fn is_sent(&self, msg: &ChatMessage) -> bool {
        msg.sender_id == self.local_user
    }

    pub fn tick(&self, msg: &ChatMessage) -> Option<Tick> {
        self.is_sent(msg)
            .then(|| if msg.is_read { Tick::Read } else { Tick::Sent })
    }
}
