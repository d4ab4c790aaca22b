//! User model: the identity layer.
//!
//! Users are addressed by a numeric ID assigned by the chat server. The relay
//! routes events by this logical identity, never by media session identity.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Logical user identity, as assigned by the chat server.
pub type UserId = i64;

/// Avatar shown when a user never set one.
pub const DEFAULT_AVATAR_URL: &str = "https://www.w3schools.com/w3images/avatar2.png";

/// A chat user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Avatar image URL (server may omit it)
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Short "about" line
    #[serde(default)]
    pub about: Option<String>,
}

impl User {
    /// Avatar URL, falling back to the stock image.
    pub fn avatar(&self) -> &str {
        self.avatar_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_AVATAR_URL)
    }
}

/// Roster entry: a user plus how many of their messages we have not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub unread: u32,
}

/// Profile edit request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 200, message = "About must be at most 200 characters"))]
    pub about: String,
}
