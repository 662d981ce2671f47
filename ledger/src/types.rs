//! Identity facts handed to the ledger by its caller

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform id of a user. Stored as a string key inside documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(UserId)
    }
}

/// A resolved community member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub is_administrator: bool,
}

impl Member {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id: UserId(id),
            display_name: display_name.into(),
            is_administrator: false,
        }
    }

    pub fn administrator(mut self) -> Self {
        self.is_administrator = true;
        self
    }
}

/// A member sitting in a voice channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    #[serde(flatten)]
    pub member: Member,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub afk: bool,
}

impl VoiceState {
    pub fn active(member: Member) -> Self {
        Self {
            member,
            self_deaf: false,
            deaf: false,
            afk: false,
        }
    }

    /// Deafened and AFK members do not accrue time or points
    pub fn is_tracked(&self) -> bool {
        !self.self_deaf && !self.deaf && !self.afk
    }
}
