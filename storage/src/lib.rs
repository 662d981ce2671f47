//! Kirbec Storage Layer - Per-Community Document Store
//!
//! Every community (guild) owns a small set of whole documents:
//! - `total`: minutes of voice presence per user
//! - `date`: minutes of voice presence per user, per day
//! - `discordPoints`: points balance per user
//! - `bets`: bet records plus the bet id counter
//! - `rewards`: reward title -> cost
//!
//! Documents are read and written whole. Mutations go through a [`Session`],
//! which holds the community's lock for the whole read/modify/write window and
//! commits every staged document in one atomic batch.

pub mod memory;
pub mod session;
pub mod sled_store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;

pub use memory::MemoryStore;
pub use session::{Session, Vault};
pub use sled_store::SledStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Platform id of a community (guild)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(pub u64);

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The documents kept for each community
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    TotalTimes,
    DateTimes,
    Points,
    Bets,
    Rewards,
}

impl DocumentKey {
    /// Stored document name, shared with data written by earlier deployments
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKey::TotalTimes => "total",
            DocumentKey::DateTimes => "date",
            DocumentKey::Points => "discordPoints",
            DocumentKey::Bets => "bets",
            DocumentKey::Rewards => "rewards",
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw access to per-community documents.
///
/// Implementations have no notion of transactions beyond `store_batch`:
/// every document in a batch is written, or none is.
pub trait DocumentStore: Send + Sync + 'static {
    /// Load a document, `None` if it was never written
    fn load(
        &self,
        community: CommunityId,
        key: DocumentKey,
    ) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Write every document in `batch` atomically
    fn store_batch(
        &self,
        community: CommunityId,
        batch: Vec<(DocumentKey, Vec<u8>)>,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_names() {
        assert_eq!(DocumentKey::TotalTimes.as_str(), "total");
        assert_eq!(DocumentKey::DateTimes.as_str(), "date");
        assert_eq!(DocumentKey::Points.as_str(), "discordPoints");
        assert_eq!(DocumentKey::Bets.as_str(), "bets");
        assert_eq!(DocumentKey::Rewards.as_str(), "rewards");
    }

    #[test]
    fn test_community_id_is_plain_number_in_json() {
        let json = serde_json::to_string(&CommunityId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
