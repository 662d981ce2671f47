//! In-memory document store

use crate::{CommunityId, DocumentKey, DocumentStore, Result};
use dashmap::DashMap;

/// Volatile store, used by tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(CommunityId, DocumentKey), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all communities
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    async fn load(&self, community: CommunityId, key: DocumentKey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .documents
            .get(&(community, key))
            .map(|entry| entry.value().clone()))
    }

    async fn store_batch(
        &self,
        community: CommunityId,
        batch: Vec<(DocumentKey, Vec<u8>)>,
    ) -> Result<()> {
        for (key, value) in batch {
            self.documents.insert((community, key), value);
        }
        Ok(())
    }
}
