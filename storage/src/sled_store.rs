//! Sled-based persistence for community documents
//!
//! One tree per community (`community:<id>`), one key per document.
//! Values are JSON so the documents stay readable with ordinary tooling.

use crate::{CommunityId, DocumentKey, DocumentStore, Result, StorageError};
use std::path::Path;

const TREE_PREFIX: &str = "community:";

#[derive(Debug, Clone)]
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Backend(format!("Failed to open database: {}", e)))?;

        Ok(SledStore { db })
    }

    /// Communities that have at least one stored document
    pub fn communities(&self) -> Vec<CommunityId> {
        let mut ids: Vec<CommunityId> = self
            .db
            .tree_names()
            .iter()
            .filter_map(|name| std::str::from_utf8(name).ok())
            .filter_map(|name| name.strip_prefix(TREE_PREFIX))
            .filter_map(|id| id.parse::<u64>().ok())
            .map(CommunityId)
            .collect();
        ids.sort();
        ids
    }

    /// Open the community's tree, creating it. Only writes may create trees.
    fn tree(&self, community: CommunityId) -> Result<sled::Tree> {
        self.db
            .open_tree(tree_name(community))
            .map_err(|e| StorageError::Backend(format!("Failed to open tree for {}: {}", community, e)))
    }

    /// The community's tree if anything was ever written for it
    fn existing_tree(&self, community: CommunityId) -> Result<Option<sled::Tree>> {
        let name = tree_name(community);
        let exists = self
            .db
            .tree_names()
            .iter()
            .any(|existing| &existing[..] == name.as_bytes());

        if !exists {
            return Ok(None);
        }
        self.tree(community).map(Some)
    }
}

fn tree_name(community: CommunityId) -> String {
    format!("{}{}", TREE_PREFIX, community)
}

impl DocumentStore for SledStore {
    async fn load(&self, community: CommunityId, key: DocumentKey) -> Result<Option<Vec<u8>>> {
        let Some(tree) = self.existing_tree(community)? else {
            return Ok(None);
        };

        match tree.get(key.as_str()) {
            Ok(Some(data)) => Ok(Some(data.to_vec())),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::Backend(format!("Failed to load {}: {}", key, e))),
        }
    }

    async fn store_batch(
        &self,
        community: CommunityId,
        batch: Vec<(DocumentKey, Vec<u8>)>,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let tree = self.tree(community)?;
        let mut writes = sled::Batch::default();
        for (key, value) in batch {
            writes.insert(key.as_str(), value);
        }

        tree.apply_batch(writes)
            .map_err(|e| StorageError::Backend(format!("Failed to write batch: {}", e)))?;

        // A write is only confirmed once it is on disk
        tree.flush()
            .map_err(|e| StorageError::Backend(format!("Failed to flush batch to disk: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let community = CommunityId(7);

        assert!(store.load(community, DocumentKey::Points).await.unwrap().is_none());

        store
            .store_batch(community, vec![(DocumentKey::Points, b"{\"1\":5}".to_vec())])
            .await
            .unwrap();

        let loaded = store.load(community, DocumentKey::Points).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"{\"1\":5}"[..]));
    }

    #[tokio::test]
    async fn test_batch_survives_reopen() {
        let dir = tempdir().unwrap();
        let community = CommunityId(99);

        {
            let store = SledStore::open(dir.path()).unwrap();
            store
                .store_batch(
                    community,
                    vec![
                        (DocumentKey::Bets, b"{}".to_vec()),
                        (DocumentKey::Points, b"{\"3\":10}".to_vec()),
                    ],
                )
                .await
                .unwrap();
        }

        let store = SledStore::open(dir.path()).unwrap();
        assert!(store.load(community, DocumentKey::Bets).await.unwrap().is_some());
        assert!(store.load(community, DocumentKey::Points).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_communities_are_isolated() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();

        store
            .store_batch(CommunityId(2), vec![(DocumentKey::Rewards, b"{}".to_vec())])
            .await
            .unwrap();
        store
            .store_batch(CommunityId(1), vec![(DocumentKey::Rewards, b"{}".to_vec())])
            .await
            .unwrap();

        assert!(store.load(CommunityId(3), DocumentKey::Rewards).await.unwrap().is_none());
        assert_eq!(store.communities(), vec![CommunityId(1), CommunityId(2)]);
    }

    #[tokio::test]
    async fn test_reads_leave_no_trace() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();

        for key in [DocumentKey::Points, DocumentKey::Bets, DocumentKey::Rewards] {
            assert!(store.load(CommunityId(5), key).await.unwrap().is_none());
        }
        assert!(store.communities().is_empty());

        store
            .store_batch(CommunityId(5), vec![(DocumentKey::Points, b"{}".to_vec())])
            .await
            .unwrap();
        assert_eq!(store.communities(), vec![CommunityId(5)]);
        assert!(store.load(CommunityId(5), DocumentKey::Points).await.unwrap().is_some());
    }
}
