//! Per-community serialization of read/modify/write windows
//!
//! The backing store has no transactions, so every mutation of a community's
//! documents runs inside a [`Session`]. Only one session per community is open
//! at a time; sessions for different communities never wait on each other.

use crate::{CommunityId, DocumentKey, DocumentStore, Result, StorageError};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

/// Shared handle to the document store, passed into every component
pub struct Vault<S> {
    store: Arc<S>,
    locks: Arc<DashMap<CommunityId, Arc<Mutex<()>>>>,
}

impl<S> Clone for Vault<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<S: DocumentStore> Vault<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Open a session, waiting until no other session is open for `community`
    pub async fn session(&self, community: CommunityId) -> Session<S> {
        let lock = self
            .locks
            .entry(community)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let guard = lock.lock_owned().await;

        Session {
            community,
            store: self.store.clone(),
            staged: HashMap::new(),
            _guard: guard,
        }
    }
}

/// Exclusive read/modify/write window over one community's documents.
///
/// Staged documents are only written by [`Session::commit`]; dropping the
/// session discards them.
pub struct Session<S> {
    community: CommunityId,
    store: Arc<S>,
    staged: HashMap<DocumentKey, Vec<u8>>,
    _guard: OwnedMutexGuard<()>,
}

impl<S: DocumentStore> Session<S> {
    /// Read a document; a missing document reads as `T::default()`.
    /// Documents staged in this session are returned as staged.
    pub async fn read<T>(&self, key: DocumentKey) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let bytes = match self.staged.get(&key) {
            Some(bytes) => Some(bytes.clone()),
            None => self
                .store
                .load(self.community, key)
                .await
                .inspect_err(|e| {
                    error!(community = %self.community, document = %key, error = %e, "Document load failed")
                })?,
        };

        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                error!(community = %self.community, document = %key, error = %e, "Stored document is malformed");
                StorageError::from(e)
            }),
            None => Ok(T::default()),
        }
    }

    /// Buffer a document for the next commit
    pub fn stage<T: Serialize>(&mut self, key: DocumentKey, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.staged.insert(key, bytes);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Write all staged documents in one batch and release the community
    pub async fn commit(self) -> Result<()> {
        let Session {
            community,
            store,
            staged,
            _guard,
        } = self;

        if staged.is_empty() {
            return Ok(());
        }

        let batch: Vec<(DocumentKey, Vec<u8>)> = staged.into_iter().collect();
        debug!(community = %community, documents = batch.len(), "Committing session");

        let documents = batch.len();
        store.store_batch(community, batch).await.inspect_err(|e| {
            error!(community = %community, documents, error = %e, "Commit failed, nothing written");
        })
    }
}
