//! Voice presence read from a JSON snapshot
//!
//! The gateway adapter rewrites the snapshot whenever voice state changes:
//!
//! ```json
//! { "1234": [ { "id": 7, "display_name": "kirby", "self_deaf": false, "deaf": false, "afk": false } ] }
//! ```

use kirbec_ledger::{CommunityId, LedgerError, PresenceSource, Result, VoiceState};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Snapshot = BTreeMap<String, Vec<VoiceState>>;

pub struct JsonPresenceSource {
    path: PathBuf,
}

impl JsonPresenceSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No voice snapshot yet");
                return Ok(Snapshot::new());
            }
            Err(e) => {
                return Err(LedgerError::Presence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            LedgerError::Presence(format!("Malformed snapshot {}: {}", self.path.display(), e))
        })
    }
}

impl PresenceSource for JsonPresenceSource {
    async fn communities(&self) -> Result<Vec<CommunityId>> {
        let snapshot = self.snapshot().await?;
        let mut communities = Vec::with_capacity(snapshot.len());
        for key in snapshot.keys() {
            match key.parse::<u64>() {
                Ok(id) => communities.push(CommunityId(id)),
                Err(_) => warn!(key = %key, "Ignoring non-numeric community in snapshot"),
            }
        }
        Ok(communities)
    }

    async fn active_voice(&self, community: CommunityId) -> Result<Vec<VoiceState>> {
        let mut snapshot = self.snapshot().await?;
        Ok(snapshot.remove(&community.to_string()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonPresenceSource::new(dir.path().join("voice.json"));
        assert!(source.communities().await.unwrap().is_empty());
        assert!(source.active_voice(CommunityId(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(
            &path,
            r#"{
                "1234": [
                    {"id": 7, "display_name": "kirby", "self_deaf": false, "deaf": false, "afk": false},
                    {"id": 8, "display_name": "meta", "is_administrator": true, "self_deaf": true, "deaf": false, "afk": false}
                ],
                "lobby": []
            }"#,
        )
        .unwrap();

        let source = JsonPresenceSource::new(&path);
        assert_eq!(source.communities().await.unwrap(), vec![CommunityId(1234)]);

        let voice = source.active_voice(CommunityId(1234)).await.unwrap();
        assert_eq!(voice.len(), 2);
        assert!(voice[0].is_tracked());
        assert!(!voice[1].is_tracked());
        assert!(voice[1].member.is_administrator);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.json");
        std::fs::write(&path, "not json").unwrap();

        let source = JsonPresenceSource::new(&path);
        assert!(matches!(
            source.communities().await,
            Err(LedgerError::Presence(_))
        ));
    }
}
