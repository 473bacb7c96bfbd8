//! The service identity and the platform sentinel record.
//!
//! Key material is owned by the kernel, built once at startup and only
//! borrowed afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use provenance_kernel_core::{ChannelId, Did, DidDocument, Ed25519PublicKey, Keypair};

use crate::error::Result;

/// Signing keys of the service.
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    issuer: Keypair,
    sentinel: Option<Keypair>,
}

impl ServiceIdentity {
    pub fn new(issuer: Keypair) -> Self {
        Self {
            issuer,
            sentinel: None,
        }
    }

    /// Add a platform sentinel key for co-signing.
    pub fn with_sentinel(mut self, sentinel: Keypair) -> Self {
        if sentinel.public_key() == self.issuer.public_key() {
            warn!("sentinel key equals issuer key; the authentication proof is not independent");
        }
        self.sentinel = Some(sentinel);
        self
    }

    pub fn issuer_key(&self) -> &Keypair {
        &self.issuer
    }

    pub fn sentinel_key(&self) -> Option<&Keypair> {
        self.sentinel.as_ref()
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.issuer.public_key()
    }
}

/// The published sentinel identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentinelRecord {
    pub did: Did,
    pub channel_id: ChannelId,
    pub did_document: DidDocument,
}

impl SentinelRecord {
    /// Whether the record belongs to this key on this network.
    pub fn matches(&self, key: &Ed25519PublicKey, network: &str) -> bool {
        self.did.public_key() == key
            && self.did.network() == network
            && self.did_document.public_key().is_ok_and(|k| &k == key)
    }
}

/// Load a persisted record; `Ok(None)` when the file is absent or corrupt.
pub(crate) async fn load_sentinel(path: &Path) -> Result<Option<SentinelRecord>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt sentinel state, recreating");
            Ok(None)
        }
    }
}

pub(crate) async fn save_sentinel(path: &Path, record: &SentinelRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(seed: u8) -> SentinelRecord {
        let key = Keypair::from_seed(&[seed; 32]);
        let did = Did::derive("testnet", &key.public_key(), &ChannelId::from("0.0.1001")).unwrap();
        SentinelRecord {
            did_document: DidDocument::sentinel(&did, "ProvenanceStudio", "2026-01-01T00:00:00.000Z"),
            channel_id: ChannelId::from("0.0.1001"),
            did,
        }
    }

    #[tokio::test]
    async fn test_sentinel_state_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("sentinel.json");
        assert!(load_sentinel(&path).await.unwrap().is_none());

        let saved = record(3);
        save_sentinel(&path, &saved).await.unwrap();
        assert_eq!(load_sentinel(&path).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert!(load_sentinel(&path).await.unwrap().is_none());
    }

    #[test]
    fn test_record_matches_key_and_network() {
        let r = record(3);
        let key = Keypair::from_seed(&[3; 32]).public_key();
        assert!(r.matches(&key, "testnet"));
        assert!(!r.matches(&key, "mainnet"));
        assert!(!r.matches(&Keypair::from_seed(&[4; 32]).public_key(), "testnet"));
    }
}
