//! The provenance manifest and its master hash.
//!
//! A manifest is computed fresh for each package assembly and never
//! mutated; `master_hash = SHA-256(canonical_json(manifest))`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_json_of;
use crate::crypto::Sha256Hash;
use crate::error::CoreError;
use crate::types::{format_timestamp, ChannelId, LogMessage};

pub const MANIFEST_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    #[default]
    Idea,
    Drafting,
    Iterating,
    Review,
    Final,
    Submitted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMetadata {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub status: SongStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionRole {
    Lyricist,
    Producer,
    PromptEngineer,
    CreativeDirector,
    Mixer,
    Reviewer,
    AiEngine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Human,
    Ai,
    Hybrid,
}

/// Where a contribution was previously anchored on the song's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub sequence_number: u64,
    pub timestamp: String,
}

/// A contribution as recorded by the CRUD layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionRecord {
    pub position: i64,
    pub role: ContributionRole,
    pub actor_type: ActorType,
    pub actor_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub anchor: Option<Anchor>,
}

/// One entry of the manifest's provenance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub position: i64,
    pub role: ContributionRole,
    pub actor_type: ActorType,
    pub actor_name: String,
    pub description: String,
    pub evidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl From<&ContributionRecord> for ChainEntry {
    fn from(c: &ContributionRecord) -> Self {
        Self {
            position: c.position,
            role: c.role,
            actor_type: c.actor_type,
            actor_name: c.actor_name.clone(),
            description: c.description.clone(),
            evidence: c.evidence.clone(),
            sequence_number: c.anchor.as_ref().map(|a| a.sequence_number),
            timestamp: c.anchor.as_ref().map(|a| a.timestamp.clone()),
        }
    }
}

/// Order contributions by declared position; ties keep input order.
pub fn provenance_chain(contributions: &[ContributionRecord]) -> Vec<ChainEntry> {
    let mut ordered: Vec<&ContributionRecord> = contributions.iter().collect();
    ordered.sort_by_key(|c| c.position);
    ordered.into_iter().map(ChainEntry::from).collect()
}

/// A hashed artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub version: u32,
    pub sha256: String,
    pub size_bytes: u64,
    pub file_path: String,
}

impl ArtifactEntry {
    /// An audio artifact hashed from its full contents.
    pub fn audio(name: &str, version: u32, file_path: &str, contents: &[u8]) -> Self {
        Self {
            kind: "audio".to_string(),
            name: name.to_string(),
            version,
            sha256: Sha256Hash::hash(contents).to_hex(),
            size_bytes: contents.len() as u64,
            file_path: file_path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHash {
    pub name: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub network: String,
    pub channel_id: Option<ChannelId>,
    pub message_count: u64,
}

/// One message of the on-chain snapshot.
///
/// `payload` is the exact text read from the log, never re-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub sequence_number: u64,
    pub timestamp: i64,
    pub payload: String,
}

impl From<&LogMessage> for SnapshotEntry {
    fn from(m: &LogMessage) -> Self {
        Self {
            sequence_number: m.sequence_number,
            timestamp: m.timestamp,
            payload: String::from_utf8_lossy(&m.payload).into_owned(),
        }
    }
}

/// Stamp of a master hash on a song's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceCertificate {
    pub master_hash: String,
    pub artifact_count: u32,
    pub contribution_count: u32,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub generated_at: String,
    pub song: SongMetadata,
    pub log: LogSummary,
    pub artifacts: Vec<ArtifactEntry>,
    pub provenance_chain: Vec<ChainEntry>,
    pub on_chain_verification: Vec<SnapshotEntry>,
    pub artifact_hashes: Vec<ArtifactHash>,
}

impl Manifest {
    pub fn new(
        song: SongMetadata,
        log: LogSummary,
        artifacts: Vec<ArtifactEntry>,
        provenance_chain: Vec<ChainEntry>,
        on_chain_verification: Vec<SnapshotEntry>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let artifact_hashes = artifacts
            .iter()
            .map(|a| ArtifactHash {
                name: a.name.clone(),
                sha256: a.sha256.clone(),
            })
            .collect();
        Self {
            version: MANIFEST_VERSION.to_string(),
            generated_at: format_timestamp(generated_at),
            song,
            log,
            artifacts,
            provenance_chain,
            on_chain_verification,
            artifact_hashes,
        }
    }

    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        canonical_json_of(self)
    }

    pub fn master_hash(&self) -> Result<Sha256Hash, CoreError> {
        Ok(Sha256Hash::hash(&self.canonical_bytes()?))
    }

    /// The certificate stamped back onto the song's channel.
    pub fn certificate(&self, master_hash: &Sha256Hash) -> ProvenanceCertificate {
        ProvenanceCertificate {
            master_hash: master_hash.to_hex(),
            artifact_count: self.artifacts.len() as u32,
            contribution_count: self.provenance_chain.len() as u32,
            generated_at: self.generated_at.clone(),
        }
    }
}
