//! Package assembly: manifest, master hash, certificate stamp and credential.
//!
//! Every stage after input validation is best effort. A package is always
//! returned; what could not be done is listed in its warnings.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use provenance_kernel_core::{
    provenance_chain, validate_shares, ArtifactEntry, ChannelId, ContributionRecord, Creator,
    Credential, CredentialArtifact, Did, Envelope, LogSummary, Manifest, SnapshotEntry,
    SongMetadata,
};
use provenance_kernel_log::{LogClient, ReadOrder};

use crate::error::{KernelError, Result};
use crate::kernel::{IssueRequest, Kernel};
use crate::warning::{Stage, Warning};

/// A rendered audio file of a song, relative to the artifact root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackFile {
    pub title: String,
    pub version: u32,
    pub file_path: String,
}

/// Everything the assembler needs to know about one song.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongContext {
    pub song: SongMetadata,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub tracks: Vec<TrackFile>,
    #[serde(default)]
    pub contributions: Vec<ContributionRecord>,
    /// When set, a credential over the master hash is issued.
    #[serde(default)]
    pub issuer: Option<Did>,
    #[serde(default)]
    pub issuer_channel: Option<ChannelId>,
    #[serde(default)]
    pub creators: Vec<Creator>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub master_hash: String,
    pub manifest: Manifest,
    pub credential: Option<Credential>,
    /// DID of the sentinel that co-signed the credential, if any.
    pub sentinel: Option<Did>,
    pub warnings: Vec<Warning>,
}

/// Resolve `file_path` under `root`, refusing anything that escapes it.
///
/// One leading `/` is relative to the root, as in `/uploads/v1.wav`.
fn artifact_path(root: &Path, file_path: &str) -> Option<PathBuf> {
    let relative = file_path.strip_prefix('/').unwrap_or(file_path);
    let safe = !relative.is_empty()
        && Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then(|| root.join(relative))
}

impl<L: LogClient> Kernel<L> {
    /// Assemble the provenance package of a song.
    ///
    /// A package is produced whenever the manifest can be hashed. A creator
    /// share set that does not sum to 100, or an issuer this service cannot
    /// sign for, skips the credential with a warning; it is checked before
    /// anything is published.
    pub async fn assemble_package(&self, ctx: SongContext) -> Result<Package> {
        let mut warnings = Vec::new();

        let issuer = match self.credential_issuer(ctx.issuer, &ctx.creators) {
            Ok(issuer) => issuer,
            Err(e) => {
                warnings.push(Warning::record(Stage::CredentialIssue, e));
                None
            }
        };

        let artifacts = self.hash_tracks(&ctx.tracks, &mut warnings).await;
        let chain = provenance_chain(&ctx.contributions);

        let snapshot = match &ctx.channel_id {
            Some(channel) => match self.read_messages(channel, ReadOrder::Ascending, None).await {
                Ok(messages) => messages.iter().map(SnapshotEntry::from).collect(),
                Err(e) => {
                    warnings.push(Warning::record(
                        Stage::OnChainSnapshot,
                        format!("{channel}: {e}"),
                    ));
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        let log = LogSummary {
            network: self.config().network.clone(),
            channel_id: ctx.channel_id.clone(),
            message_count: snapshot.len() as u64,
        };
        let manifest = Manifest::new(ctx.song, log, artifacts, chain, snapshot, Utc::now());
        let master_hash = manifest.master_hash()?;
        debug!(%master_hash, "manifest hashed");

        let mut credential = None;
        if let Some(channel) = &ctx.channel_id {
            let certificate = manifest.certificate(&master_hash);
            if let Err(e) = self
                .publish(channel, &Envelope::Certificate(certificate))
                .await
            {
                warnings.push(Warning::record(
                    Stage::CertificateStamp,
                    format!("{channel}: {e}"),
                ));
            }

            if let Some(issuer) = issuer {
                let request = IssueRequest {
                    issuer,
                    subject_channel: channel.clone(),
                    issuer_channel: ctx.issuer_channel,
                    title: manifest.song.title.clone(),
                    creators: ctx.creators,
                    artifacts: manifest
                        .artifacts
                        .iter()
                        .map(|a| CredentialArtifact {
                            kind: a.kind.clone(),
                            name: a.name.clone(),
                            sha256: Some(a.sha256.clone()),
                        })
                        .collect(),
                    master_hash: Some(master_hash.to_hex()),
                    contribution_count: manifest.provenance_chain.len() as u32,
                };
                match self.issue_credential(request).await {
                    Ok(issuance) => {
                        warnings.extend(issuance.warnings);
                        credential = Some(issuance.credential);
                    }
                    Err(e) => {
                        warnings.push(Warning::record(Stage::CredentialIssue, e));
                    }
                }
            }
        }

        let sentinel = credential
            .as_ref()
            .filter(|c| c.proof.len() > 1)
            .and_then(|_| self.sentinel())
            .map(|s| s.did.clone());

        info!(
            %master_hash,
            artifacts = manifest.artifacts.len(),
            warnings = warnings.len(),
            "package assembled"
        );
        Ok(Package {
            master_hash: master_hash.to_hex(),
            manifest,
            credential,
            sentinel,
            warnings,
        })
    }

    fn credential_issuer(&self, issuer: Option<Did>, creators: &[Creator]) -> Result<Option<Did>> {
        let Some(issuer) = issuer else {
            return Ok(None);
        };
        if !creators.is_empty() {
            validate_shares(creators)?;
        }
        if issuer.public_key() != &self.identity().public_key() {
            return Err(KernelError::InvalidRequest(format!(
                "issuer {issuer} is not controlled by this service"
            )));
        }
        Ok(Some(issuer))
    }

    async fn hash_tracks(
        &self,
        tracks: &[TrackFile],
        warnings: &mut Vec<Warning>,
    ) -> Vec<ArtifactEntry> {
        let root = &self.config().artifact_root;
        let mut artifacts = Vec::with_capacity(tracks.len());
        for track in tracks {
            let Some(path) = artifact_path(root, &track.file_path) else {
                warnings.push(Warning::record(
                    Stage::ArtifactHash,
                    format!("{}: path outside the artifact root", track.file_path),
                ));
                continue;
            };
            match tokio::fs::read(&path).await {
                Ok(contents) => artifacts.push(ArtifactEntry::audio(
                    &track.title,
                    track.version,
                    &track.file_path,
                    &contents,
                )),
                Err(e) => warnings.push(Warning::record(
                    Stage::ArtifactHash,
                    format!("{}: {e}", track.file_path),
                )),
            }
        }
        artifacts
    }
}
