//! The Kernel: the service context of the provenance engine.
//!
//! The Kernel owns the service keys and the log client and exposes the
//! registrar, issuer, verifier and revocation operations on top of them.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use provenance_kernel_core::{
    decode_all, decode_matching, encode, encode_envelope, format_timestamp, verify_value_with, ChannelId,
    CodecError, Creator, Credential, CredentialArtifact, CredentialBuilder, Did, DidDocument, Envelope,
    IdentityRecord, LogMessage, RevocationNotice, RevocationStatus, SigningIdentity,
    VerificationReport, VerifyOptions,
};
use provenance_kernel_log::{AppendReceipt, LogClient, ReadOrder};

use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::retry::with_retry;
use crate::service::{load_sentinel, save_sentinel, SentinelRecord, ServiceIdentity};
use crate::warning::{Stage, Warning};

/// Inputs of a credential issuance.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub issuer: Did,
    /// Channel of the work the credential is about.
    pub subject_channel: ChannelId,
    /// The issuer's own channel, which receives a second copy.
    pub issuer_channel: Option<ChannelId>,
    pub title: String,
    /// Empty means the issuer holds 100%.
    pub creators: Vec<Creator>,
    pub artifacts: Vec<CredentialArtifact>,
    pub master_hash: Option<String>,
    pub contribution_count: u32,
}

/// A signed credential and the publishing stages that did not complete.
#[derive(Debug, Clone, Serialize)]
pub struct Issuance {
    pub credential: Credential,
    pub warnings: Vec<Warning>,
}

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Publishing documents to channels (chunked when oversized)
/// - Registering and resolving identities
/// - Issuing, verifying and revoking credentials
/// - Assembling provenance packages (see `package`)
pub struct Kernel<L: LogClient> {
    identity: ServiceIdentity,
    log: Arc<L>,
    config: KernelConfig,
    sentinel: Option<SentinelRecord>,
    startup_warnings: Vec<Warning>,
}

impl<L: LogClient> Kernel<L> {
    /// Create a kernel without a published sentinel.
    pub fn new(identity: ServiceIdentity, log: L, config: KernelConfig) -> Self {
        Self {
            identity,
            log: Arc::new(log),
            config,
            sentinel: None,
            startup_warnings: Vec::new(),
        }
    }

    /// Create a kernel and bootstrap the sentinel identity.
    ///
    /// A failed bootstrap leaves the kernel running without co-signing.
    pub async fn start(identity: ServiceIdentity, log: L, config: KernelConfig) -> Self {
        let mut kernel = Self::new(identity, log, config);
        if kernel.identity.sentinel_key().is_some() {
            if let Err(e) = kernel.bootstrap_sentinel().await {
                let warning = Warning::record(Stage::Sentinel, format!("sentinel unavailable: {e}"));
                kernel.startup_warnings.push(warning);
            }
        } else {
            info!("no sentinel key configured; credentials carry only the issuer proof");
        }
        kernel
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn sentinel(&self) -> Option<&SentinelRecord> {
        self.sentinel.as_ref()
    }

    /// Stages that failed while starting, such as the sentinel bootstrap.
    pub fn startup_warnings(&self) -> &[Warning] {
        &self.startup_warnings
    }

    /// The DID of the service key anchored on `channel`.
    pub fn issuer_did(&self, channel: &ChannelId) -> Result<Did> {
        Ok(Did::derive(
            &self.config.network,
            &self.identity.public_key(),
            channel,
        )?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sentinel
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the persisted sentinel or publish a new one.
    pub async fn bootstrap_sentinel(&mut self) -> Result<&SentinelRecord> {
        let key = self
            .identity
            .sentinel_key()
            .ok_or_else(|| KernelError::InvalidRequest("no sentinel key configured".into()))?
            .public_key();

        if let Some(path) = &self.config.sentinel_state_path {
            match load_sentinel(path).await? {
                Some(record) if record.matches(&key, &self.config.network) => {
                    info!(did = %record.did, "sentinel loaded");
                    return Ok(&*self.sentinel.insert(record));
                }
                Some(record) => {
                    warn!(did = %record.did, "persisted sentinel does not match the configured key, recreating");
                }
                None => {}
            }
        }

        let memo = format!("DID:sentinel:{}", self.config.platform_name);
        let channel = self.create_channel(&memo).await?;
        let did = Did::derive(&self.config.network, &key, &channel)?;
        let document = DidDocument::sentinel(
            &did,
            &self.config.platform_name,
            &format_timestamp(Utc::now()),
        );
        self.publish(&channel, &Envelope::DidDocument(document.clone()))
            .await?;

        let record = SentinelRecord {
            did,
            channel_id: channel,
            did_document: document,
        };
        if let Some(path) = &self.config.sentinel_state_path {
            save_sentinel(path, &record).await?;
        }
        info!(did = %record.did, "sentinel created");
        Ok(&*self.sentinel.insert(record))
    }

    fn sentinel_signer(&self) -> Option<SigningIdentity<'_>> {
        match (self.identity.sentinel_key(), &self.sentinel) {
            (Some(keypair), Some(record)) => Some(SigningIdentity {
                keypair,
                did: &record.did,
            }),
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channel Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_channel(&self, memo: &str) -> Result<ChannelId> {
        let log = &self.log;
        let channel = with_retry(
            &self.config.retry,
            self.config.operation_timeout,
            "create_channel",
            || log.create_channel(memo),
        )
        .await?;
        Ok(channel)
    }

    /// Append one raw payload.
    pub async fn append(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt> {
        let log = &self.log;
        let receipt = with_retry(
            &self.config.retry,
            self.config.operation_timeout,
            "append_message",
            || log.append_message(channel, payload.clone()),
        )
        .await?;
        Ok(receipt)
    }

    pub async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>> {
        let log = &self.log;
        let messages = with_retry(
            &self.config.retry,
            self.config.operation_timeout,
            "read_messages",
            || log.read_messages(channel, order, limit),
        )
        .await?;
        Ok(messages)
    }

    /// Publish a document, split into fragments when oversized.
    ///
    /// Fragments are appended in index order with `append_interval` between
    /// them. Each append is retried on its own.
    pub async fn publish(
        &self,
        channel: &ChannelId,
        envelope: &Envelope,
    ) -> Result<Vec<AppendReceipt>> {
        let payloads = encode_envelope(envelope, &self.config.chunk)?;
        self.append_all(channel, payloads).await
    }

    /// Publish arbitrary text, chunked like any document.
    pub async fn publish_text(&self, channel: &ChannelId, text: &str) -> Result<Vec<AppendReceipt>> {
        if text.is_empty() {
            return Err(KernelError::InvalidRequest("message is empty".into()));
        }
        let payloads = encode(text, &self.config.chunk)?;
        self.append_all(channel, payloads).await
    }

    async fn append_all(
        &self,
        channel: &ChannelId,
        payloads: Vec<String>,
    ) -> Result<Vec<AppendReceipt>> {
        let total = payloads.len();
        let mut receipts = Vec::with_capacity(total);

        for (i, payload) in payloads.into_iter().enumerate() {
            if i > 0 && !self.config.append_interval.is_zero() {
                tokio::time::sleep(self.config.append_interval).await;
            }
            let receipt = self.append(channel, Bytes::from(payload)).await?;
            debug!(%channel, seq = receipt.sequence_number, fragment = i, total, "appended");
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity Registrar
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an artist identity on a new channel.
    ///
    /// Registration is complete only once the document is durably appended;
    /// a publish failure is returned to the caller.
    pub async fn register_identity(
        &self,
        name: &str,
        attributes: Map<String, Value>,
    ) -> Result<IdentityRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(KernelError::InvalidRequest("identity name is empty".into()));
        }

        let channel = self.create_channel(&format!("DID:artist:{name}")).await?;
        let did = self.issuer_did(&channel)?;
        let document =
            DidDocument::artist(&did, name, attributes, &format_timestamp(Utc::now()));
        self.publish(&channel, &Envelope::DidDocument(document.clone()))
            .await?;

        info!(%did, "identity registered");
        Ok(IdentityRecord::from_document(document)?)
    }

    /// Resolve the identity anchored on `channel` from its first messages.
    pub async fn resolve_identity(&self, channel: &ChannelId) -> Result<IdentityRecord> {
        let messages = self
            .read_messages(
                channel,
                ReadOrder::Ascending,
                Some(self.config.resolve_scan_limit),
            )
            .await?;

        let found = decode_matching(&messages, |e| matches!(e, Envelope::DidDocument(_)));
        match found {
            Ok(Envelope::DidDocument(document)) => Ok(IdentityRecord::from_document(document)?),
            Ok(_) | Err(CodecError::NoDocument) => {
                Err(KernelError::NotFound(format!(
                    "no DID document in the first {} messages of {channel}",
                    self.config.resolve_scan_limit
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve, polling until the document becomes readable or the
    /// configured maximum wait elapses.
    pub async fn resolve_identity_with_wait(&self, channel: &ChannelId) -> Result<IdentityRecord> {
        let deadline = Instant::now() + self.config.resolve_max_wait;
        loop {
            match self.resolve_identity(channel).await {
                Err(e @ (KernelError::NotFound(_) | KernelError::Reassembly(_))) => {
                    let next = Instant::now() + self.config.resolve_poll_interval;
                    if next > deadline {
                        return Err(e);
                    }
                    debug!(%channel, error = %e, "identity not readable yet, polling");
                    tokio::time::sleep(self.config.resolve_poll_interval).await;
                }
                other => return other,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credential Issuer / Verifier
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue, dual-sign and publish a credential.
    ///
    /// Validation failures return before any signing or publishing. Publish
    /// failures become warnings; the signed credential is still returned.
    pub async fn issue_credential(&self, request: IssueRequest) -> Result<Issuance> {
        if request.issuer.public_key() != &self.identity.public_key() {
            return Err(KernelError::InvalidRequest(format!(
                "issuer {} is not controlled by this service",
                request.issuer
            )));
        }

        let mut builder = CredentialBuilder::new(request.issuer, request.subject_channel.clone())
            .title(request.title)
            .creators(request.creators)
            .artifacts(request.artifacts)
            .contribution_count(request.contribution_count);
        if let Some(hash) = request.master_hash {
            builder = builder.master_hash(hash);
        }

        let credential = builder
            .build()?
            .sign(self.identity.issuer_key(), self.sentinel_signer())?;
        if credential.proof.len() < 2 {
            debug!(id = %credential.id, "issued without sentinel attestation");
        }

        let envelope = Envelope::from(credential.clone());
        let mut warnings = Vec::new();
        if let Err(e) = self.publish(&request.subject_channel, &envelope).await {
            warnings.push(Warning::record(
                Stage::PublishSubject,
                format!("{}: {e}", request.subject_channel),
            ));
        }
        if let Some(issuer_channel) = request
            .issuer_channel
            .filter(|c| *c != request.subject_channel)
        {
            if let Err(e) = self.publish(&issuer_channel, &envelope).await {
                warnings.push(Warning::record(
                    Stage::PublishIssuer,
                    format!("{issuer_channel}: {e}"),
                ));
            }
        }

        info!(id = %credential.id, proofs = credential.proof.len(), "credential issued");
        Ok(Issuance {
            credential,
            warnings,
        })
    }

    /// Verify a credential given as JSON. Never touches the log.
    ///
    /// The authentication proof must come from this platform's sentinel;
    /// without one, attestation fails.
    pub fn verify(&self, credential: &Value) -> VerificationReport {
        let sentinel = self.sentinel.as_ref().map(|s| s.did.clone());
        verify_value_with(credential, &VerifyOptions::pinned(sentinel))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Revocation Tracker
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a revocation notice to the credential's channel.
    pub async fn revoke(
        &self,
        channel: &ChannelId,
        credential_id: &str,
        reason: &str,
        authority: &str,
    ) -> Result<RevocationNotice> {
        if credential_id.is_empty() || authority.is_empty() {
            return Err(KernelError::InvalidRequest(
                "credential id and authority are required".into(),
            ));
        }

        let notice = RevocationNotice::new(credential_id, reason, authority, Utc::now());
        self.publish(channel, &Envelope::Revocation(notice.clone()))
            .await?;
        info!(%channel, credential_id, "credential revoked");
        Ok(notice)
    }

    /// Fold the channel's full history into the credential's status.
    pub async fn revocation_status(
        &self,
        channel: &ChannelId,
        credential_id: &str,
    ) -> Result<RevocationStatus> {
        let messages = self.read_messages(channel, ReadOrder::Ascending, None).await?;
        let decoded = decode_all(&messages);
        if decoded.skipped > 0 {
            debug!(%channel, skipped = decoded.skipped, "undecodable messages during status scan");
        }
        Ok(RevocationStatus::from_documents(
            credential_id,
            decoded.documents.iter().map(|d| &d.envelope),
        ))
    }
}
