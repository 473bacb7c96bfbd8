//! Ownership credentials: model, share validation, and dual signing.
//!
//! A credential asserts who created a work and how ownership is split. The
//! signing digest is `SHA-256(canonical_json(credential without "proof"))`;
//! the issuer signs it for an assertion proof and, when configured, the
//! platform sentinel signs the same digest for an authentication proof.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::canonical::canonical_digest;
use crate::crypto::{Keypair, Sha256Hash};
use crate::error::CoreError;
use crate::identity::{ISSUER_KEY_FRAGMENT, SENTINEL_KEY_FRAGMENT};
use crate::types::{format_timestamp, ChannelId, Did};

/// JSON-LD contexts of every credential.
pub const CREDENTIAL_CONTEXT: [&str; 2] = [
    "https://www.w3.org/2018/credentials/v1",
    "https://www.w3.org/2018/credentials/examples/v1",
];

/// Types of every credential.
pub const CREDENTIAL_TYPE: [&str; 2] = ["VerifiableCredential", "ProvenanceCredential"];

/// Proof suite name written into each proof.
pub const PROOF_TYPE: &str = "Ed25519Signature2020";

/// The only acceptable sum of creator shares.
pub const TOTAL_SHARES: u64 = 100;

/// Role given to the issuer when no creators are supplied.
pub const DEFAULT_CREATOR_ROLE: &str = "artist";

/// Why a proof was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofPurpose {
    /// Issuer assertion of the credential contents.
    #[serde(rename = "assertionMethod")]
    Assertion,
    /// Platform sentinel attestation.
    #[serde(rename = "authentication")]
    Authentication,
}

impl ProofPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            ProofPurpose::Assertion => "assertionMethod",
            ProofPurpose::Authentication => "authentication",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "assertionMethod" => Some(ProofPurpose::Assertion),
            "authentication" => Some(ProofPurpose::Authentication),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub kind: String,
    pub created: String,
    pub proof_purpose: ProofPurpose,
    pub verification_method: String,
    /// Hex-encoded Ed25519 signature over the signing digest.
    pub proof_value: String,
}

/// One creator and their ownership share (percent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub did: String,
    pub role: String,
    pub share: u32,
}

impl Creator {
    pub fn new(did: impl Into<String>, role: impl Into<String>, share: u32) -> Self {
        Self {
            did: did.into(),
            role: role.into(),
            share,
        }
    }
}

/// An artifact listed in the credential subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialArtifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Where the work's provenance chain is anchored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceChainRef {
    pub network: String,
    pub channel_id: ChannelId,
    pub contribution_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub creators: Vec<Creator>,
    pub provenance_chain: ProvenanceChainRef,
    pub artifacts: Vec<CredentialArtifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_hash: Option<String>,
}

/// A signed ownership credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: Did,
    pub valid_from: String,
    pub credential_subject: CredentialSubject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proof: Vec<Proof>,
}

impl Credential {
    /// The credential as JSON with the `proof` member removed.
    pub fn unsigned_value(&self) -> Result<Value, CoreError> {
        let mut value = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut value {
            map.remove("proof");
        }
        Ok(value)
    }

    /// The digest every proof signs.
    pub fn signing_digest(&self) -> Result<Sha256Hash, CoreError> {
        canonical_digest(&self.unsigned_value()?)
    }

    /// First proof with the given purpose.
    pub fn proof_for(&self, purpose: ProofPurpose) -> Option<&Proof> {
        self.proof.iter().find(|p| p.proof_purpose == purpose)
    }
}

/// Sum of creator shares in integer arithmetic.
pub fn share_total(creators: &[Creator]) -> u64 {
    creators.iter().map(|c| u64::from(c.share)).sum()
}

/// Reject any creator set whose shares do not sum to exactly 100.
pub fn validate_shares(creators: &[Creator]) -> Result<(), CoreError> {
    let sum = share_total(creators);
    if creators.is_empty() || sum != TOTAL_SHARES {
        return Err(CoreError::InvalidShares { sum });
    }
    Ok(())
}

/// A fresh `urn:uuid:` credential identifier.
pub fn new_credential_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

/// Key material and DID of a co-signer.
#[derive(Debug, Clone, Copy)]
pub struct SigningIdentity<'a> {
    pub keypair: &'a Keypair,
    pub did: &'a Did,
}

/// Builder for credentials.
///
/// `build` validates shares before anything is signed; an invalid share set
/// never reaches a signing key.
#[derive(Debug, Clone)]
pub struct CredentialBuilder {
    issuer: Did,
    subject_channel: ChannelId,
    title: String,
    creators: Vec<Creator>,
    artifacts: Vec<CredentialArtifact>,
    master_hash: Option<String>,
    contribution_count: u32,
    id: Option<String>,
    issued_at: Option<DateTime<Utc>>,
}

impl CredentialBuilder {
    pub fn new(issuer: Did, subject_channel: ChannelId) -> Self {
        Self {
            issuer,
            subject_channel,
            title: "Untitled".to_string(),
            creators: Vec::new(),
            artifacts: Vec::new(),
            master_hash: None,
            contribution_count: 0,
            id: None,
            issued_at: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Explicit creators. An empty list falls back to the issuer at 100%.
    pub fn creators(mut self, creators: Vec<Creator>) -> Self {
        self.creators = creators;
        self
    }

    pub fn artifacts(mut self, artifacts: Vec<CredentialArtifact>) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn master_hash(mut self, master_hash: impl Into<String>) -> Self {
        self.master_hash = Some(master_hash.into());
        self
    }

    pub fn contribution_count(mut self, count: u32) -> Self {
        self.contribution_count = count;
        self
    }

    /// Override the generated `urn:uuid:` identifier.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Override the issuance time (defaults to now).
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// Validate and construct the unsigned credential.
    pub fn build(self) -> Result<UnsignedCredential, CoreError> {
        let creators = if self.creators.is_empty() {
            vec![Creator::new(
                self.issuer.to_string(),
                DEFAULT_CREATOR_ROLE,
                TOTAL_SHARES as u32,
            )]
        } else {
            self.creators
        };
        validate_shares(&creators)?;

        let issued_at = format_timestamp(self.issued_at.unwrap_or_else(Utc::now));
        let network = self.issuer.network().to_string();

        let credential = Credential {
            context: CREDENTIAL_CONTEXT.iter().map(|s| s.to_string()).collect(),
            id: self.id.unwrap_or_else(new_credential_id),
            types: CREDENTIAL_TYPE.iter().map(|s| s.to_string()).collect(),
            issuer: self.issuer,
            valid_from: issued_at,
            credential_subject: CredentialSubject {
                id: format!("{}:{}:channel:{}", Did::METHOD, network, self.subject_channel),
                kind: "CreativeWork".to_string(),
                title: self.title,
                creators,
                provenance_chain: ProvenanceChainRef {
                    network,
                    channel_id: self.subject_channel,
                    contribution_count: self.contribution_count,
                },
                artifacts: self.artifacts,
                master_hash: self.master_hash,
            },
            proof: Vec::new(),
        };

        let digest = credential.signing_digest()?;
        Ok(UnsignedCredential { credential, digest })
    }
}

/// A validated credential body and its signing digest.
#[derive(Debug, Clone)]
pub struct UnsignedCredential {
    credential: Credential,
    digest: Sha256Hash,
}

impl UnsignedCredential {
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn digest(&self) -> Sha256Hash {
        self.digest
    }

    /// Attach proofs in the order `[assertion, authentication]`.
    ///
    /// The issuer keypair must be the key embedded in the issuer DID.
    pub fn sign(
        self,
        issuer: &Keypair,
        sentinel: Option<SigningIdentity<'_>>,
    ) -> Result<Credential, CoreError> {
        let mut credential = self.credential;
        if &issuer.public_key() != credential.issuer.public_key() {
            return Err(CoreError::KeyMismatch(credential.issuer.to_string()));
        }

        let created = credential.valid_from.clone();
        credential.proof.push(Proof {
            kind: PROOF_TYPE.to_string(),
            created: created.clone(),
            proof_purpose: ProofPurpose::Assertion,
            verification_method: credential.issuer.key_reference(ISSUER_KEY_FRAGMENT),
            proof_value: issuer.sign(self.digest.as_bytes()).to_hex(),
        });

        if let Some(sentinel) = sentinel {
            if &sentinel.keypair.public_key() != sentinel.did.public_key() {
                return Err(CoreError::KeyMismatch(sentinel.did.to_string()));
            }
            credential.proof.push(Proof {
                kind: PROOF_TYPE.to_string(),
                created,
                proof_purpose: ProofPurpose::Authentication,
                verification_method: sentinel.did.key_reference(SENTINEL_KEY_FRAGMENT),
                proof_value: sentinel.keypair.sign(self.digest.as_bytes()).to_hex(),
            });
        }

        Ok(credential)
    }
}
