//! # Provenance Kernel Core
//!
//! Pure primitives for the Provenance Kernel: identifiers, the wire envelope,
//! chunking, credentials, verification, and manifests.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! deterministic computation over JSON documents and Ed25519 keys.
//!
//! ## Key Types
//!
//! - [`Did`] - Identifier derived from a public key and a channel id
//! - [`Envelope`] - Tagged union of every payload written to a channel
//! - [`Credential`] - Dual-signed ownership credential
//! - [`Manifest`] - Deterministic provenance manifest
//!
//! ## Canonicalization
//!
//! Every digest is SHA-256 over sorted-key compact JSON. See [`canonical`].

pub mod canonical;
pub mod chunk;
pub mod credential;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod revocation;
pub mod types;
pub mod verify;

pub use canonical::{canonical_digest, canonical_json, canonical_json_of};
pub use chunk::{decode, decode_all, decode_matching, encode, encode_envelope, ChunkLimits, Decoded, DecodedDocument, Reassembler};
pub use credential::{
    share_total, validate_shares, Creator, Credential, CredentialArtifact, CredentialBuilder, Proof,
    ProofPurpose, SigningIdentity, UnsignedCredential,
};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair, Sha256Hash};
pub use envelope::{ChunkFragment, Envelope, EnvelopeKind};
pub use error::{CodecError, CoreError};
pub use identity::{DidDocument, IdentityRecord};
pub use manifest::{
    provenance_chain, ActorType, Anchor, ArtifactEntry, ChainEntry, ContributionRecord, ContributionRole,
    LogSummary, Manifest, ProvenanceCertificate, SnapshotEntry, SongMetadata, SongStatus,
};
pub use revocation::{RevocationNotice, RevocationStatus};
pub use types::{format_timestamp, ChannelId, Did, LogMessage};
pub use verify::{verify, verify_value, verify_value_with, Check, VerificationReport, VerifyOptions};

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
