//! # Provenance Kernel
//!
//! The service context of the provenance engine: verifiable identities,
//! dual-signed ownership credentials, and content-hashed provenance packages,
//! all anchored on append-only log channels.
//!
//! ## Overview
//!
//! - **Identity Registrar**: a DID per key and channel, its document published
//!   as the channel's first entry
//! - **Credential Issuer**: credentials signed by the issuer and co-signed by
//!   the platform sentinel
//! - **Revocation Tracker**: notices appended after the credential, status
//!   folded from a full scan
//! - **Package Assembler**: manifest, master hash, certificate stamp and
//!   credential, degrading to warnings when the log misbehaves
//!
//! Verification is pure and lives in [`core::verify`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provenance_kernel::{Kernel, KernelConfig, ServiceIdentity};
//! use provenance_kernel::core::Keypair;
//! use provenance_kernel::log::SqliteLog;
//! use serde_json::Map;
//!
//! async fn example() {
//!     let identity = ServiceIdentity::new(Keypair::generate())
//!         .with_sentinel(Keypair::generate());
//!     let log = SqliteLog::open("provenance.db").unwrap();
//!
//!     // Publishes the sentinel identity on first start
//!     let kernel = Kernel::start(identity, log, KernelConfig::default()).await;
//!
//!     let artist = kernel.register_identity("Aria", Map::new()).await.unwrap();
//!     println!("registered {}", artist.did);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `provenance_kernel::core` - Pure primitives (DIDs, credentials, codec)
//! - `provenance_kernel::log` - The log client abstraction and backends

pub mod config;
pub mod error;
pub mod kernel;
pub mod package;
mod retry;
pub mod service;
pub mod warning;

pub use provenance_kernel_core as core;
pub use provenance_kernel_log as log;

pub use config::{KernelConfig, RetryPolicy};
pub use error::{KernelError, Result};
pub use kernel::{Issuance, IssueRequest, Kernel};
pub use package::{Package, SongContext, TrackFile};
pub use service::{SentinelRecord, ServiceIdentity};
pub use warning::{Stage, Warning};

pub use provenance_kernel_core::{
    ChannelId, Credential, Did, DidDocument, Ed25519PublicKey, Envelope, IdentityRecord, Keypair,
    Manifest, RevocationNotice, RevocationStatus, VerificationReport,
};
