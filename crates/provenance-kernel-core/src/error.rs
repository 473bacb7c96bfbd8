//! Error types for the Provenance Kernel Core.

use thiserror::Error;

/// Core errors that can occur while building or signing documents.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// Creator shares did not add up to exactly 100.
    #[error("creator shares must sum to 100, got {sum}")]
    InvalidShares { sum: u64 },

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("signing key does not control {0}")]
    KeyMismatch(String),

    #[error("invalid chunk limits: {0}")]
    InvalidLimits(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors from the chunk codec while decoding an ordered message read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("incomplete chunk set: received {received} of {total} fragments, missing {missing:?}")]
    Incomplete {
        received: usize,
        total: u32,
        missing: Vec<u32>,
    },

    #[error("fragment index {index} out of range for total {total}")]
    InvalidFragment { index: u32, total: u32 },

    #[error("no complete document found")]
    NoDocument,
}

impl CodecError {
    /// Whether this error describes an incomplete or inconsistent chunk set.
    pub fn is_reassembly(&self) -> bool {
        matches!(
            self,
            CodecError::Incomplete { .. }
                | CodecError::InvalidFragment { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::EncodingError(e.to_string())
    }
}
