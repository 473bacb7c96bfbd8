//! Error types for the Kernel.

use provenance_kernel_core::{CodecError, CoreError};
use provenance_kernel_log::LogError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Creator shares did not sum to 100; nothing was signed or published.
    #[error("creator shares must sum to 100, got {sum}")]
    InvalidShares { sum: u64 },

    /// The log failed in a way a retry may fix.
    #[error("log temporarily unavailable: {0}")]
    TransientLog(LogError),

    #[error("log error: {0}")]
    Log(LogError),

    /// An incomplete or inconsistent chunk set.
    #[error("chunk reassembly failed: {0}")]
    Reassembly(CodecError),

    #[error("undecodable document: {0}")]
    Codec(CodecError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("core error: {0}")]
    Core(CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KernelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, KernelError::TransientLog(_))
    }
}

impl From<LogError> for KernelError {
    fn from(e: LogError) -> Self {
        match e {
            LogError::ChannelNotFound(channel) => {
                KernelError::NotFound(format!("channel {channel}"))
            }
            e if e.is_transient() => KernelError::TransientLog(e),
            e => KernelError::Log(e),
        }
    }
}

impl From<CoreError> for KernelError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidShares { sum } => KernelError::InvalidShares { sum },
            CoreError::InvalidDid(_) | CoreError::KeyMismatch(_) | CoreError::InvalidLimits(_) => {
                KernelError::InvalidRequest(e.to_string())
            }
            e => KernelError::Core(e),
        }
    }
}

impl From<CodecError> for KernelError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::NoDocument => KernelError::NotFound("no complete document".into()),
            e if e.is_reassembly() => KernelError::Reassembly(e),
            e => KernelError::Codec(e),
        }
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
