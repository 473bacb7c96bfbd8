//! # Provenance Kernel Log
//!
//! The append-only log behind the Provenance Kernel. Provides a trait-based
//! interface to channels of ordered messages with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`LogClient`] - The async trait for all log operations
//! - [`SqliteLog`] - SQLite-based durable log
//! - [`MemoryLog`] - In-memory log for tests
//! - [`AppendReceipt`] - Acknowledgement of a durable append
//!
//! ## Design Notes
//!
//! - **Opaque channels**: channel ids are `0.0.<n>` strings; callers never parse them
//! - **Transient errors**: [`LogError::is_transient`] tells callers which failures to retry

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

use provenance_kernel_core::ChannelId;

pub use error::{LogError, Result};
pub use memory::MemoryLog;
pub use sqlite::SqliteLog;
pub use traits::{AppendReceipt, LogClient, LogClientExt, ReadOrder};

/// Offset of the first local channel number.
const CHANNEL_BASE: u64 = 1000;

pub(crate) fn channel_id_for(n: u64) -> ChannelId {
    ChannelId::new(format!("0.0.{}", CHANNEL_BASE + n))
}

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
