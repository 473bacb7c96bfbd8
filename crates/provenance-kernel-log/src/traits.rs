//! LogClient trait: the abstract interface to an append-only log.
//!
//! The kernel reaches the log only through this trait. Implementations
//! include SQLite (durable) and in-memory (for tests); a ledger-backed
//! client plugs in the same way.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use provenance_kernel_core::{ChannelId, LogMessage};

use crate::error::Result;

/// Acknowledgement of a durable append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendReceipt {
    pub sequence_number: u64,
    /// Time the log accepted the message (Unix ms).
    pub timestamp: i64,
}

/// Order of a channel read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadOrder {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

/// The LogClient trait: async interface to channels of ordered messages.
///
/// # Design Notes
///
/// - **Append-only**: messages are never updated or deleted.
/// - **Ordering**: sequence numbers start at 1 and strictly increase per channel.
/// - **No retries**: a client reports failures; retry policy belongs to the caller.
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Create a new channel and return its identifier.
    async fn create_channel(&self, memo: &str) -> Result<ChannelId>;

    /// Append one payload to a channel.
    async fn append_message(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt>;

    /// Read messages from a channel.
    ///
    /// Returns at most `limit` messages (all when `None`) in the given order.
    async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>>;
}

#[async_trait]
impl<L: LogClient + ?Sized> LogClient for Arc<L> {
    async fn create_channel(&self, memo: &str) -> Result<ChannelId> {
        (**self).create_channel(memo).await
    }

    async fn append_message(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt> {
        (**self).append_message(channel, payload).await
    }

    async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>> {
        (**self).read_messages(channel, order, limit).await
    }
}

/// Extension trait for common read patterns.
pub trait LogClientExt: LogClient {
    /// Read a channel's full history in ascending order.
    fn read_all(
        &self,
        channel: &ChannelId,
    ) -> impl std::future::Future<Output = Result<Vec<LogMessage>>> + Send;
}

impl<L: LogClient + ?Sized> LogClientExt for L {
    async fn read_all(&self, channel: &ChannelId) -> Result<Vec<LogMessage>> {
        self.read_messages(channel, ReadOrder::Ascending, None).await
    }
}
