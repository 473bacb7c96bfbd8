//! In-memory implementation of the LogClient trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use provenance_kernel_core::{ChannelId, LogMessage};

use crate::error::{LogError, Result};
use crate::traits::{AppendReceipt, LogClient, ReadOrder};
use crate::{channel_id_for, now_millis};

/// In-memory log implementation.
///
/// All data is lost when the log is dropped. Thread-safe via RwLock; the
/// lock is held only inside a single call.
pub struct MemoryLog {
    inner: RwLock<MemoryLogInner>,
}

#[derive(Default)]
struct MemoryLogInner {
    /// Number of channels created so far.
    created: u64,

    channels: HashMap<ChannelId, Channel>,
}

struct Channel {
    memo: String,
    messages: Vec<LogMessage>,
}

impl MemoryLog {
    /// Create a new empty in-memory log.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLogInner::default()),
        }
    }

    /// The memo a channel was created with.
    pub fn memo(&self, channel: &ChannelId) -> Option<String> {
        let inner = self.inner.read().unwrap();
        inner.channels.get(channel).map(|c| c.memo.clone())
    }

    pub fn channel_count(&self) -> usize {
        self.inner.read().unwrap().channels.len()
    }

    /// Number of messages on a channel (0 for unknown channels).
    pub fn message_count(&self, channel: &ChannelId) -> usize {
        let inner = self.inner.read().unwrap();
        inner.channels.get(channel).map_or(0, |c| c.messages.len())
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogClient for MemoryLog {
    async fn create_channel(&self, memo: &str) -> Result<ChannelId> {
        let mut inner = self.inner.write().unwrap();
        inner.created += 1;
        let id = channel_id_for(inner.created);
        inner.channels.insert(
            id.clone(),
            Channel {
                memo: memo.to_string(),
                messages: Vec::new(),
            },
        );
        debug!(channel = %id, memo, "created channel");
        Ok(id)
    }

    async fn append_message(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt> {
        let mut inner = self.inner.write().unwrap();
        let entry = inner
            .channels
            .get_mut(channel)
            .ok_or_else(|| LogError::ChannelNotFound(channel.to_string()))?;

        let receipt = AppendReceipt {
            sequence_number: entry.messages.len() as u64 + 1,
            timestamp: now_millis(),
        };
        entry.messages.push(LogMessage::new(
            receipt.sequence_number,
            receipt.timestamp,
            payload,
        ));
        Ok(receipt)
    }

    async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>> {
        let inner = self.inner.read().unwrap();
        let entry = inner
            .channels
            .get(channel)
            .ok_or_else(|| LogError::ChannelNotFound(channel.to_string()))?;

        let limit = limit.unwrap_or(usize::MAX);
        let messages = match order {
            ReadOrder::Ascending => entry.messages.iter().take(limit).cloned().collect(),
            ReadOrder::Descending => entry.messages.iter().rev().take(limit).cloned().collect(),
        };
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_log_basic() {
        let log = MemoryLog::new();
        let channel = log.create_channel("DID:artist:Luna").await.unwrap();
        assert_eq!(log.memo(&channel).as_deref(), Some("DID:artist:Luna"));

        for i in 1..=3u64 {
            let receipt = log
                .append_message(&channel, Bytes::from(format!("m{i}")))
                .await
                .unwrap();
            assert_eq!(receipt.sequence_number, i);
        }

        let asc = log.read_messages(&channel, ReadOrder::Ascending, None).await.unwrap();
        let seqs: Vec<u64> = asc.iter().map(|m| m.sequence_number).collect();
        assert_eq!(seqs, [1, 2, 3]);
        assert_eq!(&asc[0].payload[..], b"m1");

        let desc = log
            .read_messages(&channel, ReadOrder::Descending, Some(2))
            .await
            .unwrap();
        let seqs: Vec<u64> = desc.iter().map(|m| m.sequence_number).collect();
        assert_eq!(seqs, [3, 2]);
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let log = MemoryLog::new();
        let a = log.create_channel("a").await.unwrap();
        let b = log.create_channel("b").await.unwrap();
        assert_ne!(a, b);

        log.append_message(&a, Bytes::from_static(b"x")).await.unwrap();
        let receipt = log.append_message(&b, Bytes::from_static(b"y")).await.unwrap();
        assert_eq!(receipt.sequence_number, 1);
        assert_eq!(log.message_count(&a), 1);
        assert_eq!(log.channel_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let log = MemoryLog::new();
        let missing = ChannelId::from("0.0.404");
        assert!(matches!(
            log.append_message(&missing, Bytes::new()).await,
            Err(LogError::ChannelNotFound(_))
        ));
        assert!(matches!(
            log.read_messages(&missing, ReadOrder::Ascending, None).await,
            Err(LogError::ChannelNotFound(_))
        ));
    }

    proptest::proptest! {
        #[test]
        fn channels_keep_their_own_order(targets in proptest::collection::vec(0usize..3, 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let log = MemoryLog::new();
                let mut channels = Vec::new();
                for i in 0..3 {
                    channels.push(log.create_channel(&format!("c{i}")).await.unwrap());
                }
                let mut expected = vec![Vec::new(); 3];
                for (n, target) in targets.iter().enumerate() {
                    let payload = format!("m{n}");
                    log.append_message(&channels[*target], Bytes::from(payload.clone())).await.unwrap();
                    expected[*target].push(payload);
                }

                for (channel, expected) in channels.iter().zip(&expected) {
                    let read = log.read_messages(channel, ReadOrder::Ascending, None).await.unwrap();
                    let seqs: Vec<u64> = read.iter().map(|m| m.sequence_number).collect();
                    let want: Vec<u64> = (1..=expected.len() as u64).collect();
                    assert_eq!(seqs, want);
                    let payloads: Vec<String> = read
                        .iter()
                        .map(|m| String::from_utf8(m.payload.to_vec()).unwrap())
                        .collect();
                    assert_eq!(&payloads, expected);

                    let latest = log.read_messages(channel, ReadOrder::Descending, Some(1)).await.unwrap();
                    assert_eq!(latest.first().map(|m| m.sequence_number), want.last().copied());
                }
            });
        }
    }
}
