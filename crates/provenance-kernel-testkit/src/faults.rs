//! Fault injection for log clients.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use provenance_kernel_core::{ChannelId, LogMessage};
use provenance_kernel_log::{AppendReceipt, LogClient, LogError, ReadOrder, Result};

/// A log client that fails on demand.
///
/// Injected failures are `LogError::Unavailable`, which callers treat as
/// transient. A switched-on operation fails on every call; `fail_next_appends`
/// fails only the next `n` appends.
#[derive(Debug, Default)]
pub struct FaultyLog<L> {
    inner: L,
    creates: AtomicBool,
    appends: AtomicBool,
    reads: AtomicBool,
    next_appends: AtomicU32,
    append_calls: AtomicUsize,
}

impl<L: LogClient> FaultyLog<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            creates: AtomicBool::new(false),
            appends: AtomicBool::new(false),
            reads: AtomicBool::new(false),
            next_appends: AtomicU32::new(0),
            append_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn fail_creates(&self, on: bool) {
        self.creates.store(on, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, on: bool) {
        self.appends.store(on, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, on: bool) {
        self.reads.store(on, Ordering::SeqCst);
    }

    pub fn fail_next_appends(&self, n: u32) {
        self.next_appends.store(n, Ordering::SeqCst);
    }

    /// Append attempts seen so far, failed ones included.
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn injected(op: &str) -> LogError {
        LogError::Unavailable(format!("injected {op} failure"))
    }
}

#[async_trait]
impl<L: LogClient> LogClient for FaultyLog<L> {
    async fn create_channel(&self, memo: &str) -> Result<ChannelId> {
        if self.creates.load(Ordering::SeqCst) {
            return Err(Self::injected("create"));
        }
        self.inner.create_channel(memo).await
    }

    async fn append_message(&self, channel: &ChannelId, payload: Bytes) -> Result<AppendReceipt> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if self.appends.load(Ordering::SeqCst) {
            return Err(Self::injected("append"));
        }
        let consumed = self
            .next_appends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(Self::injected("append"));
        }
        self.inner.append_message(channel, payload).await
    }

    async fn read_messages(
        &self,
        channel: &ChannelId,
        order: ReadOrder,
        limit: Option<usize>,
    ) -> Result<Vec<LogMessage>> {
        if self.reads.load(Ordering::SeqCst) {
            return Err(Self::injected("read"));
        }
        self.inner.read_messages(channel, order, limit).await
    }
}
