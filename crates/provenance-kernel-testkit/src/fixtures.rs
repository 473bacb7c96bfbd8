//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::time::Duration;

use serde_json::Map;

use provenance_kernel::{
    IdentityRecord, IssueRequest, Kernel, KernelConfig, RetryPolicy, ServiceIdentity,
};
use provenance_kernel_core::{ChannelId, Creator, Keypair};
use provenance_kernel_log::{LogClient, MemoryLog};

/// Seed of the issuer key used by every fixture.
pub const ISSUER_SEED: [u8; 32] = [0x01; 32];

/// Seed of the sentinel key used by every fixture.
pub const SENTINEL_SEED: [u8; 32] = [0x02; 32];

/// A config with no pacing and millisecond retry backoff.
pub fn fast_config() -> KernelConfig {
    KernelConfig {
        append_interval: Duration::ZERO,
        resolve_poll_interval: Duration::from_millis(5),
        resolve_max_wait: Duration::from_millis(50),
        retry: RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        },
        operation_timeout: Duration::from_secs(5),
        ..KernelConfig::default()
    }
}

/// The seeded issuer and sentinel keys.
pub fn service_identity() -> ServiceIdentity {
    ServiceIdentity::new(Keypair::from_seed(&ISSUER_SEED))
        .with_sentinel(Keypair::from_seed(&SENTINEL_SEED))
}

/// Start a kernel over any log with the seeded keys and [`fast_config`].
pub async fn kernel_with<L: LogClient>(log: L, config: KernelConfig) -> Kernel<L> {
    Kernel::start(service_identity(), log, config).await
}

/// A started kernel over an in-memory log.
pub struct TestFixture {
    pub kernel: Kernel<MemoryLog>,
}

impl TestFixture {
    /// Start with the seeded keys; the sentinel is published on channel
    /// `0.0.1001`.
    pub async fn new() -> Self {
        Self {
            kernel: kernel_with(MemoryLog::new(), fast_config()).await,
        }
    }

    pub fn log(&self) -> &MemoryLog {
        self.kernel.log()
    }

    /// Register an artist with no extra attributes.
    pub async fn register_artist(&self, name: &str) -> IdentityRecord {
        self.kernel
            .register_identity(name, Map::new())
            .await
            .expect("register artist")
    }

    /// Create a song channel with the conventional memo.
    pub async fn song_channel(&self, title: &str) -> ChannelId {
        self.kernel
            .create_channel(&format!("SONG:{title}"))
            .await
            .expect("create song channel")
    }

    /// An issuance request by `artist` for the work on `song`.
    pub fn issue_request(
        &self,
        artist: &IdentityRecord,
        song: &ChannelId,
        creators: Vec<Creator>,
    ) -> IssueRequest {
        IssueRequest {
            issuer: artist.did.clone(),
            subject_channel: song.clone(),
            issuer_channel: Some(artist.channel_id.clone()),
            title: "Velvet Static".to_string(),
            creators,
            artifacts: Vec::new(),
            master_hash: None,
            contribution_count: 0,
        }
    }
}

/// Creators from `(did, role, share)` triples.
pub fn creators(shares: &[(&str, &str, u32)]) -> Vec<Creator> {
    shares
        .iter()
        .map(|(did, role, share)| Creator::new(*did, *role, *share))
        .collect()
}
