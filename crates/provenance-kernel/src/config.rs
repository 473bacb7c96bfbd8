//! Kernel configuration.

use std::path::PathBuf;
use std::time::Duration;

use provenance_kernel_core::ChunkLimits;

/// Bounded retry with exponential backoff for transient log errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Configuration for the Kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Network name embedded in every DID.
    pub network: String,
    /// Platform name used for the sentinel identity.
    pub platform_name: String,
    pub chunk: ChunkLimits,
    /// Pause between appends of consecutive fragments.
    pub append_interval: Duration,
    /// Messages read from the head of a channel when resolving an identity.
    pub resolve_scan_limit: usize,
    pub resolve_poll_interval: Duration,
    pub resolve_max_wait: Duration,
    pub retry: RetryPolicy,
    /// Deadline for a single log call.
    pub operation_timeout: Duration,
    /// Directory that artifact file paths are resolved against.
    pub artifact_root: PathBuf,
    /// Where the sentinel record is persisted; `None` keeps it in memory.
    pub sentinel_state_path: Option<PathBuf>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            network: "testnet".to_string(),
            platform_name: "ProvenanceStudio".to_string(),
            chunk: ChunkLimits::default(),
            append_interval: Duration::from_millis(500),
            resolve_scan_limit: 10,
            resolve_poll_interval: Duration::from_secs(2),
            resolve_max_wait: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            operation_timeout: Duration::from_secs(30),
            artifact_root: PathBuf::from("."),
            sentinel_state_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(64), Duration::from_millis(500));
    }
}
