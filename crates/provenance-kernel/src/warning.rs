//! Degraded-mode warnings.
//!
//! Best-effort stages never abort an operation; their failures are
//! collected as warnings and returned next to the result.

use std::fmt;

use serde::Serialize;
use tracing::warn;

/// The optional stage that did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sentinel,
    PublishSubject,
    PublishIssuer,
    ArtifactHash,
    OnChainSnapshot,
    CertificateStamp,
    CredentialIssue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub stage: Stage,
    pub detail: String,
}

impl Warning {
    /// Record a warning and emit it to the log.
    pub fn record(stage: Stage, detail: impl fmt::Display) -> Self {
        let detail = detail.to_string();
        warn!(?stage, %detail, "degraded");
        Self { stage, detail }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.stage, self.detail)
    }
}
