//! Revocation notices and scan-derived revocation status.
//!
//! A revocation never touches the credential message: the notice is appended
//! after it on the same channel and status is folded from a full read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::types::format_timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationNotice {
    pub credential_id: String,
    pub reason: String,
    /// Identifier of the revoking authority.
    pub revoked_by: String,
    pub revoked_at: String,
}

impl RevocationNotice {
    pub fn new(
        credential_id: impl Into<String>,
        reason: impl Into<String>,
        revoked_by: impl Into<String>,
        revoked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            credential_id: credential_id.into(),
            reason: reason.into(),
            revoked_by: revoked_by.into(),
            revoked_at: format_timestamp(revoked_at),
        }
    }
}

/// Revocation state of one credential, as of the read it was folded from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationStatus {
    pub revoked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<RevocationNotice>,
}

impl RevocationStatus {
    /// Fold documents in channel order; the most recent matching notice wins.
    pub fn from_documents<'a, I>(credential_id: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = &'a Envelope>,
    {
        let notice = documents
            .into_iter()
            .filter_map(|envelope| match envelope {
                Envelope::Revocation(n) if n.credential_id == credential_id => Some(n),
                _ => None,
            })
            .last()
            .cloned();

        Self {
            revoked: notice.is_some(),
            notice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: &str, reason: &str) -> Envelope {
        Envelope::Revocation(RevocationNotice {
            credential_id: id.into(),
            reason: reason.into(),
            revoked_by: "did:example:label".into(),
            revoked_at: "2026-01-01T00:00:00.000Z".into(),
        })
    }

    #[test]
    fn test_not_revoked_without_notice() {
        let docs = [notice("urn:uuid:other", "x")];
        let status = RevocationStatus::from_documents("urn:uuid:a", &docs);
        assert!(!status.revoked);
        assert!(status.notice.is_none());
    }

    #[test]
    fn test_latest_notice_wins() {
        let docs = [
            notice("urn:uuid:a", "first"),
            notice("urn:uuid:b", "unrelated"),
            notice("urn:uuid:a", "second"),
        ];
        let status = RevocationStatus::from_documents("urn:uuid:a", &docs);
        assert!(status.revoked);
        assert_eq!(status.notice.unwrap().reason, "second");
    }
}
