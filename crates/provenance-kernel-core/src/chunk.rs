//! Chunk codec: splits oversized payloads into ordered fragments and
//! reassembles them from an ordered channel read.

use std::collections::BTreeMap;

use crate::envelope::{ChunkFragment, Envelope};
use crate::error::{CodecError, CoreError};
use crate::types::LogMessage;

/// Size limits of the host log, in bytes of UTF-8 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimits {
    /// Largest payload sent as a single message.
    pub single_message_limit: usize,
    /// Largest `data` body of one fragment.
    pub chunk_body_limit: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            single_message_limit: 1024,
            chunk_body_limit: 700,
        }
    }
}

impl ChunkLimits {
    pub fn validate(&self) -> Result<(), CoreError> {
        // A body must fit at least one UTF-8 code point.
        if self.chunk_body_limit < 4 {
            return Err(CoreError::InvalidLimits(format!(
                "chunk_body_limit must be at least 4, got {}",
                self.chunk_body_limit
            )));
        }
        if self.single_message_limit == 0 {
            return Err(CoreError::InvalidLimits("single_message_limit is zero".into()));
        }
        Ok(())
    }
}

/// Encode a serialized document into the payloads to append, in order.
pub fn encode(document_json: &str, limits: &ChunkLimits) -> Result<Vec<String>, CoreError> {
    limits.validate()?;
    if document_json.len() <= limits.single_message_limit {
        return Ok(vec![document_json.to_string()]);
    }

    let pieces = split_on_char_boundaries(document_json, limits.chunk_body_limit);
    let total = u32::try_from(pieces.len())
        .map_err(|_| CoreError::InvalidLimits("too many fragments".into()))?;

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, data)| {
            Envelope::Chunk(ChunkFragment {
                index: index as u32,
                total,
                data: data.to_string(),
            })
            .to_json()
        })
        .collect()
}

/// Serialize an envelope and encode it.
pub fn encode_envelope(envelope: &Envelope, limits: &ChunkLimits) -> Result<Vec<String>, CoreError> {
    encode(&envelope.to_json()?, limits)
}

fn split_on_char_boundaries(text: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::with_capacity(text.len() / limit + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = limit.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        pieces.push(head);
        rest = tail;
    }
    pieces
}

/// Incremental reassembly of one chunk set at a time.
///
/// The first fragment fixes `total`. Fragments are published in index
/// order, so a fragment that cannot continue the set in progress starts a
/// new one and the old set is abandoned:
///
/// - its `total` disagrees with the set in progress;
/// - its index is already held with different data;
/// - its index is below the highest index held.
///
/// An identical repeat of a held fragment is ignored. Once every index is
/// present the set is joined, parsed, and the buffer is cleared.
#[derive(Debug, Default)]
pub struct Reassembler {
    total: Option<u32>,
    fragments: BTreeMap<u32, String>,
    abandoned: usize,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered fragments of the set in progress.
    pub fn pending(&self) -> usize {
        self.fragments.len()
    }

    /// Number of sets dropped before they completed.
    pub fn abandoned(&self) -> usize {
        self.abandoned
    }

    pub fn is_idle(&self) -> bool {
        self.total.is_none()
    }

    pub fn push(&mut self, fragment: ChunkFragment) -> Result<Option<Envelope>, CodecError> {
        let ChunkFragment { index, total, data } = fragment;
        if total == 0 || index >= total {
            return Err(CodecError::InvalidFragment { index, total });
        }
        if let Some(expected) = self.total {
            if expected != total {
                self.abandon();
            } else if let Some(held) = self.fragments.get(&index) {
                if *held == data {
                    return Ok(None);
                }
                self.abandon();
            } else if self.fragments.keys().next_back().is_some_and(|&last| index < last) {
                self.abandon();
            }
        }
        self.total = Some(total);
        self.fragments.insert(index, data);

        if self.fragments.len() < total as usize {
            return Ok(None);
        }

        let joined: String = std::mem::take(&mut self.fragments).into_values().collect();
        self.total = None;
        match Envelope::from_slice(joined.as_bytes())? {
            Envelope::Chunk(_) => Err(CodecError::Malformed("nested chunk set".into())),
            envelope => Ok(Some(envelope)),
        }
    }

    fn abandon(&mut self) {
        self.abandoned += 1;
        self.fragments.clear();
        self.total = None;
    }

    /// Fail if a chunk set was left incomplete.
    pub fn finish(self) -> Result<(), CodecError> {
        match self.total {
            None => Ok(()),
            Some(total) => Err(CodecError::Incomplete {
                received: self.fragments.len(),
                total,
                missing: (0..total)
                    .filter(|i| !self.fragments.contains_key(i))
                    .collect(),
            }),
        }
    }
}

/// Decode the first complete document of an ordered read.
pub fn decode(messages: &[LogMessage]) -> Result<Envelope, CodecError> {
    decode_matching(messages, |_| true)
}

/// Decode the first complete document accepted by `wanted`.
///
/// Payloads that are not JSON objects, or whose discriminant is unknown, are
/// skipped. Reassembly errors are surfaced rather than skipped.
pub fn decode_matching<F>(messages: &[LogMessage], wanted: F) -> Result<Envelope, CodecError>
where
    F: Fn(&Envelope) -> bool,
{
    let mut reassembler = Reassembler::new();
    for message in messages {
        let document = match Envelope::from_slice(&message.payload) {
            Ok(Envelope::Chunk(fragment)) => reassembler.push(fragment)?,
            Ok(Envelope::Unrecognized(_)) | Err(CodecError::Malformed(_)) => None,
            Ok(envelope) => Some(envelope),
            Err(e) => return Err(e),
        };
        if let Some(envelope) = document {
            if wanted(&envelope) {
                return Ok(envelope);
            }
        }
    }
    reassembler.finish()?;
    Err(CodecError::NoDocument)
}

/// A complete document and the sequence number of its last message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    pub sequence_number: u64,
    pub envelope: Envelope,
}

/// Every complete document of an ordered read.
#[derive(Debug, Default)]
pub struct Decoded {
    pub documents: Vec<DecodedDocument>,
    /// Fragments of a set still incomplete at the end of the read.
    pub pending_fragments: usize,
    /// Messages or chunk sets that could not be decoded.
    pub skipped: usize,
}

/// Decode every recognized document of an ordered read.
///
/// Broken and abandoned chunk sets are counted in `skipped` and the scan
/// continues.
pub fn decode_all(messages: &[LogMessage]) -> Decoded {
    let mut decoded = Decoded::default();
    let mut reassembler = Reassembler::new();
    for message in messages {
        let document = match Envelope::from_slice(&message.payload) {
            Ok(Envelope::Chunk(fragment)) => match reassembler.push(fragment) {
                Ok(document) => document,
                Err(_) => {
                    decoded.skipped += 1;
                    None
                }
            },
            Ok(Envelope::Unrecognized(_)) => None,
            Ok(envelope) => Some(envelope),
            Err(_) => {
                decoded.skipped += 1;
                None
            }
        };
        if let Some(envelope) = document {
            decoded.documents.push(DecodedDocument {
                sequence_number: message.sequence_number,
                envelope,
            });
        }
    }
    decoded.pending_fragments = reassembler.pending();
    decoded.skipped += reassembler.abandoned();
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn messages(payloads: &[String]) -> Vec<LogMessage> {
        payloads
            .iter()
            .enumerate()
            .map(|(i, p)| LogMessage::new(i as u64 + 1, 0, p.clone().into_bytes()))
            .collect()
    }

    fn revocation_json(reason_len: usize) -> String {
        json!({
            "type": "RevocationNotice",
            "credentialId": "urn:uuid:x",
            "reason": "r".repeat(reason_len),
            "revokedBy": "did:example:a",
            "revokedAt": "2026-01-01T00:00:00.000Z",
        })
        .to_string()
    }

    #[test]
    fn test_small_payload_is_single_message() {
        let doc = revocation_json(10);
        let out = encode(&doc, &ChunkLimits::default()).unwrap();
        assert_eq!(out, vec![doc]);
    }

    #[test]
    fn test_fragment_count() {
        let doc = revocation_json(2000);
        let out = encode(&doc, &ChunkLimits::default()).unwrap();
        assert_eq!(out.len(), doc.len().div_ceil(700));
        for (i, payload) in out.iter().enumerate() {
            match Envelope::from_slice(payload.as_bytes()).unwrap() {
                Envelope::Chunk(f) => {
                    assert_eq!(f.index as usize, i);
                    assert_eq!(f.total as usize, out.len());
                }
                other => panic!("expected chunk, got {other:?}"),
            }
        }
        assert!(matches!(decode(&messages(&out)).unwrap(), Envelope::Revocation(_)));
    }

    #[test]
    fn test_multibyte_split_keeps_code_points() {
        let limits = ChunkLimits {
            single_message_limit: 16,
            chunk_body_limit: 5,
        };
        let text = "ééééééééééé";
        let pieces = split_on_char_boundaries(text, limits.chunk_body_limit);
        assert!(pieces.iter().all(|p| p.len() <= 5 && !p.is_empty()));
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn test_missing_fragment_is_incomplete() {
        let doc = revocation_json(2000);
        let mut out = encode(&doc, &ChunkLimits::default()).unwrap();
        out.remove(1);
        match decode(&messages(&out)) {
            Err(CodecError::Incomplete { missing, .. }) => assert_eq!(missing, vec![1]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_total_mismatch_starts_new_set() {
        let a = Envelope::Chunk(ChunkFragment { index: 0, total: 3, data: "{".into() });
        let b = Envelope::Chunk(ChunkFragment { index: 1, total: 2, data: "}".into() });
        let out = vec![a.to_json().unwrap(), b.to_json().unwrap()];
        let err = decode(&messages(&out)).unwrap_err();
        assert_eq!(
            err,
            CodecError::Incomplete { received: 1, total: 2, missing: vec![0] }
        );
        assert!(err.is_reassembly());
    }

    #[test]
    fn test_truncated_set_then_complete_set() {
        // First set lost its last fragment; the next set has a different total.
        let mut first = encode(&revocation_json(1500), &ChunkLimits::default()).unwrap();
        assert_eq!(first.len(), 3);
        first.pop();
        let second = encode(&revocation_json(900), &ChunkLimits::default()).unwrap();
        assert_eq!(second.len(), 2);
        let out: Vec<String> = first.into_iter().chain(second).collect();

        let decoded = decode_all(&messages(&out));
        assert_eq!(decoded.documents.len(), 1);
        assert_eq!(decoded.documents[0].sequence_number, 4);
        assert_eq!(decoded.skipped, 1);
        assert_eq!(decoded.pending_fragments, 0);
        assert!(matches!(decode(&messages(&out)).unwrap(), Envelope::Revocation(_)));
    }

    #[test]
    fn test_truncated_set_then_set_of_same_size() {
        let mut first = encode(&revocation_json(1500), &ChunkLimits::default()).unwrap();
        first.pop();
        let doc = revocation_json(1600).replace("urn:uuid:x", "urn:uuid:y");
        let second = encode(&doc, &ChunkLimits::default()).unwrap();
        assert_eq!(second.len(), 3);
        let out: Vec<String> = first.into_iter().chain(second).collect();

        let decoded = decode_all(&messages(&out));
        assert_eq!(decoded.documents.len(), 1);
        assert_eq!(decoded.skipped, 1);
        match &decoded.documents[0].envelope {
            Envelope::Revocation(notice) => {
                assert_eq!(notice.credential_id, "urn:uuid:y");
                assert_eq!(notice.reason.len(), 1600);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_set_missing_first_fragment_then_complete_set() {
        let mut first = encode(&revocation_json(1500), &ChunkLimits::default()).unwrap();
        first.remove(0);
        let second = encode(&revocation_json(900), &ChunkLimits::default()).unwrap();
        let out: Vec<String> = first.into_iter().chain(second).collect();

        let decoded = decode_all(&messages(&out));
        assert_eq!(decoded.documents.len(), 1);
        assert_eq!(decoded.skipped, 1);
    }

    #[test]
    fn test_duplicate_index_keeps_first() {
        let doc = revocation_json(900);
        let mut out = encode(&doc, &ChunkLimits::default()).unwrap();
        out.insert(1, out[0].clone());
        assert!(matches!(decode(&messages(&out)).unwrap(), Envelope::Revocation(_)));
    }

    #[test]
    fn test_unknown_messages_skipped() {
        let out = vec![
            "garbage".to_string(),
            json!({"type": "Contribution"}).to_string(),
            revocation_json(5),
        ];
        assert!(matches!(decode(&messages(&out)).unwrap(), Envelope::Revocation(_)));
        assert_eq!(decode(&messages(&out[..2])).unwrap_err(), CodecError::NoDocument);
    }

    #[test]
    fn test_decode_all_collects_in_order() {
        let mut out = encode(&revocation_json(1500), &ChunkLimits::default()).unwrap();
        out.push(revocation_json(3));
        out.push(json!({"type": "Chunk", "index": 0, "total": 2, "data": "{"}).to_string());
        let decoded = decode_all(&messages(&out));
        assert_eq!(decoded.documents.len(), 2);
        assert_eq!(decoded.documents[0].sequence_number, 3);
        assert_eq!(decoded.documents[1].sequence_number, 4);
        assert_eq!(decoded.pending_fragments, 1);
    }

    #[test]
    fn test_rejects_tiny_body_limit() {
        let limits = ChunkLimits {
            single_message_limit: 2,
            chunk_body_limit: 3,
        };
        assert!(matches!(
            encode("{\"a\":1}", &limits),
            Err(CoreError::InvalidLimits(_))
        ));
    }

    proptest! {
        #[test]
        fn test_roundtrip_any_size(size in 10usize..=10_000, fill in "[a-z0-9 \"\\\\é]{1,8}") {
            let mut text = String::new();
            while text.len() < size {
                text.push_str(&fill);
            }
            let payload = json!({"type": "Note", "text": text});
            let doc = json!({
                "type": "RevocationNotice",
                "credentialId": "urn:uuid:p",
                "reason": payload.to_string(),
                "revokedBy": "x",
                "revokedAt": "t",
            }).to_string();

            let out = encode(&doc, &ChunkLimits::default()).unwrap();
            let decoded = decode(&messages(&out)).unwrap();
            prop_assert_eq!(decoded.to_value().unwrap(), serde_json::from_str::<serde_json::Value>(&doc).unwrap());
        }
    }
}
