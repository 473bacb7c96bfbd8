//! The wire envelope carried in every log message payload.
//!
//! Every payload is a JSON object with an explicit `"type"` discriminant.
//! Document envelopes are flattened next to the discriminant, except
//! credentials, which travel under a `"credential"` member:
//!
//! ```text
//! {"type":"Chunk","index":0,"total":3,"data":"..."}
//! {"type":"DIDDocument","@context":...,"id":"did:provenance:..."}
//! {"type":"VerifiableCredential","credential":{...}}
//! {"type":"RevocationNotice","credentialId":"urn:uuid:...",...}
//! {"type":"ProvenanceCertificate","masterHash":"...",...}
//! ```
//!
//! Payloads with any other discriminant (contribution notes, free-form
//! messages) decode to [`Envelope::Unrecognized`] and are kept as raw JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::credential::Credential;
use crate::error::{CodecError, CoreError};
use crate::identity::DidDocument;
use crate::manifest::ProvenanceCertificate;
use crate::revocation::RevocationNotice;

/// Known `"type"` discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Chunk,
    DidDocument,
    VerifiableCredential,
    RevocationNotice,
    ProvenanceCertificate,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 5] = [
        EnvelopeKind::Chunk,
        EnvelopeKind::DidDocument,
        EnvelopeKind::VerifiableCredential,
        EnvelopeKind::RevocationNotice,
        EnvelopeKind::ProvenanceCertificate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeKind::Chunk => "Chunk",
            EnvelopeKind::DidDocument => "DIDDocument",
            EnvelopeKind::VerifiableCredential => "VerifiableCredential",
            EnvelopeKind::RevocationNotice => "RevocationNotice",
            EnvelopeKind::ProvenanceCertificate => "ProvenanceCertificate",
        }
    }

    pub fn from_discriminant(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// One fragment of an oversized payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFragment {
    pub index: u32,
    pub total: u32,
    pub data: String,
}

#[derive(Serialize, Deserialize)]
struct CredentialBody {
    credential: Credential,
}

/// A decoded log payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Chunk(ChunkFragment),
    DidDocument(DidDocument),
    Credential(Box<Credential>),
    Revocation(RevocationNotice),
    Certificate(ProvenanceCertificate),
    /// A JSON object with a missing or unknown discriminant.
    Unrecognized(Value),
}

impl Envelope {
    pub fn kind(&self) -> Option<EnvelopeKind> {
        match self {
            Envelope::Chunk(_) => Some(EnvelopeKind::Chunk),
            Envelope::DidDocument(_) => Some(EnvelopeKind::DidDocument),
            Envelope::Credential(_) => Some(EnvelopeKind::VerifiableCredential),
            Envelope::Revocation(_) => Some(EnvelopeKind::RevocationNotice),
            Envelope::Certificate(_) => Some(EnvelopeKind::ProvenanceCertificate),
            Envelope::Unrecognized(_) => None,
        }
    }

    /// The JSON form written to the log.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        let (kind, body) = match self {
            Envelope::Chunk(f) => (EnvelopeKind::Chunk, serde_json::to_value(f)?),
            Envelope::DidDocument(d) => (EnvelopeKind::DidDocument, serde_json::to_value(d)?),
            Envelope::Credential(c) => (
                EnvelopeKind::VerifiableCredential,
                serde_json::to_value(CredentialBody {
                    credential: (**c).clone(),
                })?,
            ),
            Envelope::Revocation(n) => (EnvelopeKind::RevocationNotice, serde_json::to_value(n)?),
            Envelope::Certificate(c) => {
                (EnvelopeKind::ProvenanceCertificate, serde_json::to_value(c)?)
            }
            Envelope::Unrecognized(v) => return Ok(v.clone()),
        };

        let Value::Object(fields) = body else {
            return Err(CoreError::EncodingError(format!(
                "{} body is not a JSON object",
                kind.as_str()
            )));
        };
        let mut map = Map::with_capacity(fields.len() + 1);
        map.insert("type".into(), Value::String(kind.as_str().into()));
        map.extend(fields);
        Ok(Value::Object(map))
    }

    /// Compact JSON text of the envelope.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    /// Decode a payload by its discriminant.
    ///
    /// Fails with [`CodecError::Malformed`] when the payload is not a JSON
    /// object, or when a known discriminant carries a body of the wrong shape.
    pub fn from_slice(payload: &[u8]) -> Result<Self, CodecError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| CodecError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let Value::Object(mut map) = value else {
            return Err(CodecError::Malformed("payload is not a JSON object".into()));
        };

        let kind = match map.get("type").and_then(Value::as_str) {
            Some(tag) => EnvelopeKind::from_discriminant(tag),
            None => None,
        };
        let Some(kind) = kind else {
            return Ok(Envelope::Unrecognized(Value::Object(map)));
        };
        map.remove("type");
        let body = Value::Object(map);

        match kind {
            EnvelopeKind::Chunk => body_as(kind, body).map(Envelope::Chunk),
            EnvelopeKind::DidDocument => body_as(kind, body).map(Envelope::DidDocument),
            EnvelopeKind::VerifiableCredential => body_as::<CredentialBody>(kind, body)
                .map(|b| Envelope::Credential(Box::new(b.credential))),
            EnvelopeKind::RevocationNotice => body_as(kind, body).map(Envelope::Revocation),
            EnvelopeKind::ProvenanceCertificate => body_as(kind, body).map(Envelope::Certificate),
        }
    }
}

fn body_as<T: DeserializeOwned>(kind: EnvelopeKind, body: Value) -> Result<T, CodecError> {
    serde_json::from_value(body)
        .map_err(|e| CodecError::Malformed(format!("{}: {e}", kind.as_str())))
}

impl From<DidDocument> for Envelope {
    fn from(d: DidDocument) -> Self {
        Envelope::DidDocument(d)
    }
}

impl From<Credential> for Envelope {
    fn from(c: Credential) -> Self {
        Envelope::Credential(Box::new(c))
    }
}

impl From<RevocationNotice> for Envelope {
    fn from(n: RevocationNotice) -> Self {
        Envelope::Revocation(n)
    }
}

impl From<ProvenanceCertificate> for Envelope {
    fn from(c: ProvenanceCertificate) -> Self {
        Envelope::Certificate(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discriminants_roundtrip() {
        for kind in EnvelopeKind::ALL {
            assert_eq!(EnvelopeKind::from_discriminant(kind.as_str()), Some(kind));
        }
        assert_eq!(EnvelopeKind::from_discriminant("Contribution"), None);
    }

    #[test]
    fn test_chunk_wire_shape() {
        let env = Envelope::Chunk(ChunkFragment {
            index: 1,
            total: 3,
            data: "abc".into(),
        });
        let value = env.to_value().unwrap();
        assert_eq!(value, json!({"type": "Chunk", "index": 1, "total": 3, "data": "abc"}));
        assert_eq!(Envelope::from_value(value).unwrap(), env);
    }

    #[test]
    fn test_revocation_is_flattened() {
        let notice = RevocationNotice {
            credential_id: "urn:uuid:1".into(),
            reason: "dispute".into(),
            revoked_by: "did:example:a".into(),
            revoked_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = Envelope::from(notice.clone()).to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"RevocationNotice","#));
        assert_eq!(
            Envelope::from_slice(json.as_bytes()).unwrap(),
            Envelope::Revocation(notice)
        );
    }

    #[test]
    fn test_unknown_discriminant_is_unrecognized() {
        let payload = br#"{"type":"Contribution","step":"vocals"}"#;
        match Envelope::from_slice(payload).unwrap() {
            Envelope::Unrecognized(v) => assert_eq!(v["step"], "vocals"),
            other => panic!("unexpected {other:?}"),
        }
        let untyped = br#"{"role":"producer"}"#;
        assert!(matches!(
            Envelope::from_slice(untyped).unwrap(),
            Envelope::Unrecognized(_)
        ));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            Envelope::from_slice(b"not json"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::from_slice(b"[1,2]"),
            Err(CodecError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::from_slice(br#"{"type":"Chunk","index":"zero"}"#),
            Err(CodecError::Malformed(_))
        ));
    }
}
