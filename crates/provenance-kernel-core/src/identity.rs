//! DID documents and identity records.
//!
//! A DID document binds a public key to a channel and carries the freeform
//! attributes declared at registration as a service endpoint. Documents are
//! published once and never mutated; attribute updates are new log entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;
use crate::types::{ChannelId, Did};

/// JSON-LD context of every DID document.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type of kernel-issued keys.
pub const VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";

/// Key fragment used by registered (issuer) identities.
pub const ISSUER_KEY_FRAGMENT: &str = "key-1";

/// Key fragment used by the platform sentinel identity.
pub const SENTINEL_KEY_FRAGMENT: &str = "did-root-key";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub controller: Did,
    pub public_key_hex: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub service_endpoint: Map<String, Value>,
}

/// A minimal W3C-style DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: Did,
    pub controller: Did,
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    #[serde(default)]
    pub service: Vec<ServiceEntry>,
}

impl DidDocument {
    /// Build a single-key document with one service entry.
    pub fn new(
        did: &Did,
        key_fragment: &str,
        service_fragment: &str,
        service_type: &str,
        endpoint: Map<String, Value>,
    ) -> Self {
        let key_id = did.key_reference(key_fragment);
        Self {
            context: DID_CONTEXT.to_string(),
            id: did.clone(),
            controller: did.clone(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                kind: VERIFICATION_KEY_TYPE.to_string(),
                controller: did.clone(),
                public_key_hex: did.public_key().to_hex(),
            }],
            authentication: vec![key_id],
            service: vec![ServiceEntry {
                id: did.key_reference(service_fragment),
                kind: service_type.to_string(),
                service_endpoint: endpoint,
            }],
        }
    }

    /// Document for a registered artist identity.
    ///
    /// `name` and `registeredAt` are always present in the endpoint; any
    /// declared attribute with the same key is overwritten.
    pub fn artist(did: &Did, name: &str, attributes: Map<String, Value>, registered_at: &str) -> Self {
        let mut endpoint = attributes;
        endpoint.insert("name".into(), Value::String(name.to_string()));
        endpoint.insert("registeredAt".into(), Value::String(registered_at.to_string()));
        Self::new(did, ISSUER_KEY_FRAGMENT, "artist-profile", "ArtistProfile", endpoint)
    }

    /// Document for the platform sentinel identity.
    pub fn sentinel(did: &Did, platform: &str, created_at: &str) -> Self {
        let mut endpoint = Map::new();
        endpoint.insert("name".into(), Value::String(platform.to_string()));
        endpoint.insert(
            "description".into(),
            Value::String("Sentinel identity for platform-attested verifiable credentials".into()),
        );
        endpoint.insert("createdAt".into(), Value::String(created_at.to_string()));
        Self::new(did, SENTINEL_KEY_FRAGMENT, "platform", "PlatformIdentity", endpoint)
    }

    /// The first verification key, checked against the DID it belongs to.
    pub fn public_key(&self) -> Result<Ed25519PublicKey, CoreError> {
        let method = self
            .verification_method
            .first()
            .ok_or_else(|| CoreError::DecodingError("DID document has no verification method".into()))?;
        let key = Ed25519PublicKey::from_hex(&method.public_key_hex)
            .map_err(|_| CoreError::InvalidPublicKey)?;
        if &key != self.id.public_key() {
            return Err(CoreError::KeyMismatch(self.id.to_string()));
        }
        Ok(key)
    }
}

/// A registered identity: the DID, its anchoring channel and its document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub did: Did,
    pub channel_id: ChannelId,
    pub public_key: String,
    pub did_document: DidDocument,
}

impl IdentityRecord {
    pub fn from_document(document: DidDocument) -> Result<Self, CoreError> {
        let key = document.public_key()?;
        Ok(Self {
            did: document.id.clone(),
            channel_id: document.id.channel_id().clone(),
            public_key: key.to_hex(),
            did_document: document,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use serde_json::json;

    fn did() -> Did {
        let pk = Keypair::from_seed(&[0x05; 32]).public_key();
        Did::derive("testnet", &pk, &ChannelId::from("0.0.42")).unwrap()
    }

    #[test]
    fn test_artist_document_shape() {
        let did = did();
        let mut attrs = Map::new();
        attrs.insert("influences".into(), json!(["Radiohead"]));
        let doc = DidDocument::artist(&did, "Luna Vega", attrs, "2026-01-01T00:00:00.000Z");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["@context"], DID_CONTEXT);
        assert_eq!(value["verificationMethod"][0]["id"], format!("{did}#key-1"));
        assert_eq!(value["service"][0]["serviceEndpoint"]["name"], "Luna Vega");
        assert_eq!(value["service"][0]["serviceEndpoint"]["influences"][0], "Radiohead");
        assert_eq!(doc.public_key().unwrap(), *did.public_key());
    }

    #[test]
    fn test_record_from_document() {
        let did = did();
        let doc = DidDocument::sentinel(&did, "Provenance Studio", "2026-01-01T00:00:00.000Z");
        let record = IdentityRecord::from_document(doc).unwrap();
        assert_eq!(record.channel_id.as_str(), "0.0.42");
        assert_eq!(record.did, did);
    }

    #[test]
    fn test_key_mismatch_detected() {
        let did = did();
        let mut doc = DidDocument::artist(&did, "x", Map::new(), "t");
        doc.verification_method[0].public_key_hex = Keypair::from_seed(&[9; 32]).public_key().to_hex();
        assert!(matches!(doc.public_key(), Err(CoreError::KeyMismatch(_))));
    }
}
