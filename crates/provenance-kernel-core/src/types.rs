//! Strong type definitions for the Provenance Kernel.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Ed25519PublicKey;
use crate::error::CoreError;

/// Opaque identifier of an append-only log channel.
///
/// The kernel never interprets the contents; it is whatever the log client
/// handed back from `create_channel`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A decentralized identifier bound to a public key and a log channel.
///
/// Wire form: `did:provenance:<network>:<public-key-hex>_<channel-id>`.
/// The identifier is a pure function of its three parts, so the verifying
/// key of any proof can be recovered from the DID alone.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    network: String,
    public_key: Ed25519PublicKey,
    channel_id: ChannelId,
}

impl Did {
    /// The DID method name.
    pub const METHOD: &'static str = "provenance";

    /// Derive the identifier for a key anchored on a channel.
    pub fn derive(
        network: &str,
        public_key: &Ed25519PublicKey,
        channel_id: &ChannelId,
    ) -> Result<Self, CoreError> {
        if network.is_empty() || network.contains(':') {
            return Err(CoreError::InvalidDid(format!("invalid network {network:?}")));
        }
        if channel_id.as_str().is_empty() || channel_id.as_str().contains('#') {
            return Err(CoreError::InvalidDid(format!(
                "invalid channel id {:?}",
                channel_id.as_str()
            )));
        }
        Ok(Self {
            network: network.to_string(),
            public_key: *public_key,
            channel_id: channel_id.clone(),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// A verification method reference, e.g. `did:...#key-1`.
    pub fn key_reference(&self, fragment: &str) -> String {
        format!("{self}#{fragment}")
    }

    /// Split a verification method reference into its DID and fragment.
    pub fn parse_reference(reference: &str) -> Result<(Did, Option<String>), CoreError> {
        match reference.split_once('#') {
            Some((did, fragment)) => Ok((did.parse()?, Some(fragment.to_string()))),
            None => Ok((reference.parse()?, None)),
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did:{}:{}:{}_{}",
            Self::METHOD,
            self.network,
            self.public_key.to_hex(),
            self.channel_id
        )
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({self})")
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDid(s.to_string());

        let rest = s
            .strip_prefix("did:")
            .and_then(|r| r.strip_prefix(Self::METHOD))
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(invalid)?;
        let (network, rest) = rest.split_once(':').ok_or_else(invalid)?;
        let (key_hex, channel) = rest.split_once('_').ok_or_else(invalid)?;
        let public_key = Ed25519PublicKey::from_hex(key_hex).map_err(|_| invalid())?;

        Self::derive(network, &public_key, &ChannelId::from(channel))
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.to_string()
    }
}

/// A single message read back from a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    /// Position within the channel (1-indexed, strictly increasing).
    pub sequence_number: u64,
    /// Time the log accepted the message (Unix milliseconds).
    pub timestamp: i64,
    /// The raw payload bytes.
    pub payload: Bytes,
}

impl LogMessage {
    pub fn new(sequence_number: u64, timestamp: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            sequence_number,
            timestamp,
            payload: payload.into(),
        }
    }
}

/// RFC 3339 form used for every timestamp written into a document.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
