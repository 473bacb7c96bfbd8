//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding, the credential signing digest,
//! deterministic Ed25519 signatures, and the manifest master hash. Any other
//! implementation of the wire format must reproduce them byte for byte.

use chrono::DateTime;

use provenance_kernel_core::{
    provenance_chain, ActorType, ArtifactEntry, ChannelId, ContributionRecord, ContributionRole,
    Credential, CredentialArtifact, CredentialBuilder, Did, Keypair, LogSummary, Manifest,
    Sha256Hash, SigningIdentity, SongMetadata, SongStatus,
};

/// Issuance time shared by every vector: 2025-01-14T16:00:00.000Z.
pub const VECTOR_TIME: i64 = 1_736_870_400;

/// A golden credential vector.
#[derive(Debug, Clone)]
pub struct CredentialVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub issuer_seed: [u8; 32],
    pub issuer_channel: &'static str,
    pub sentinel_seed: [u8; 32],
    pub sentinel_channel: &'static str,
    pub subject_channel: &'static str,
    pub id: &'static str,
    pub title: &'static str,
    /// `(did, role, share)`; empty means the issuer at 100%.
    pub creators: &'static [(&'static str, &'static str, u32)],
    /// `(name, contents)` of an audio artifact.
    pub artifact: Option<(&'static str, &'static [u8])>,
    pub master_hash: Option<&'static str>,
    pub contribution_count: u32,
    /// Expected signing digest (hex).
    pub expected_digest: &'static str,
    /// Expected assertion proof value (hex).
    pub expected_issuer_signature: &'static str,
    /// Expected authentication proof value (hex).
    pub expected_sentinel_signature: &'static str,
}

/// Get all credential vectors.
pub fn credential_vectors() -> Vec<CredentialVector> {
    vec![
        CredentialVector {
            name: "default creator",
            issuer_seed: [0x01; 32],
            issuer_channel: "0.0.1001",
            sentinel_seed: [0x02; 32],
            sentinel_channel: "0.0.1002",
            subject_channel: "0.0.2001",
            id: "urn:uuid:00000000-0000-4000-8000-000000000001",
            title: "Velvet Static",
            creators: &[],
            artifact: None,
            master_hash: None,
            contribution_count: 0,
            expected_digest: "2b5775f4c0df602d8158342b51d31657c0754d501c74d1d103e6918f84ce85ac",
            expected_issuer_signature: "14dbf8945fcc1f40694b25aefb9f61b6669d561956638a1412f9e00b83d76abc9f3b876c2b4eb5e78409fadcd6a868f127de45b2a5f2cd22161304f1ef409f07",
            expected_sentinel_signature: "aab9da874975f6c8bc8bf9f1fafd15dcaea81689d7a218ce596bf1a53efb159fd0a60f74e95e0a5f7640f098ddcf6ad137b24223ff46ee12f7b409e2731e3c0d",
        },
        CredentialVector {
            name: "split shares with artifact",
            issuer_seed: [0x01; 32],
            issuer_channel: "0.0.1001",
            sentinel_seed: [0x02; 32],
            sentinel_channel: "0.0.1002",
            subject_channel: "0.0.2001",
            id: "urn:uuid:00000000-0000-4000-8000-000000000002",
            title: "Velvet Static",
            creators: &[
                ("did:example:aria", "artist", 60),
                ("did:example:kai", "producer", 40),
            ],
            artifact: Some(("Velvet Static", b"RIFF-v1")),
            master_hash: Some("abababababababababababababababababababababababababababababababab"),
            contribution_count: 3,
            expected_digest: "cf1c67b8e6b010f19be541a0f9262539d8b60b5f27123abdb04ddefcddd96844",
            expected_issuer_signature: "ca232361026f8192d6bd6f8a850782c8debd5f435c7ab64093fd06695354cca06984dd7c7a3613884e1a674d2e7f173457be25a88b20c4abcce1e31fe3f5d40e",
            expected_sentinel_signature: "b6355db4bc9d73485e2a46e668a4f87ede602ec5e3da1fcaa4e1c7375c9f7e9074841ad1830ff8de827b4e573c7aab88a40ef1f74a3e0f39da3f3149af26450c",
        },
    ]
}

/// Build and dual-sign the credential a vector describes.
pub fn credential_from_vector(vector: &CredentialVector) -> Credential {
    let issuer_key = Keypair::from_seed(&vector.issuer_seed);
    let sentinel_key = Keypair::from_seed(&vector.sentinel_seed);
    let issuer = did(&issuer_key, vector.issuer_channel);
    let sentinel = did(&sentinel_key, vector.sentinel_channel);

    let creators = vector
        .creators
        .iter()
        .map(|(did, role, share)| provenance_kernel_core::Creator::new(*did, *role, *share))
        .collect();
    let artifacts = vector
        .artifact
        .iter()
        .map(|(name, contents)| CredentialArtifact {
            kind: "audio".to_string(),
            name: name.to_string(),
            sha256: Some(Sha256Hash::hash(contents).to_hex()),
        })
        .collect();

    let mut builder = CredentialBuilder::new(issuer, ChannelId::from(vector.subject_channel))
        .id(vector.id)
        .issued_at(vector_time())
        .title(vector.title)
        .creators(creators)
        .artifacts(artifacts)
        .contribution_count(vector.contribution_count);
    if let Some(hash) = vector.master_hash {
        builder = builder.master_hash(hash);
    }

    builder
        .build()
        .expect("vector shares are valid")
        .sign(
            &issuer_key,
            Some(SigningIdentity {
                keypair: &sentinel_key,
                did: &sentinel,
            }),
        )
        .expect("vector keys match their DIDs")
}

/// Expected master hash of [`manifest_vector`].
pub const MANIFEST_VECTOR_HASH: &str =
    "2869887e2046e3d03727d13572e4ae9fce873458a78ddd67abfc1b1ea9dac096";

/// A fixed manifest: one hashed track, one contribution, empty snapshot.
pub fn manifest_vector() -> Manifest {
    let song = SongMetadata {
        title: "Glass Harbor".to_string(),
        genre: Some("synthpop".to_string()),
        status: SongStatus::Final,
        ..Default::default()
    };
    let log = LogSummary {
        network: "testnet".to_string(),
        channel_id: Some(ChannelId::from("0.0.2001")),
        message_count: 0,
    };
    let chain = provenance_chain(&[ContributionRecord {
        position: 1,
        role: ContributionRole::Lyricist,
        actor_type: ActorType::Human,
        actor_name: "Aria".to_string(),
        description: "verse".to_string(),
        evidence: None,
        anchor: None,
    }]);
    Manifest::new(
        song,
        log,
        vec![ArtifactEntry::audio("Glass Harbor", 1, "v1.wav", b"RIFF-v1")],
        chain,
        Vec::new(),
        vector_time(),
    )
}

/// Check every vector; returns `(name, matches, computed digest)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let mut results: Vec<_> = credential_vectors()
        .iter()
        .map(|v| {
            let credential = credential_from_vector(v);
            let digest = credential
                .signing_digest()
                .expect("vector credential encodes")
                .to_hex();
            let matches = digest == v.expected_digest
                && credential.proof[0].proof_value == v.expected_issuer_signature
                && credential.proof[1].proof_value == v.expected_sentinel_signature;
            (v.name.to_string(), matches, digest)
        })
        .collect();

    let hash = manifest_vector()
        .master_hash()
        .expect("vector manifest encodes")
        .to_hex();
    results.push(("manifest".to_string(), hash == MANIFEST_VECTOR_HASH, hash));
    results
}

fn did(keypair: &Keypair, channel: &str) -> Did {
    Did::derive("testnet", &keypair.public_key(), &ChannelId::from(channel))
        .expect("vector DIDs are well formed")
}

fn vector_time() -> chrono::DateTime<chrono::Utc> {
    DateTime::from_timestamp(VECTOR_TIME, 0).expect("vector time in range")
}
