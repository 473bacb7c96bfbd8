//! End-to-end properties of the kernel over an in-memory log.

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Value};
use tokio::task::JoinSet;

use provenance_kernel::{IssueRequest, KernelError, SongContext, Stage, TrackFile};
use provenance_kernel_core::{
    decode, decode_all, encode, verify::*, ChunkLimits, Envelope, LogMessage, SongMetadata,
};
use provenance_kernel_log::{MemoryLog, ReadOrder};
use provenance_kernel_testkit::generators::payload_text;
use provenance_kernel_testkit::{creators, fast_config, kernel_with, FaultyLog, TestFixture};

fn as_messages(fragments: Vec<String>) -> Vec<LogMessage> {
    fragments
        .into_iter()
        .enumerate()
        .map(|(i, text)| LogMessage::new(i as u64 + 1, 0, text.into_bytes()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn codec_roundtrip(text in payload_text(10, 10_000)) {
        let payload = json!({
            "type": "RevocationNotice",
            "credentialId": "urn:uuid:roundtrip",
            "reason": text,
            "revokedBy": "did:example:label",
            "revokedAt": "2026-01-01T00:00:00.000Z",
        })
        .to_string();
        let fragments = encode(&payload, &ChunkLimits::default()).unwrap();
        prop_assert!(fragments.iter().all(|f| f.len() <= 1024));
        if payload.len() <= 1024 {
            prop_assert_eq!(fragments.len(), 1);
        }

        match decode(&as_messages(fragments)).unwrap() {
            Envelope::Revocation(notice) => prop_assert_eq!(notice.reason, text),
            other => prop_assert!(false, "unexpected {:?}", other.kind()),
        }
    }
}

#[tokio::test]
async fn share_sets() {
    let fixture = TestFixture::new().await;
    let artist = fixture.register_artist("Aria").await;
    let song = fixture.song_channel("Velvet Static").await;

    for rejected in [
        creators(&[("did:example:a", "artist", 70), ("did:example:b", "producer", 40)]),
        creators(&[("did:example:a", "artist", 50), ("did:example:b", "producer", 40)]),
        creators(&[("did:example:a", "artist", 0), ("did:example:b", "producer", 0)]),
    ] {
        let err = fixture
            .kernel
            .issue_credential(fixture.issue_request(&artist, &song, rejected))
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidShares { .. }));
    }
    assert_eq!(fixture.log().message_count(&song), 0);

    for accepted in [
        creators(&[("did:example:a", "artist", 60), ("did:example:b", "producer", 40)]),
        creators(&[("did:example:a", "artist", 100)]),
    ] {
        let issuance = fixture
            .kernel
            .issue_credential(fixture.issue_request(&artist, &song, accepted))
            .await
            .unwrap();
        assert!(verify(&issuance.credential).valid);
    }
}

#[tokio::test]
async fn issued_credential_verifies_and_detects_tampering() {
    let fixture = TestFixture::new().await;
    let artist = fixture.register_artist("Aria").await;
    let song = fixture.song_channel("Velvet Static").await;
    let issuance = fixture
        .kernel
        .issue_credential(fixture.issue_request(&artist, &song, Vec::new()))
        .await
        .unwrap();

    let value = serde_json::to_value(&issuance.credential).unwrap();
    let report = fixture.kernel.verify(&value);
    assert!(report.valid);
    assert!(report.check(CHECK_SENTINEL_ATTESTATION).unwrap().passed);

    let mut tampered = value.clone();
    tampered["credentialSubject"]["title"] = Value::from("Someone Else's Song");
    let report = fixture.kernel.verify(&tampered);
    assert!(!report.valid);
    assert!(!report.check(CHECK_SIGNATURE_ISSUER).unwrap().passed);

    let mut unattested = value;
    unattested["proof"].as_array_mut().unwrap().truncate(1);
    let report = fixture.kernel.verify(&unattested);
    assert!(!report.valid);
    assert!(!report.check(CHECK_SENTINEL_ATTESTATION).unwrap().passed);
    assert!(report.check(CHECK_SIGNATURE_ISSUER).unwrap().passed);
}

#[tokio::test]
async fn revocation_keeps_credential_and_notice_in_order() {
    let fixture = TestFixture::new().await;
    let artist = fixture.register_artist("Aria").await;
    let song = fixture.song_channel("Velvet Static").await;
    let credential = fixture
        .kernel
        .issue_credential(fixture.issue_request(&artist, &song, Vec::new()))
        .await
        .unwrap()
        .credential;

    fixture
        .kernel
        .revoke(&song, &credential.id, "rights dispute", "did:example:label")
        .await
        .unwrap();

    let messages = fixture
        .kernel
        .read_messages(&song, ReadOrder::Ascending, None)
        .await
        .unwrap();
    let documents = decode_all(&messages).documents;
    assert_eq!(documents.len(), 2);
    match (&documents[0].envelope, &documents[1].envelope) {
        (Envelope::Credential(c), Envelope::Revocation(n)) => {
            assert_eq!(**c, credential);
            assert_eq!(n.credential_id, credential.id);
        }
        other => panic!("unexpected order {other:?}"),
    }
    assert!(documents[0].sequence_number < documents[1].sequence_number);

    let status = fixture
        .kernel
        .revocation_status(&song, &credential.id)
        .await
        .unwrap();
    assert!(status.revoked);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_on_distinct_channels() {
    let kernel = Arc::new(kernel_with(MemoryLog::new(), fast_config()).await);
    let artist = kernel
        .register_identity("Aria", serde_json::Map::new())
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let kernel = Arc::clone(&kernel);
        let artist = artist.clone();
        tasks.spawn(async move {
            let song = kernel.create_channel(&format!("SONG:{i}")).await.unwrap();
            let issuance = kernel
                .issue_credential(IssueRequest {
                    issuer: artist.did,
                    subject_channel: song.clone(),
                    issuer_channel: None,
                    title: format!("song {i}"),
                    creators: Vec::new(),
                    artifacts: Vec::new(),
                    master_hash: None,
                    contribution_count: 0,
                })
                .await
                .unwrap();
            (song, issuance)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (song, issuance) = joined.unwrap();
        assert!(issuance.warnings.is_empty());
        assert_eq!(
            issuance.credential.credential_subject.provenance_chain.channel_id,
            song
        );

        let messages = kernel
            .read_messages(&song, ReadOrder::Ascending, None)
            .await
            .unwrap();
        let documents = decode_all(&messages).documents;
        assert_eq!(documents.len(), 1);
        match &documents[0].envelope {
            Envelope::Credential(c) => {
                assert_eq!(c.id, issuance.credential.id);
                assert_eq!(c.credential_subject.title, issuance.credential.credential_subject.title);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }
}

#[tokio::test]
async fn package_against_unreachable_log() {
    let kernel = kernel_with(FaultyLog::new(MemoryLog::new()), fast_config()).await;
    let song = kernel.create_channel("SONG:Glass Harbor").await.unwrap();
    let issuer = kernel.issuer_did(&song).unwrap();

    kernel.log().fail_reads(true);
    kernel.log().fail_appends(true);
    let package = kernel
        .assemble_package(SongContext {
            song: SongMetadata {
                title: "Glass Harbor".into(),
                ..Default::default()
            },
            channel_id: Some(song),
            tracks: vec![TrackFile {
                title: "Glass Harbor".into(),
                version: 1,
                file_path: "missing.wav".into(),
            }],
            issuer: Some(issuer),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        package.master_hash,
        package.manifest.master_hash().unwrap().to_hex()
    );
    let stages: Vec<_> = package.warnings.iter().map(|w| w.stage).collect();
    for stage in [
        Stage::ArtifactHash,
        Stage::OnChainSnapshot,
        Stage::CertificateStamp,
        Stage::PublishSubject,
    ] {
        assert!(stages.contains(&stage), "missing {stage:?} in {stages:?}");
    }
    assert!(verify(&package.credential.unwrap()).valid);
}

#[tokio::test]
async fn transient_append_failures_are_retried() {
    let kernel = kernel_with(FaultyLog::new(MemoryLog::new()), fast_config()).await;
    let song = kernel.create_channel("SONG:retry").await.unwrap();

    let before = kernel.log().append_calls();
    kernel.log().fail_next_appends(2);
    kernel
        .revoke(&song, "urn:uuid:1", "test", "did:example:label")
        .await
        .unwrap();

    assert_eq!(kernel.log().append_calls() - before, 3);
    assert_eq!(kernel.log().inner().message_count(&song), 1);
}

#[tokio::test]
async fn exhausted_retries_surface_as_transient() {
    let kernel = kernel_with(FaultyLog::new(MemoryLog::new()), fast_config()).await;
    kernel.log().fail_creates(true);
    let err = kernel
        .register_identity("Aria", serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn self_made_sentinel_is_not_attestation() {
    use provenance_kernel_core::{ChannelId, CredentialBuilder, Did, Keypair, SigningIdentity};

    let fixture = TestFixture::new().await;
    let platform = fixture.kernel.sentinel().unwrap().clone();

    let issuer = Keypair::from_seed(&[0x77; 32]);
    let rogue = Keypair::from_seed(&[0x78; 32]);
    let issuer_did = Did::derive("testnet", &issuer.public_key(), &ChannelId::from("0.0.4242")).unwrap();
    let rogue_did = Did::derive("testnet", &rogue.public_key(), &platform.channel_id).unwrap();
    assert_ne!(rogue_did, platform.did);

    let credential = CredentialBuilder::new(issuer_did, ChannelId::from("0.0.4243"))
        .title("Borrowed Glory")
        .build()
        .unwrap()
        .sign(
            &issuer,
            Some(SigningIdentity {
                keypair: &rogue,
                did: &rogue_did,
            }),
        )
        .unwrap();
    let value = serde_json::to_value(&credential).unwrap();

    // Self-consistent on its own terms.
    assert!(verify_value(&value).valid);

    let report = fixture.kernel.verify(&value);
    assert!(!report.valid);
    assert!(report.check(CHECK_SIGNATURE_ISSUER).unwrap().passed);
    assert!(!report.check(CHECK_SIGNATURE_SENTINEL).unwrap().passed);
    assert!(!report.check(CHECK_SENTINEL_ATTESTATION).unwrap().passed);
}

#[tokio::test]
async fn failed_sentinel_bootstrap_is_kept_as_warning() {
    let log = FaultyLog::new(MemoryLog::new());
    log.fail_creates(true);
    let kernel = kernel_with(log, fast_config()).await;

    assert!(kernel.sentinel().is_none());
    let warnings = kernel.startup_warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].stage, Stage::Sentinel);

    // Nothing to pin against, so no proof counts as attestation.
    kernel.log().fail_creates(false);
    let song = kernel.create_channel("SONG:Offline").await.unwrap();
    let issuance = kernel
        .issue_credential(IssueRequest {
            issuer: kernel.issuer_did(&song).unwrap(),
            subject_channel: song,
            issuer_channel: None,
            title: "Offline".into(),
            creators: Vec::new(),
            artifacts: Vec::new(),
            master_hash: None,
            contribution_count: 0,
        })
        .await
        .unwrap();
    assert_eq!(issuance.credential.proof.len(), 1);
    let report = kernel.verify(&serde_json::to_value(&issuance.credential).unwrap());
    assert!(!report.valid);
    assert!(report.check(CHECK_SIGNATURE_ISSUER).unwrap().passed);
    assert!(!report.check(CHECK_SENTINEL_ATTESTATION).unwrap().passed);
}
