//! HTTP surface driven in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use provenance_kernel::core::Keypair;
use provenance_kernel::log::MemoryLog;
use provenance_kernel::{Kernel, KernelConfig, ServiceIdentity};
use provenance_kernel_server::{router, AppState, SharedLog};
use provenance_kernel_testkit::{fast_config, service_identity, FaultyLog};

fn config() -> KernelConfig {
    KernelConfig {
        append_interval: Duration::ZERO,
        ..KernelConfig::default()
    }
}

async fn app(with_sentinel: bool) -> Router {
    let mut identity = ServiceIdentity::new(Keypair::from_seed(&[0x01; 32]));
    if with_sentinel {
        identity = identity.with_sentinel(Keypair::from_seed(&[0x02; 32]));
    }
    let log: SharedLog = Arc::new(MemoryLog::new());
    router(AppState::new(Kernel::start(identity, log, config()).await))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // extractor rejections come back as plain text
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

#[tokio::test]
async fn health_and_sentinel() {
    let app = app(true).await;
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["issuer"].as_str().unwrap().len(), 64);
    assert_eq!(body["sentinel"]["channelId"], "0.0.1001");
    assert_eq!(body["warnings"], json!([]));
    let health_did = body["sentinel"]["did"].clone();

    let (status, body) = call(&app, Method::GET, "/sentinel", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channelId"], "0.0.1001");
    assert_eq!(body["did"], health_did);

    let bare = self::app(false).await;
    let (status, _) = call(&bare, Method::GET, "/sentinel", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (_, body) = call(&bare, Method::GET, "/health", None).await;
    assert_eq!(body["sentinel"], Value::Null);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn health_reports_failed_sentinel_bootstrap() {
    let log = FaultyLog::new(MemoryLog::new());
    log.fail_creates(true);
    let log: SharedLog = Arc::new(log);
    let app = router(AppState::new(
        Kernel::start(service_identity(), log, fast_config()).await,
    ));

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["sentinel"], Value::Null);
    assert_eq!(body["warnings"][0]["stage"], "sentinel");
}

#[tokio::test]
async fn channel_messages_roundtrip() {
    let app = app(false).await;
    let (status, body) = call(&app, Method::POST, "/channels", Some(json!({"memo": "notes"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let channel = body["channelId"].as_str().unwrap().to_string();

    for text in ["first", "second"] {
        let (status, receipts) = call(
            &app,
            Method::POST,
            &format!("/channels/{channel}/messages"),
            Some(json!({"message": text})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipts.as_array().unwrap().len(), 1);
    }

    let (status, messages) = call(
        &app,
        Method::GET,
        &format!("/channels/{channel}/messages?order=desc&limit=1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages[0]["message"], "second");
    assert_eq!(messages[0]["sequenceNumber"], 2);

    let (status, _) = call(&app, Method::GET, "/channels/0.0.404/messages", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn identity_credential_verify_revoke() {
    let app = app(true).await;

    let (status, artist) = call(
        &app,
        Method::POST,
        "/identities",
        Some(json!({"name": "Aria", "attributes": {"genre": "synthpop"}})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let artist_channel = artist["channelId"].as_str().unwrap().to_string();

    let (status, resolved) =
        call(&app, Method::GET, &format!("/identities/{artist_channel}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["did"], artist["did"]);

    let (_, song) = call(&app, Method::POST, "/channels", Some(json!({"memo": "SONG:Velvet"}))).await;
    let song_channel = song["channelId"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        "/credentials",
        Some(json!({
            "issuerChannel": artist_channel,
            "subjectChannel": song_channel,
            "title": "Velvet",
            "creators": [
                {"did": "did:example:aria", "role": "artist", "share": 70},
                {"did": "did:example:kai", "role": "producer", "share": 40},
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("110"));

    let (status, issuance) = call(
        &app,
        Method::POST,
        "/credentials",
        Some(json!({
            "issuerChannel": artist_channel,
            "subjectChannel": song_channel,
            "title": "Velvet",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issuance["warnings"], json!([]));
    let credential = issuance["credential"].clone();
    assert_eq!(credential["proof"].as_array().unwrap().len(), 2);

    let (status, report) =
        call(&app, Method::POST, "/credentials/verify", Some(credential.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["valid"], true);

    let mut tampered = credential.clone();
    tampered["credentialSubject"]["title"] = json!("Stolen");
    let (_, report) = call(&app, Method::POST, "/credentials/verify", Some(tampered)).await;
    assert_eq!(report["valid"], false);

    let credential_id = credential["id"].as_str().unwrap().to_string();
    let (status, _) = call(
        &app,
        Method::POST,
        "/revocations",
        Some(json!({
            "channelId": song_channel,
            "credentialId": credential_id,
            "reason": "superseded",
            "revokedBy": "did:example:label",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, revocation) = call(
        &app,
        Method::GET,
        &format!("/channels/{song_channel}/revocations/{credential_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revocation["revoked"], true);
    assert_eq!(revocation["notice"]["reason"], "superseded");
}

#[tokio::test]
async fn package_endpoint() {
    let app = app(true).await;
    let (_, song) = call(&app, Method::POST, "/channels", Some(json!({"memo": "SONG:Harbor"}))).await;

    let (status, package) = call(
        &app,
        Method::POST,
        "/packages",
        Some(json!({
            "song": {"title": "Glass Harbor", "status": "final"},
            "channelId": song["channelId"],
            "contributions": [
                {"position": 1, "role": "lyricist", "actorType": "human", "actorName": "Aria"},
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(package["masterHash"].as_str().unwrap().len(), 64);
    assert_eq!(package["manifest"]["provenanceChain"][0]["actorName"], "Aria");
    assert_eq!(package["credential"], Value::Null);
}

#[tokio::test]
async fn malformed_body_is_client_error() {
    let app = app(false).await;
    let (status, _) = call(&app, Method::POST, "/identities", Some(json!({"nom": "x"}))).await;
    assert!(status.is_client_error());
}
