//! Route table and handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use provenance_kernel::core::{ChannelId, Creator, CredentialArtifact, LogMessage};
use provenance_kernel::log::{AppendReceipt, ReadOrder};
use provenance_kernel::{
    IdentityRecord, Issuance, IssueRequest, Package, RevocationNotice, RevocationStatus,
    SentinelRecord, SongContext, VerificationReport,
};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/channels", post(create_channel))
        .route(
            "/channels/:id/messages",
            post(submit_message).get(read_messages),
        )
        .route(
            "/channels/:id/revocations/:credential_id",
            get(revocation_status),
        )
        .route("/identities", post(register_identity))
        .route("/identities/:channel_id", get(resolve_identity))
        .route("/credentials", post(issue_credential))
        .route("/credentials/verify", post(verify_credential))
        .route("/revocations", post(revoke))
        .route("/packages", post(assemble_package))
        .route("/sentinel", get(sentinel))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let kernel = &state.kernel;
    let sentinel = kernel
        .sentinel()
        .map(|s| json!({ "did": s.did, "channelId": s.channel_id }));
    let warnings = kernel.startup_warnings();
    Json(json!({
        "status": if warnings.is_empty() { "ok" } else { "degraded" },
        "network": kernel.config().network,
        "issuer": kernel.identity().public_key().to_hex(),
        "sentinel": sentinel,
        "warnings": warnings,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Channels
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateChannel {
    #[serde(default)]
    memo: String,
}

async fn create_channel(
    State(state): State<AppState>,
    Json(body): Json<CreateChannel>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let channel = state.kernel.create_channel(&body.memo).await?;
    Ok((StatusCode::CREATED, Json(json!({ "channelId": channel }))))
}

#[derive(Debug, Deserialize)]
struct SubmitMessage {
    message: String,
}

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitMessage>,
) -> ApiResult<(StatusCode, Json<Vec<AppendReceipt>>)> {
    let receipts = state
        .kernel
        .publish_text(&ChannelId::from(id), &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(receipts)))
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    #[serde(default)]
    order: ReadOrder,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageView {
    sequence_number: u64,
    timestamp: i64,
    message: String,
}

impl From<LogMessage> for MessageView {
    fn from(m: LogMessage) -> Self {
        Self {
            sequence_number: m.sequence_number,
            timestamp: m.timestamp,
            message: String::from_utf8_lossy(&m.payload).into_owned(),
        }
    }
}

async fn read_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ReadParams>,
) -> ApiResult<Json<Vec<MessageView>>> {
    let messages = state
        .kernel
        .read_messages(&ChannelId::from(id), params.order, params.limit)
        .await?;
    Ok(Json(messages.into_iter().map(MessageView::from).collect()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Identities
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterIdentity {
    name: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

async fn register_identity(
    State(state): State<AppState>,
    Json(body): Json<RegisterIdentity>,
) -> ApiResult<(StatusCode, Json<IdentityRecord>)> {
    let record = state
        .kernel
        .register_identity(&body.name, body.attributes)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
struct ResolveParams {
    #[serde(default)]
    wait: bool,
}

async fn resolve_identity(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(params): Query<ResolveParams>,
) -> ApiResult<Json<IdentityRecord>> {
    let channel = ChannelId::from(channel_id);
    let record = if params.wait {
        state.kernel.resolve_identity_with_wait(&channel).await?
    } else {
        state.kernel.resolve_identity(&channel).await?
    };
    Ok(Json(record))
}

async fn sentinel(State(state): State<AppState>) -> ApiResult<Json<SentinelRecord>> {
    match state.kernel.sentinel() {
        Some(record) => Ok(Json(record.clone())),
        None => Err(ApiError::Unavailable("sentinel identity not initialized".into())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueCredential {
    /// Channel of the issuing identity; the issuer DID is derived from it.
    issuer_channel: ChannelId,
    subject_channel: ChannelId,
    #[serde(default = "untitled")]
    title: String,
    #[serde(default)]
    creators: Vec<Creator>,
    #[serde(default)]
    artifacts: Vec<CredentialArtifact>,
    master_hash: Option<String>,
    #[serde(default)]
    contribution_count: u32,
}

fn untitled() -> String {
    "Untitled".to_string()
}

async fn issue_credential(
    State(state): State<AppState>,
    Json(body): Json<IssueCredential>,
) -> ApiResult<(StatusCode, Json<Issuance>)> {
    let issuer = state.kernel.issuer_did(&body.issuer_channel)?;
    let issuance = state
        .kernel
        .issue_credential(IssueRequest {
            issuer,
            subject_channel: body.subject_channel,
            issuer_channel: Some(body.issuer_channel),
            title: body.title,
            creators: body.creators,
            artifacts: body.artifacts,
            master_hash: body.master_hash,
            contribution_count: body.contribution_count,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(issuance)))
}

async fn verify_credential(
    State(state): State<AppState>,
    Json(credential): Json<Value>,
) -> Json<VerificationReport> {
    Json(state.kernel.verify(&credential))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Revoke {
    channel_id: ChannelId,
    credential_id: String,
    #[serde(default)]
    reason: String,
    revoked_by: String,
}

async fn revoke(
    State(state): State<AppState>,
    Json(body): Json<Revoke>,
) -> ApiResult<(StatusCode, Json<RevocationNotice>)> {
    let notice = state
        .kernel
        .revoke(
            &body.channel_id,
            &body.credential_id,
            &body.reason,
            &body.revoked_by,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(notice)))
}

async fn revocation_status(
    State(state): State<AppState>,
    Path((id, credential_id)): Path<(String, String)>,
) -> ApiResult<Json<RevocationStatus>> {
    let status = state
        .kernel
        .revocation_status(&ChannelId::from(id), &credential_id)
        .await?;
    Ok(Json(status))
}

async fn assemble_package(
    State(state): State<AppState>,
    Json(context): Json<SongContext>,
) -> ApiResult<Json<Package>> {
    Ok(Json(state.kernel.assemble_package(context).await?))
}
