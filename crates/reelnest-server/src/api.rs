use axum::{
    extract::State,
    http::{HeaderMap, Method},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use reelnest_shared::comments::validate_comment_text;
use reelnest_shared::{CommentId, CommentNode, MediaId};
use reelnest_store::{Media, Report, ReportStatus, SessionToken, User};

use crate::auth::{optional_session, require_session, verify_admin_token};
use crate::error::ServerError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

/// Largest accepted JSON body. Comments are capped in characters, so this
/// only has to leave room for multi-byte text.
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/media/{id}", get(media_get))
        .route("/media/{id}/comments", get(comments_list).post(comment_add))
        .route("/media/{id}/comments/{comment_id}/like", post(comment_toggle_like))
        .route("/media/{id}/reports", post(report_create))
        .route("/session", get(session_whoami).delete(session_logout))
        .route("/admin/users", post(admin_create_user))
        .route("/admin/media", post(admin_create_media))
        .route("/admin/media/{id}", delete(admin_delete_media))
        .route("/admin/reports", get(admin_list_reports))
        .route("/admin/reports/{id}/ignore", post(admin_ignore_report))
        .route("/admin/reports/{id}/remove-media", post(admin_remove_reported_media))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
struct AddCommentRequest {
    text: String,
    #[serde(default)]
    parent_id: Option<CommentId>,
}

/// Any non-empty reason is accepted; the list of reasons is a client concern.
#[derive(Deserialize)]
struct ReportRequest {
    reason: String,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Serialize)]
struct SessionResponse {
    user: User,
    avatar_url: String,
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
    #[serde(default)]
    avatar_path: Option<String>,
}

#[derive(Serialize)]
struct CreateUserResponse {
    user: User,
    token: SessionToken,
}

#[derive(Deserialize)]
struct CreateMediaRequest {
    title: String,
}

#[derive(Deserialize)]
struct ReportFilter {
    #[serde(default)]
    status: Option<ReportStatus>,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

fn default_limit() -> u32 {
    50
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn media_get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Media>, ServerError> {
    let media = state.with_db(move |db| db.get_media(MediaId(id))).await?;
    Ok(Json(media))
}

async fn comments_list(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<CommentNode>>, ServerError> {
    let forest = state
        .with_db(move |db| db.load_comment_forest(MediaId(id)))
        .await?;
    Ok(Json(forest))
}

/// Add a top-level comment, or a reply when `parent_id` is given. Returns
/// the complete forest so the client can re-render without refetching.
async fn comment_add(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AddCommentRequest>,
) -> Result<Json<Vec<CommentNode>>, ServerError> {
    let session = require_session(&headers, &state).await?;
    let text = validate_comment_text(&req.text, state.config.max_comment_chars)?;

    let media_id = MediaId(id);
    let node = CommentNode::authored_by(&session.actor, text);
    let parent_id = req.parent_id;

    let edit = state
        .with_db(move |db| db.add_comment(media_id, parent_id.as_ref(), node))
        .await?;

    Ok(Json(edit.forest))
}

async fn comment_toggle_like(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath((id, comment_id)): ApiPath<(i64, String)>,
) -> Result<Json<Vec<CommentNode>>, ServerError> {
    let session = require_session(&headers, &state).await?;

    let media_id = MediaId(id);
    let comment_id = CommentId(comment_id);
    let user_id = session.actor.user_id.clone();

    let edit = state
        .with_db(move |db| db.toggle_comment_like(media_id, &comment_id, &user_id))
        .await?;

    Ok(Json(edit.forest))
}

async fn report_create(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ReportRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if req.reason.trim().is_empty() {
        return Err(ServerError::BadRequest("Missing reason".into()));
    }
    let reporter = optional_session(&headers, &state)
        .await?
        .map(|s| s.actor.user_id);

    state
        .with_db(move |db| {
            db.insert_report(MediaId(id), reporter.as_ref(), &req.reason, req.note.as_deref())
        })
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
async fn session_whoami(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ServerError> {
    let session = require_session(&headers, &state).await?;
    Ok(Json(SessionResponse {
        user: session.user,
        avatar_url: session.actor.avatar_url,
    }))
}

async fn session_logout(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = require_session(&headers, &state).await?;
    let token = session.token;
    state.with_db(move |db| db.delete_session(token)).await?;

    info!(user = %session.user.id, "Session logged out");
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

async fn admin_create_user(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<Json<CreateUserResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let username = req.username.trim().to_string();
    if username.is_empty() || username.chars().any(char::is_whitespace) {
        return Err(ServerError::BadRequest(
            "Username must be non-empty and contain no whitespace".into(),
        ));
    }

    let (user, token) = state
        .with_db(move |db| {
            let user = db.create_user(&username, req.avatar_path.as_deref())?;
            let token = db.create_session(&user.id)?;
            Ok((user, token))
        })
        .await?;

    info!(user = %user.id, username = %user.username, "Admin created user");
    Ok(Json(CreateUserResponse { user, token }))
}

async fn admin_create_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateMediaRequest>,
) -> Result<Json<Media>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(ServerError::BadRequest("Missing title".into()));
    }

    let media = state.with_db(move |db| db.insert_media(&title)).await?;
    info!(media = %media.id, "Admin created media");
    Ok(Json(media))
}

async fn admin_delete_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<serde_json::Value>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let deleted = state.with_db(move |db| db.delete_media(MediaId(id))).await?;
    if !deleted {
        return Err(ServerError::NotFound(format!("media {id}")));
    }

    info!(media = id, "Admin deleted media and its comments");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn admin_list_reports(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ReportFilter>,
) -> Result<Json<Vec<Report>>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let limit = filter.limit.min(500);
    let reports = state
        .with_db(move |db| db.list_reports(filter.status, limit, filter.offset))
        .await?;
    Ok(Json(reports))
}

async fn admin_ignore_report(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Report>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let report = state
        .with_db(move |db| db.set_report_status(id, ReportStatus::Ignored))
        .await?;
    info!(report = %id, "Admin ignored report");
    Ok(Json(report))
}

/// Delete the reported media together with its comments and resolve the
/// report.
async fn admin_remove_reported_media(
    headers: HeaderMap,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Report>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let report = state.with_db(move |db| db.remove_reported_media(id)).await?;
    info!(report = %id, "Admin removed reported media");
    Ok(Json(report))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
