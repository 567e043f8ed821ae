use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};

use super::assets::{AssetLookup, AssetSource};
use super::executor::{ActionExecutor, view_args};
use super::export::render_markdown;
use super::models::{ActionRequest, FindingsDocument, IssuesDocument};
use super::query::{FilterParams, IssueFilter, build_dashboard};
use super::runner::ActionRunner;
use super::store::{TriageStore, load_json};
use crate::errors::{ActionError, RequestError, RunnerError, StoreError};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: TriageStore,
    pub runner: Arc<dyn ActionRunner>,
    pub executor: ActionExecutor,
    pub assets: AssetSource,
}

impl AppState {
    pub fn new(
        store: TriageStore,
        runner: Arc<dyn ActionRunner>,
        repo: impl Into<String>,
        assets: AssetSource,
    ) -> Self {
        let executor = ActionExecutor::new(Arc::clone(&runner), store.clone(), repo);
        Self {
            store,
            runner,
            executor,
            assets,
        }
    }

    pub fn repo(&self) -> &str {
        self.executor.repo()
    }
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Forbidden(String),
    BadGateway(String),
    GatewayTimeout(String),
    /// A `gh` call inside an action failed; body is `{ok: false, error}`.
    ActionFailed(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::ActionFailed(msg) => {
                return (StatusCode::BAD_GATEWAY, Json(json!({"ok": false, "error": msg})))
                    .into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("storage error: {}", err);
        ApiError::Internal(err.to_string())
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            e @ ActionError::EmptyComment => ApiError::BadRequest(e.to_string()),
            ActionError::Store(e) => e.into(),
            e if e.is_external() => ApiError::ActionFailed(e.to_string()),
            e => {
                tracing::error!("action failed: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

/// Mapping for read-only `gh` lookups.
impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::TimedOut => ApiError::GatewayTimeout("gh CLI timed out".into()),
            RunnerError::Failed(stderr) => ApiError::BadGateway(format!("gh CLI error: {}", stderr)),
            e @ RunnerError::Spawn { .. } => ApiError::BadGateway(format!("gh CLI error: {}", e)),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/issues", get(get_issues))
        .route("/api/issues/{number}", get(get_issue_detail))
        .route("/api/findings", get(get_findings))
        .route("/api/state", get(get_state))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/action", post(post_action))
        .route("/export", get(export_markdown))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

/// Raw JSON document, `{}` when the file is absent.
async fn load_raw(state: &SharedState, path: std::path::PathBuf) -> Result<Value, ApiError> {
    let value = state.store.call(move |_| load_json::<Value>(&path)).await?;
    Ok(match value {
        Value::Null => json!({}),
        other => other,
    })
}

async fn get_issues(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let path = state.store.issues_path();
    Ok(Json(load_raw(&state, path).await?))
}

async fn get_findings(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let path = state.store.findings_path();
    Ok(Json(load_raw(&state, path).await?))
}

async fn get_state(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let doc = state.store.call(|store| store.load_state()).await?;
    Ok(Json(doc))
}

async fn get_dashboard(
    State(state): State<SharedState>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = IssueFilter::try_from(params)?;
    let (issues, findings, triage) = state
        .store
        .call(|store| {
            let issues: IssuesDocument = load_json(&store.issues_path())?;
            let findings: FindingsDocument = load_json(&store.findings_path())?;
            Ok((issues, findings, store.load_state()?))
        })
        .await?;
    Ok(Json(build_dashboard(&issues.issues, &findings, &triage, &filter)))
}

async fn get_issue_detail(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let number = raw
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or(RequestError::InvalidNumber)?;

    let stdout = state.runner.run(&view_args(number, state.repo())).await?;
    let detail: Value = serde_json::from_str(&stdout)
        .map_err(|_| ApiError::BadGateway("Invalid JSON from gh CLI".into()))?;
    Ok(Json(detail))
}

async fn post_action(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req = ActionRequest::from_slice(&body)?;
    tracing::debug!(number = req.number, action = req.action.as_str(), "applying triage action");

    let outcome = state.executor.apply(req.number, req.action).await?;
    Ok(Json(json!({
        "ok": true,
        "action": outcome.status,
        "entry": outcome.entry,
    })))
}

async fn export_markdown(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let (findings, triage) = state
        .store
        .call(|store| {
            let findings: FindingsDocument = load_json(&store.findings_path())?;
            Ok((findings, store.load_state()?))
        })
        .await?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        render_markdown(&findings, &triage),
    ))
}

/// Fallback for everything the API doesn't route: static files for GET and
/// HEAD, JSON 404 for anything else.
pub async fn static_handler(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::NotFound("Not found".into()));
    }
    match state.assets.lookup(uri.path()).await {
        AssetLookup::Found { data, mime } => Ok((
            [(header::CONTENT_TYPE, mime)],
            Body::from(data),
        )
            .into_response()),
        AssetLookup::NotFound => Err(ApiError::NotFound("Not found".into())),
        AssetLookup::Forbidden => Err(ApiError::Forbidden("Forbidden".into())),
    }
}

/// Known path, unsupported method.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".into())
}
