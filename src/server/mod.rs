//! HTTP boundary
//!
//! Thin rim over the engine: routing, header parsing, Basic
//! authentication and the mapping from typed engine errors to status
//! codes. Writes carry `branch-id`, `root-file-id` and `time` headers,
//! run the branch compare-and-swap before mutating, and return the new
//! root id in a `root-file-id` response header after advancing the
//! branch.

use crate::branch::BranchRegistry;
use crate::error::FsError;
use crate::fs::Notefs;
use crate::types::{BranchId, FileId, FileView, Timestamp, UserId};
use crate::users::Users;
use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::{Extension, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub const ROOT_FILE_ID_HEADER: &str = "root-file-id";
pub const BRANCH_ID_HEADER: &str = "branch-id";
pub const TIME_HEADER: &str = "time";
pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

#[derive(Clone)]
pub struct AppState {
    pub fs: Arc<Notefs>,
    pub branches: Arc<BranchRegistry>,
    pub users: Arc<Users>,
}

/// The authenticated user, attached by the auth middleware.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/subscriptions", get(list_subscriptions))
        .route("/files", get(read_root))
        .route(
            "/files/*path",
            get(read_file)
                .patch(create_file)
                .put(update_file)
                .delete(delete_file),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, listen: &str) -> Result<(), FsError> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(%listen, "notefs listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Boundary error: a status code plus a short plain-text message.
/// Internal failures are logged and served as an opaque 500.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_acceptable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_ACCEPTABLE,
            message: message.into(),
        }
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        let status = match &err {
            FsError::NotFound => StatusCode::NOT_FOUND,
            FsError::AlreadyExists(_)
            | FsError::ConcurrencyConflict
            | FsError::LineageMismatch { .. } => StatusCode::CONFLICT,
            FsError::TypeMismatch { .. } | FsError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => {
                error!(error = %err, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal error".to_string()
        } else {
            err.to_string()
        };
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let user = match authenticate(&state, request.headers()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    request.extensions_mut().insert(AuthUser(user));
    next.run(request).await
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserId, Response> {
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| BASE64.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok());
    let Some(credentials) = credentials else {
        return Err(unauthorized());
    };
    let Some((name, password)) = credentials.split_once(':') else {
        return Err(unauthorized());
    };
    match state.users.authenticate(name, password) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(unauthorized()),
        Err(err) => Err(ApiError::from(err).into_response()),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"notefs\"")],
        "authentication required",
    )
        .into_response()
}

/// Headers common to every write: the branch being advanced, the root the
/// caller is working from, and the caller-supplied edit time.
struct WriteContext {
    branch: BranchId,
    root: FileId,
    time: Timestamp,
}

fn write_context(headers: &HeaderMap) -> Result<WriteContext, ApiError> {
    Ok(WriteContext {
        branch: required_header(headers, BRANCH_ID_HEADER)?,
        root: required_header(headers, ROOT_FILE_ID_HEADER)?,
        time: required_header(headers, TIME_HEADER)?,
    })
}

fn required_header<T: FromStr>(headers: &HeaderMap, name: &str) -> Result<T, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ApiError::bad_request(format!("missing or malformed {name} header")))
}

fn is_markdown(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with(MARKDOWN_CONTENT_TYPE))
        .unwrap_or(false)
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn view_response(view: FileView) -> Response {
    match view {
        FileView::Regular(bytes) => {
            ([(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], bytes).into_response()
        }
        FileView::Directory(entries) => Json(entries).into_response(),
    }
}

async fn read_root(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let root: FileId = required_header(&headers, ROOT_FILE_ID_HEADER)?;
    Ok(view_response(state.fs.file_view(root, &[])?))
}

async fn read_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let root: FileId = required_header(&headers, ROOT_FILE_ID_HEADER)?;
    let segments = split_path(&path);
    Ok(view_response(state.fs.file_view(root, &segments)?))
}

async fn create_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = write_context(&headers)?;
    state.branches.require_current(ctx.branch, ctx.root)?;

    let segments = split_path(&path);
    let Some((name, dir_path)) = segments.split_last() else {
        return Err(ApiError::bad_request("empty path"));
    };
    let new_root = if is_markdown(&headers) {
        state
            .fs
            .create_regular_file(ctx.root, dir_path, name, &body, ctx.time)?
    } else {
        state
            .fs
            .create_directory(ctx.root, dir_path, name, ctx.time)?
    };
    state.branches.advance(ctx.branch, ctx.root, new_root)?;
    Ok(new_root_response(new_root))
}

async fn update_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let ctx = write_context(&headers)?;
    if !is_markdown(&headers) {
        return Err(ApiError::not_acceptable("updates require text/markdown"));
    }
    state.branches.require_current(ctx.branch, ctx.root)?;

    let segments = split_path(&path);
    let new_root = state.fs.update_file(ctx.root, &segments, &body, ctx.time)?;
    state.branches.advance(ctx.branch, ctx.root, new_root)?;
    Ok(new_root_response(new_root))
}

async fn delete_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ctx = write_context(&headers)?;
    state.branches.require_current(ctx.branch, ctx.root)?;

    let segments = split_path(&path);
    let Some(new_root) = state.fs.delete_file(ctx.root, &segments, ctx.time)? else {
        return Err(ApiError::bad_request("nothing above the root to remove"));
    };
    state.branches.advance(ctx.branch, ctx.root, new_root)?;
    Ok(new_root_response(new_root))
}

fn new_root_response(new_root: FileId) -> Response {
    (
        StatusCode::OK,
        [(ROOT_FILE_ID_HEADER, new_root.to_string())],
    )
        .into_response()
}

async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let views = state.users.subscriptions_view(user, &state.branches)?;
    Ok(Json(views).into_response())
}
