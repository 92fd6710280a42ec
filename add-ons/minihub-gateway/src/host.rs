//! Dynamic hosting of mounted apps.
//!
//! Unmatched requests land here and are resolved against the current mount snapshot:
//! `/<slug>/…` is served from the app's `public/` directory, `/api/<slug>/…` is forwarded to
//! the backend runtime, and anything else falls through to the landing site.

use crate::handlers::ApiError;
use crate::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderName, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use minihub_core::MountSnapshot;
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeDir;

const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

/// Headers that describe one hop and are not copied when forwarding.
const HOP_HEADERS: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

/// Where a request path resolves to.
#[derive(Debug, PartialEq, Eq)]
enum Target {
    /// `/<slug>` without trailing slash.
    AppRedirect(String),
    /// File under an app's `public/` directory; `tail` keeps the leading slash.
    AppStatic { app_dir: String, tail: String },
    /// `/api/<slug>/…` of a mounted app.
    Backend,
    /// `/api/<x>` with no mounted app.
    UnknownApi,
    Site,
}

fn resolve(snapshot: &MountSnapshot, path: &str) -> Target {
    let trimmed = path.trim_start_matches('/');
    let (first, rest) = match trimmed.split_once('/') {
        Some((first, rest)) => (first, Some(rest)),
        None => (trimmed, None),
    };

    if first == "api" {
        let segment = rest.and_then(|r| r.split('/').next()).unwrap_or("");
        return if snapshot.by_api_segment(segment).is_some() {
            Target::Backend
        } else {
            Target::UnknownApi
        };
    }

    match (snapshot.by_static_segment(first), rest) {
        (Some(_), None) => Target::AppRedirect(first.to_string()),
        (Some(entry), Some(tail)) => Target::AppStatic {
            app_dir: entry.app_dir.clone(),
            tail: format!("/{tail}"),
        },
        (None, _) => Target::Site,
    }
}

/// Router fallback.
pub(crate) async fn dispatch(State(state): State<AppState>, req: Request<Body>) -> Response {
    let target = {
        let snapshot = state.mounts.read().await;
        resolve(&snapshot, req.uri().path())
    };

    match target {
        Target::AppRedirect(slug) => {
            let location = match req.uri().query() {
                Some(q) => format!("/{slug}/?{q}"),
                None => format!("/{slug}/"),
            };
            Redirect::permanent(&location).into_response()
        }
        Target::AppStatic { app_dir, tail } => {
            let root = state.hub.store().public_path(&app_dir);
            serve_dir(root, &tail, req).await
        }
        Target::Backend => forward(&state, req).await,
        Target::UnknownApi => ApiError::new(
            StatusCode::NOT_FOUND,
            "route",
            format!("No app is mounted at {}", req.uri().path()),
        )
        .into_response(),
        Target::Site => {
            let path = req.uri().path().to_string();
            serve_dir(state.config.site_path(), &path, req).await
        }
    }
}

async fn serve_dir(root: PathBuf, path: &str, mut req: Request<Body>) -> Response {
    let uri = match req.uri().query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };
    match uri.parse::<Uri>() {
        Ok(uri) => *req.uri_mut() = uri,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    }
    match ServeDir::new(root).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(e) => match e {},
    }
}

/// Pass `/api/<slug>/…` to the backend runtime unchanged and relay its answer.
async fn forward(state: &AppState, req: Request<Body>) -> Response {
    let Some(backend) = state.config.backend_url.as_deref() else {
        return ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "forward",
            "No backend runtime is configured for app routes (set backend_url).",
        )
        .into_response();
    };

    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", backend.trim_end_matches('/'), path_and_query);

    let bytes = match axum::body::to_bytes(body, MAX_FORWARD_BODY).await {
        Ok(b) => b,
        Err(e) => {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "forward", e.to_string()).into_response();
        }
    };

    let mut outbound = state.http.request(parts.method.clone(), &url).body(bytes);
    for (name, value) in parts.headers.iter() {
        if !HOP_HEADERS.contains(name) {
            outbound = outbound.header(name, value);
        }
    }

    let upstream = match outbound.send().await {
        Ok(res) => res,
        Err(e) => {
            tracing::warn!(target: "minihub::gateway", url = %url, error = %e, "backend unreachable");
            return ApiError::new(StatusCode::BAD_GATEWAY, "forward", format!("Backend unreachable: {e}"))
                .into_response();
        }
    };

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let body = match upstream.bytes().await {
        Ok(b) => b,
        Err(e) => {
            return ApiError::new(StatusCode::BAD_GATEWAY, "forward", e.to_string()).into_response();
        }
    };

    let mut res = Response::new(Body::from(body));
    *res.status_mut() = status;
    for (name, value) in headers.iter() {
        if !HOP_HEADERS.contains(name) {
            res.headers_mut().append(name, value.clone());
        }
    }
    tracing::debug!(target: "minihub::gateway", method = %parts.method, url = %url, status = status.as_u16(), "forwarded");
    res
}

/// GET /api/host/mounts
pub(crate) async fn mounts(State(state): State<AppState>) -> Json<MountSnapshot> {
    Json(state.mounts.read().await.clone())
}

/// POST /api/host/reload
pub(crate) async fn reload(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mounted = state
        .try_refresh_mounts("reload request")
        .await
        .map_err(|e| ApiError::hub("reload", e))?;
    Ok(Json(serde_json::json!({ "mounted": mounted })))
}
