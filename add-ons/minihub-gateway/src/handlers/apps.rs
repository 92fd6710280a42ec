//! App builder and app manager endpoints: direct create, list, read, save, delete, context.

use super::{ApiError, ApiJson};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use minihub_core::{BundleFiles, CreateOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CreateAppRequest {
    pub app_name: String,
    pub files: BundleFiles,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SaveAppRequest {
    pub files: BundleFiles,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteResponse {
    pub message: String,
    pub routes_removed: bool,
}

/// POST /api/appbuilder/create
pub(crate) async fn create_app(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateAppRequest>,
) -> Result<(StatusCode, Json<CreateOutcome>), ApiError> {
    let result = state.hub.create(&req.app_name, req.files).await;
    // Files may have landed even when registration failed.
    state.refresh_mounts("create").await;
    let outcome = result.map_err(|e| ApiError::hub("create", e))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/appmanager/apps
pub(crate) async fn list_apps(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let mut apps = state.hub.list().await.map_err(|e| ApiError::hub("list", e))?;
    apps.sort();
    Ok(Json(apps))
}

/// GET /api/appmanager/app/:slug
pub(crate) async fn get_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BundleFiles>, ApiError> {
    state
        .hub
        .read(&slug)
        .await
        .map(Json)
        .map_err(|e| ApiError::hub("read", e).with_slug(&slug))
}

/// PUT /api/appmanager/app/:slug
pub(crate) async fn save_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    ApiJson(req): ApiJson<SaveAppRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .hub
        .save(&slug, &req.files)
        .await
        .map_err(|e| ApiError::hub("save", e).with_slug(&slug))?;
    Ok(Json(json!({ "message": message })))
}

/// DELETE /api/appmanager/app/:slug
pub(crate) async fn delete_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let result = state.hub.delete(&slug).await;
    state.refresh_mounts("delete").await;
    let outcome = result.map_err(|e| ApiError::hub("delete", e).with_slug(&slug))?;
    Ok(Json(DeleteResponse {
        message: outcome.message,
        routes_removed: outcome.routes_removed,
    }))
}

/// POST /api/appmanager/app/:slug/context
pub(crate) async fn build_context(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .hub
        .build_context(&slug)
        .await
        .map_err(|e| ApiError::hub("context", e).with_slug(&slug))?;
    tracing::info!(target: "minihub::gateway", slug = %outcome.slug, path = %outcome.path.display(), "context document written");
    Ok(Json(json!({
        "message": format!("Context file for '{}' generated successfully.", outcome.slug),
        "context": outcome.context,
    })))
}
