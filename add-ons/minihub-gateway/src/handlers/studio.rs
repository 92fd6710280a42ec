//! Generation studio endpoints: AI-assisted create and edit with review before commit.

use super::{ApiError, ApiJson};
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use minihub_core::{BundleFiles, CreateOutcome, GeneratedBundle, GenerationRequest, ModelInfo, Provider};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StudioCreateRequest {
    pub app_name: String,
    pub user_request: String,
    pub provider: Provider,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StudioEditRequest {
    pub app_slug: String,
    pub user_request: String,
    pub provider: Provider,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StudioMountRequest {
    pub app_name: String,
    pub files: BundleFiles,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct StudioSaveRequest {
    pub app_slug: String,
    pub files: BundleFiles,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ModelsQuery {
    pub provider: Provider,
}

/// Generated files for review. `missing` names the files the model did not return.
#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub slug: String,
    pub files: BundleFiles,
    pub complete: bool,
    pub missing: Vec<&'static str>,
}

impl From<GeneratedBundle> for PreviewResponse {
    fn from(generated: GeneratedBundle) -> Self {
        let complete = generated.parsed.is_complete();
        let missing = generated.parsed.missing().into_iter().map(|k| k.file_name()).collect();
        Self {
            slug: generated.slug,
            files: generated.parsed.into_files(),
            complete,
            missing,
        }
    }
}

/// POST /api/gen-studio/create
pub(crate) async fn generate_create(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StudioCreateRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let generated = state
        .hub
        .generate_create(
            &req.app_name,
            GenerationRequest {
                user_request: &req.user_request,
                provider: req.provider,
                model: req.model.as_deref(),
            },
        )
        .await
        .map_err(|e| ApiError::hub("generate", e))?;
    Ok(Json(generated.into()))
}

/// POST /api/gen-studio/mount
pub(crate) async fn mount_generated(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StudioMountRequest>,
) -> Result<(StatusCode, Json<CreateOutcome>), ApiError> {
    let result = state.hub.mount_generated(&req.app_name, req.files).await;
    state.refresh_mounts("mount").await;
    let outcome = result.map_err(|e| ApiError::hub("mount", e))?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/gen-studio/edit
pub(crate) async fn generate_edit(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StudioEditRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let generated = state
        .hub
        .generate_edit(
            &req.app_slug,
            GenerationRequest {
                user_request: &req.user_request,
                provider: req.provider,
                model: req.model.as_deref(),
            },
        )
        .await
        .map_err(|e| ApiError::hub("edit", e).with_slug(&req.app_slug))?;
    Ok(Json(generated.into()))
}

/// PUT /api/gen-studio/save
pub(crate) async fn save_edit(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StudioSaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .hub
        .save(&req.app_slug, &req.files)
        .await
        .map_err(|e| ApiError::hub("save", e).with_slug(&req.app_slug))?;
    Ok(Json(json!({ "message": message })))
}

/// GET /api/gen-studio/models?provider=local|gemini
pub(crate) async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<Vec<ModelInfo>>, ApiError> {
    state
        .hub
        .list_models(query.provider)
        .await
        .map(Json)
        .map_err(|e| ApiError::hub("models", e))
}
