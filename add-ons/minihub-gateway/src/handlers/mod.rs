//! HTTP handlers for the builder, manager and studio APIs.
//!
//! Every failure is returned as `{ "error", "step", "slug" }` with a status derived from the
//! core error, and logged with the same fields.

pub(crate) mod apps;
pub(crate) mod studio;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use minihub_core::HubError;
use serde::Serialize;

/// `Json` body whose rejection is reported as a 400 with the structured error body.
/// Absent fields are defaulted by the request types and rejected by the lifecycle instead.
pub(crate) struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::warn!(target: "minihub::gateway", error = %rejection.body_text(), "request body rejected");
                Err(ApiError::new(StatusCode::BAD_REQUEST, "request", rejection.body_text()))
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub step: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    /// Wrap a core error raised while performing `step`.
    pub fn hub(step: &'static str, err: HubError) -> Self {
        let status = status_for(&err);
        let (step, slug) = match &err {
            HubError::PartiallyApplied { slug, step, .. } => (*step, Some(slug.clone())),
            HubError::AlreadyExists(s)
            | HubError::NotFound(s)
            | HubError::Forbidden(s)
            | HubError::AlreadyMounted(s) => (step, Some(s.clone())),
            _ => (step, None),
        };
        if status.is_server_error() {
            tracing::error!(target: "minihub::gateway", step, slug = slug.as_deref().unwrap_or("-"), error = %err, "request failed");
        } else {
            tracing::warn!(target: "minihub::gateway", step, slug = slug.as_deref().unwrap_or("-"), error = %err, "request rejected");
        }
        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                step,
                slug,
            },
        }
    }

    pub fn new(status: StatusCode, step: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                step,
                slug: None,
            },
        }
    }

    /// Attach the slug the request named when the error itself does not carry one.
    pub fn with_slug(mut self, slug: &str) -> Self {
        if self.body.slug.is_none() {
            self.body.slug = Some(slug.to_string());
        }
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub(crate) fn status_for(err: &HubError) -> StatusCode {
    match err {
        HubError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        HubError::AlreadyExists(_) | HubError::AlreadyMounted(_) => StatusCode::CONFLICT,
        HubError::NotFound(_) => StatusCode::NOT_FOUND,
        HubError::Forbidden(_) => StatusCode::FORBIDDEN,
        HubError::UpstreamGeneration(_) => StatusCode::BAD_GATEWAY,
        HubError::MarkerNotFound { .. }
        | HubError::Io { .. }
        | HubError::PartiallyApplied { .. }
        | HubError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
