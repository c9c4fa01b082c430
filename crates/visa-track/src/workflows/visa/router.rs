use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{DocumentStep, EmployeeId, ReviewDecision};
use super::repository::{RepositoryError, ReviewNotifier, VisaRecordRepository};
use super::service::{DocumentUpload, ValidationError, VisaDocumentService, VisaServiceError};

/// Router builder exposing the employee upload surface, the HR review
/// surface, and the status/roster queries.
pub fn visa_router<R, N>(service: Arc<VisaDocumentService<R, N>>) -> Router
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    Router::new()
        .route("/api/v1/visa", get(roster_handler::<R, N>))
        .route("/api/v1/visa/:employee_id", get(status_handler::<R, N>))
        .route(
            "/api/v1/visa/:employee_id/steps/:step/documents",
            post(upload_handler::<R, N>),
        )
        .route(
            "/api/v1/visa/:employee_id/steps/:step/review",
            post(review_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decision: ReviewDecision,
    #[serde(default)]
    pub(crate) feedback: Option<String>,
}

pub(crate) async fn upload_handler<R, N>(
    State(service): State<Arc<VisaDocumentService<R, N>>>,
    Path((employee_id, step)): Path<(String, String)>,
    axum::Json(upload): axum::Json<DocumentUpload>,
) -> Response
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    let Some(step) = DocumentStep::parse(&step) else {
        return validation_response(ValidationError::UnknownStep(step));
    };

    match service.upload(EmployeeId(employee_id), step, upload) {
        Ok(view) => (StatusCode::ACCEPTED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn review_handler<R, N>(
    State(service): State<Arc<VisaDocumentService<R, N>>>,
    Path((employee_id, step)): Path<(String, String)>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    let Some(step) = DocumentStep::parse(&step) else {
        return validation_response(ValidationError::UnknownStep(step));
    };

    match service.review(
        EmployeeId(employee_id),
        step,
        request.decision,
        request.feedback,
    ) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<VisaDocumentService<R, N>>>,
    Path(employee_id): Path<String>,
) -> Response
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    match service.status(&EmployeeId(employee_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn roster_handler<R, N>(
    State(service): State<Arc<VisaDocumentService<R, N>>>,
) -> Response
where
    R: VisaRecordRepository + 'static,
    N: ReviewNotifier + 'static,
{
    match service.roster() {
        Ok(roster) => (StatusCode::OK, axum::Json(roster)).into_response(),
        Err(error) => error_response(error),
    }
}

fn validation_response(error: ValidationError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}

/// Rule violations surface with their human-readable reason; infrastructure
/// faults stay opaque.
fn error_response(error: VisaServiceError) -> Response {
    let status = match &error {
        VisaServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        VisaServiceError::Upload(_) | VisaServiceError::Review(_) => StatusCode::CONFLICT,
        VisaServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VisaServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::StaleStatus { .. },
        ) => StatusCode::CONFLICT,
        VisaServiceError::Repository(RepositoryError::Unavailable(_))
        | VisaServiceError::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
