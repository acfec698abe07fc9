use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::import::{template_csv, IntakeChannel};
use super::service::{ScreeningForm, ScreeningService, ScreeningServiceError};
use super::store::ScreeningStore;

/// Router builder exposing the screening intake, record management and export endpoints.
pub fn screening_router<S>(service: Arc<ScreeningService<S>>) -> Router
where
    S: ScreeningStore + 'static,
{
    Router::new()
        .route("/api/v1/screening/assess", post(assess_handler::<S>))
        .route("/api/v1/screening/records", post(register_handler::<S>))
        .route(
            "/api/v1/screening/records/:user_email",
            get(edit_form_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/screening/barangays/:barangay/records",
            delete(delete_by_barangay_handler::<S>),
        )
        .route("/api/v1/screening/summary", get(summary_handler::<S>))
        .route("/api/v1/screening/import", post(import_handler::<S>))
        .route("/api/v1/screening/template", get(template_handler))
        .route("/api/v1/screening/export", get(export_handler::<S>))
        .with_state(service)
}

/// Unset options fall back to the service's configured import defaults.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImportQuery {
    skip_duplicates: Option<bool>,
    channel: Option<IntakeChannel>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SummaryQuery {
    barangay: Option<String>,
}

pub(crate) async fn assess_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    axum::Json(form): axum::Json<ScreeningForm>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.assess(&form, Local::now().date_naive()) {
        Ok(assessment) => (StatusCode::OK, axum::Json(assessment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn register_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    axum::Json(form): axum::Json<ScreeningForm>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.register(form, Local::now().date_naive()) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Response
where
    S: ScreeningStore + 'static,
{
    let options = service.import_options(
        Local::now().date_naive(),
        query.skip_duplicates,
        query.channel,
    );
    let report = service.import_csv(&body, &options);
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn edit_form_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Path(user_email): Path<String>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.edit_form(&user_email) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Path(user_email): Path<String>,
    axum::Json(form): axum::Json<ScreeningForm>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.update(&user_email, form, Local::now().date_naive()) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Path(user_email): Path<String>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.delete(&user_email) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_by_barangay_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Path(barangay): Path<String>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.delete_by_barangay(&barangay) {
        Ok(deleted) => {
            let payload = json!({
                "barangay": barangay,
                "deleted_count": deleted,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summary_handler<S>(
    State(service): State<Arc<ScreeningService<S>>>,
    Query(query): Query<SummaryQuery>,
) -> Response
where
    S: ScreeningStore + 'static,
{
    let barangay = query.barangay.as_deref().filter(|value| !value.is_empty());
    match service.summary(barangay) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn template_handler() -> Response {
    csv_response(template_csv(), "screening-template.csv")
}

pub(crate) async fn export_handler<S>(State(service): State<Arc<ScreeningService<S>>>) -> Response
where
    S: ScreeningStore + 'static,
{
    match service.export_csv() {
        Ok(text) => csv_response(text, "screenings.csv"),
        Err(error) => error_response(error),
    }
}

fn csv_response(body: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

fn error_response(error: ScreeningServiceError) -> Response {
    match error {
        ScreeningServiceError::Invalid(issues) => {
            let payload = json!({
                "error": "screening form is invalid",
                "issues": issues,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ScreeningServiceError::Duplicate(email) => {
            let payload = json!({
                "error": format!("a screening for {email} already exists"),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        ScreeningServiceError::NotFound(email) => {
            let payload = json!({
                "error": format!("no screening found for {email}"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
