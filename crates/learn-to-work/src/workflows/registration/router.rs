use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use serde_json::json;

use super::domain::{DocumentSlot, FieldEdit, UploadedFile, WizardView};
use super::service::{RegistrationService, RegistrationServiceError, SessionId};
use super::store::SessionStorage;
use super::wizard::{whole_seconds, WizardError};

type SharedService<S> = Arc<RegistrationService<S>>;

/// Router exposing the registration wizard, one session per browser tab.
pub fn registration_router<S>(service: SharedService<S>) -> Router
where
    S: SessionStorage + Default + 'static,
{
    Router::new()
        .route(
            "/api/v1/registration/sessions",
            post(open_session_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id",
            get(view_handler::<S>).delete(close_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/fields",
            patch(field_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/documents/:slot",
            put(document_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/next",
            post(next_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/previous",
            post(previous_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/submit",
            post(submit_handler::<S>),
        )
        .route(
            "/api/v1/registration/sessions/:session_id/reload",
            post(reload_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn open_session_handler<S>(State(service): State<SharedService<S>>) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let (session_id, view) = service.open_session();
    let payload = json!({
        "session_id": session_id,
        "view": view,
    });
    (StatusCode::CREATED, axum::Json(payload)).into_response()
}

pub(crate) async fn view_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    view_response(&service, &id, service.view(&id))
}

pub(crate) async fn close_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    if service.close(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(&service, &id, RegistrationServiceError::UnknownSession(id.clone()))
    }
}

pub(crate) async fn field_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
    axum::Json(edit): axum::Json<FieldEdit>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    view_response(&service, &id, service.apply(&id, edit))
}

pub(crate) async fn document_handler<S>(
    State(service): State<SharedService<S>>,
    Path((session_id, slot)): Path<(String, String)>,
    axum::Json(file): axum::Json<Option<UploadedFile>>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    let Some(slot) = DocumentSlot::from_field_name(&slot) else {
        let payload = json!({
            "error": format!("unknown document slot `{slot}`"),
        });
        return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
    };
    view_response(&service, &id, service.select_document(&id, slot, file))
}

pub(crate) async fn next_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    view_response(&service, &id, service.next(&id))
}

pub(crate) async fn previous_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    view_response(&service, &id, service.previous(&id))
}

pub(crate) async fn submit_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    match service.submit(&id) {
        Ok(application) => {
            let payload = json!({
                "application": application,
                "view": service.view(&id).ok(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(&service, &id, error),
    }
}

pub(crate) async fn reload_handler<S>(
    State(service): State<SharedService<S>>,
    Path(session_id): Path<String>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let id = SessionId(session_id);
    view_response(&service, &id, service.reload(&id))
}

fn view_response<S>(
    service: &RegistrationService<S>,
    id: &SessionId,
    result: Result<WizardView, RegistrationServiceError>,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(service, id, error),
    }
}

fn error_response<S>(
    service: &RegistrationService<S>,
    id: &SessionId,
    error: RegistrationServiceError,
) -> Response
where
    S: SessionStorage + Default + 'static,
{
    let status = status_for(&error);
    let wizard_error = match error {
        RegistrationServiceError::UnknownSession(_) => {
            let payload = json!({
                "error": error.to_string(),
            });
            return (status, axum::Json(payload)).into_response();
        }
        RegistrationServiceError::Wizard(wizard_error) => wizard_error,
    };

    let mut payload = json!({
        "error": wizard_error.to_string(),
        "view": service.view(id).ok(),
    });
    match wizard_error {
        WizardError::Validation { errors, .. } => {
            payload["errors"] = json!(errors);
            (status, axum::Json(payload)).into_response()
        }
        WizardError::RateLimited { remaining } => {
            let retry_after = whole_seconds(&remaining);
            payload["retry_after_seconds"] = json!(retry_after);
            (
                status,
                [(header::RETRY_AFTER, retry_after.to_string())],
                axum::Json(payload),
            )
                .into_response()
        }
        _ => (status, axum::Json(payload)).into_response(),
    }
}

/// Status code for a registration failure, shared by the router and `AppError`.
pub(crate) fn status_for(error: &RegistrationServiceError) -> StatusCode {
    match error {
        RegistrationServiceError::UnknownSession(_) => StatusCode::NOT_FOUND,
        RegistrationServiceError::Wizard(wizard_error) => match wizard_error {
            WizardError::Validation { .. }
            | WizardError::Ineligible
            | WizardError::FileRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            WizardError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            WizardError::AtFirstStep
            | WizardError::AtFinalStep
            | WizardError::NotAtDeclaration
            | WizardError::AlreadySubmitted => StatusCode::CONFLICT,
        },
    }
}
