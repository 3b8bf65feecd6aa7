use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use axum::Json;
use learn_to_work::workflows::registration::{
    registration_router, DocumentSlot, RateLimitPolicy, RegistrationService, SessionStorage,
    MAX_UPLOAD_BYTES, TOTAL_STEPS,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Public constraints the form needs before the first keystroke.
#[derive(Debug, Serialize)]
pub(crate) struct RegistrationPolicyView {
    pub(crate) total_steps: u8,
    pub(crate) max_upload_bytes: u64,
    pub(crate) accepted_extensions: BTreeMap<&'static str, Vec<&'static str>>,
    pub(crate) max_submit_attempts: u32,
    pub(crate) attempt_window_seconds: i64,
    pub(crate) block_seconds: i64,
}

impl RegistrationPolicyView {
    pub(crate) fn new(policy: &RateLimitPolicy) -> Self {
        let accepted_extensions = DocumentSlot::ALL
            .iter()
            .map(|slot| (slot.field().name(), slot.accepted_extensions().to_vec()))
            .collect();

        Self {
            total_steps: TOTAL_STEPS,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            accepted_extensions,
            max_submit_attempts: policy.max_attempts,
            attempt_window_seconds: policy.window.num_seconds(),
            block_seconds: policy.block_duration.num_seconds(),
        }
    }
}

pub(crate) fn with_registration_routes<S>(service: Arc<RegistrationService<S>>) -> axum::Router
where
    S: SessionStorage + Default + 'static,
{
    let policy = Arc::new(RegistrationPolicyView::new(service.limiter().policy()));

    registration_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/registration/policy",
            axum::routing::get(move || policy_endpoint(policy.clone())),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn policy_endpoint(policy: Arc<RegistrationPolicyView>) -> Response {
    (StatusCode::OK, Json(policy.as_ref())).into_response()
}
