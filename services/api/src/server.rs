use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionStorage};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use learn_to_work::config::AppConfig;
use learn_to_work::error::AppError;
use learn_to_work::telemetry;
use learn_to_work::workflows::registration::{
    Clock, Housekeeping, RateLimiter, RegistrationService, SystemClock,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registration = &config.registration;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(registration.rate_limit, clock.clone()));
    let registration_service = Arc::new(RegistrationService::<InMemorySessionStorage>::new(
        limiter,
        clock,
        registration.draft_ttl,
    ));
    let housekeeping = Housekeeping::spawn(registration_service.clone(), registration.housekeeping);

    let app = with_registration_routes(registration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_attempts = registration.rate_limit.max_attempts,
        "learn to work registration service ready"
    );

    let served = axum::serve(listener, app).await;
    housekeeping.shutdown();
    served?;
    Ok(())
}
