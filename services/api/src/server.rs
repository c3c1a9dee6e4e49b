use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use invite_portal::backend::{HttpBackend, InvitationBackend};
use invite_portal::clock::{Clock, SystemClock};
use invite_portal::config::AppConfig;
use invite_portal::error::AppError;
use invite_portal::telemetry;
use invite_portal::workflows::admin::AdminService;
use invite_portal::workflows::intake::{InMemorySessionStore, IntakeService, SessionStore};
use invite_portal::workflows::window::WindowGate;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let window_config = backend.fetch_config().await;
    let gate = Arc::new(WindowGate::spawn(
        window_config,
        Arc::clone(&clock),
        config.intake.gate_interval,
    ));
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

    let intake_service = Arc::new(IntakeService::new(
        Arc::clone(&backend),
        store,
        Arc::clone(&gate),
        Arc::clone(&clock),
        config.intake.clone(),
    ));
    let admin_service = Arc::new(
        AdminService::new(backend, Arc::clone(&gate), clock)
            .with_session_ttl(config.admin.session_ttl),
    );

    let app = with_portal_routes(intake_service, admin_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        score_entry_open = gate.is_open(),
        "invitation portal ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
