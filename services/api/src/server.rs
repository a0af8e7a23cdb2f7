use crate::cli::DeployArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use civic_core::city::CityProfile;
use civic_core::config::AppConfig;
use civic_core::engagement::alerts::LogDispatcher;
use civic_core::error::AppError;
use civic_core::gateway::{gateway_router, CivicServices};
use civic_core::store::Database;
use civic_core::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: DeployArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let profile = CityProfile::load(&config.storage.data_dir)?;
    profile.ensure_deployable()?;

    let database = Database::connect(&config.storage.database_url()).await?;
    let services = CivicServices::new(database, LogDispatcher);
    if config.auth.staff_token.is_none() {
        warn!("APP_STAFF_TOKEN is not set; staff-only routes will reject every caller");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let gateway = gateway_router(&services, &profile.modules, config.auth.staff_token.clone());
    let app = with_operational_routes(gateway)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        city = %profile.city,
        modules = ?profile.module_labels(),
        "citizen gateway ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
