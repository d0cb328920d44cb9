use authz_service::{
    build_router,
    config::AuthzConfig,
    db,
    service_policy_bindings,
    services::{AuthzEngine, Database, EngineSettings, PrincipalStore, TokenVerifier},
    AppState,
};
use platform_core::error::AppError;
use platform_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthzConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting authorization service"
    );

    let pool = db::create_pool(&config.database).await?;
    let store: Arc<dyn PrincipalStore> = Arc::new(Database::new(pool));
    tracing::info!("Principal store initialized");

    let verifier = TokenVerifier::from_config(&config.jwt)?;
    tracing::info!("Token verifier initialized");

    let engine = AuthzEngine::new(
        verifier,
        store.clone(),
        EngineSettings {
            header_name: config.authz.header_name.clone(),
            scheme: config.authz.scheme.clone(),
            admin_role: config.authz.admin_role.clone(),
        },
    );

    // Misconfigured policies are a startup failure, never a request-time one.
    let bindings = service_policy_bindings(&config.authz.admin_role)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    let state = AppState {
        config: config.clone(),
        engine,
        store,
        bindings: Arc::new(bindings),
    };

    let app = build_router(state);

    let host: std::net::IpAddr = config
        .common
        .host
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid APP__HOST: {}", e)))?;
    let addr = SocketAddr::new(host, config.common.port);
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
