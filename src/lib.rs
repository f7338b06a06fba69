pub mod api;
pub mod appointment; // Booking + lifecycle
pub mod config;
pub mod core_state; // Transport-agnostic state
pub mod dashboard;
pub mod db;
pub mod directory; // Doctors + patients
pub mod identity;
pub mod models;
pub mod vitals;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;
use crate::core_state::CoreState;

/// Start the service and block until Ctrl-C.
pub async fn run() -> Result<(), String> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Carebook starting v{}", config::APP_VERSION);

    let cfg = ServiceConfig::from_env().map_err(|e| e.to_string())?;

    if let Some(dir) = cfg.db_path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Cannot create data directory {}: {e}", dir.display()))?;
    }

    let admin_token = match cfg.admin_token.clone() {
        Some(token) => token,
        None => {
            let token = identity::generate_token();
            tracing::warn!(
                admin_token = %token,
                "CAREBOOK_ADMIN_TOKEN not set; generated a one-off admin token for this run"
            );
            token
        }
    };

    let core = Arc::new(CoreState::new(cfg.db_path.clone(), cfg.policy).with_admin_token(&admin_token));

    // Run migrations once before accepting traffic
    core.open_db().map_err(|e| e.to_string())?;
    tracing::info!(db = %cfg.db_path.display(), "Database ready");

    let mut server = api::start_api_server_on(core.clone(), cfg.addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Cannot listen for shutdown signal: {e}"))?;

    server.shutdown();
    if let Err(e) = core.flush_audit() {
        tracing::warn!("Failed to flush audit log on shutdown: {e}");
    }
    tracing::info!("Carebook stopped");
    Ok(())
}
