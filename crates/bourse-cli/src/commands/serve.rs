use std::time::Duration;

use bourse_core::DashboardController;
use bourse_warehouse::Warehouse;
use bourse_web::ServerConfig;

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(args: &ServeArgs, warehouse: Warehouse) -> Result<(), CliError> {
    let config = ServerConfig {
        session_ttl: Duration::from_secs(args.session_ttl_secs),
        max_sessions: args.max_sessions.max(1),
        ..ServerConfig::with_bind(args.bind)
    };
    tracing::info!(db_path = %warehouse.db_path().display(), bind = %config.bind, "starting dashboard server");
    bourse_web::serve(config, DashboardController::new(warehouse))
        .await
        .map_err(CliError::Server)
}
