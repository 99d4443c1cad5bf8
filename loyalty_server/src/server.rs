use std::future::Future;

use accrual_tools::AccrualApi;
use log::*;
use loyalty_engine::SqliteDatabase;

use crate::{accrual_worker::start_accrual_worker, config::ServerConfig, errors::ServerError};

/// Runs the loyalty server until Ctrl-C is pressed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    run_server_until(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("🚀️ Could not listen for the shutdown signal. Shutting down now. {e}");
        }
    })
    .await
}

/// Runs the loyalty server until `shutdown` resolves, or the reconciliation agent fails.
///
/// The reconciliation agent is given `config.shutdown_timeout` to finish its in-flight work. Once the database pool
/// has been opened, it is closed again in every case.
pub async fn run_server_until<F>(config: ServerConfig, shutdown: F) -> Result<(), ServerError>
where F: Future<Output = ()> {
    config.validate()?;
    let db = SqliteDatabase::new_with_url(config.database_url.reveal(), config.database_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(format!("Could not connect to the ledger database. {e}")))?;
    let result = serve(&config, db.clone(), shutdown).await;
    db.close().await;
    result
}

async fn serve<F>(config: &ServerConfig, db: SqliteDatabase, shutdown: F) -> Result<(), ServerError>
where F: Future<Output = ()> {
    if config.run_migrations {
        db.migrate()
            .await
            .map_err(|e| ServerError::InitializeError(format!("Could not migrate the ledger database. {e}")))?;
    }
    let api = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mut agent = start_accrual_worker(db, api, config.agent.clone())?;
    info!("🚀️ Loyalty server is running");

    let agent_failed = tokio::select! {
        _ = shutdown => false,
        _ = agent.failed() => true,
    };
    if agent_failed {
        error!("🚀️ The accrual agent has failed. Shutting down");
    } else {
        info!("🚀️ Shutting down");
    }
    if tokio::time::timeout(config.shutdown_timeout, agent.stop()).await.is_err() {
        return Err(ServerError::ShutdownTimeout(config.shutdown_timeout));
    }
    if agent_failed {
        return Err(ServerError::AgentFailed);
    }
    Ok(())
}
