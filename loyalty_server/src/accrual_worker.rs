use accrual_tools::AccrualApi;
use log::*;
use loyalty_engine::{AccrualAgent, AgentConfig, SqliteDatabase};

use crate::errors::ServerError;

pub type LedgerAgent = AccrualAgent<SqliteDatabase, AccrualApi>;

/// Starts the order reconciliation agent. Do not forget to `stop` the returned agent, so that in-flight work is allowed
/// to finish before the process exits.
pub fn start_accrual_worker(db: SqliteDatabase, api: AccrualApi, config: AgentConfig) -> Result<LedgerAgent, ServerError> {
    let workers = config.workers;
    let interval = config.dispatch_interval;
    let mut agent = AccrualAgent::new(db, api, config);
    agent.start().map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🧾️ Accrual worker started with {workers} workers, checking for orders every {}s", interval.as_secs());
    Ok(agent)
}
