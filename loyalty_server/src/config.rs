use std::{env, fmt::Display, str::FromStr, time::Duration};

use accrual_tools::{AccrualConfig, DEFAULT_ACCRUAL_TIMEOUT};
use log::*;
use loyalty_engine::{
    accrual_agent::{DEFAULT_DISPATCH_INTERVAL, DEFAULT_WORKERS},
    AgentConfig,
};
use lp_common::{parse_boolean_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// The SQLite URL of the ledger. May contain credentials, so it is never logged.
    pub database_url: Secret<String>,
    pub database_max_connections: u32,
    /// Where and how to reach the accrual service.
    pub accrual: AccrualConfig,
    /// Worker pool size and dispatch interval of the reconciliation agent.
    pub agent: AgentConfig,
    /// How long the reconciliation agent is given to wind down on shutdown.
    pub shutdown_timeout: Duration,
    /// If true, the embedded database migrations are run at startup.
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: Secret::default(),
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            accrual: AccrualConfig::default(),
            agent: AgentConfig::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(database_url: &str, accrual_address: &str) -> Self {
        Self {
            database_url: Secret::new(database_url.to_string()),
            accrual: AccrualConfig::new(accrual_address),
            ..Default::default()
        }
    }

    pub fn from_env_or_default() -> Self {
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ LPS_DATABASE_URL is not set. Please set it to the URL for the ledger database.");
            String::default()
        });
        let database_max_connections =
            env_or_default("LPS_DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS);
        let accrual = AccrualConfig::new_from_env_or_default();
        let workers = env_or_default("LPS_ACCRUAL_WORKERS", DEFAULT_WORKERS);
        let dispatch_interval = env_seconds_or_default("LPS_DISPATCH_INTERVAL", DEFAULT_DISPATCH_INTERVAL);
        let shutdown_timeout = env_seconds_or_default("LPS_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT);
        let run_migrations = parse_boolean_flag(env::var("LPS_RUN_MIGRATIONS").ok(), true);
        Self {
            database_url: Secret::new(database_url),
            database_max_connections,
            accrual,
            agent: AgentConfig { workers, dispatch_interval },
            shutdown_timeout,
            run_migrations,
        }
    }

    /// Checks the whole configuration and reports every problem at once.
    pub fn validate(&self) -> Result<(), ServerError> {
        let mut problems = Vec::new();
        if self.database_url.reveal().trim().is_empty() {
            problems.push("LPS_DATABASE_URL is not set".to_string());
        }
        if self.accrual.base_url.trim().is_empty() {
            problems.push("LPS_ACCRUAL_SYSTEM_ADDRESS is not set".to_string());
        } else if let Err(e) = self.accrual.validate() {
            problems.push(format!("LPS_ACCRUAL_SYSTEM_ADDRESS is invalid. {e}"));
        }
        if self.database_max_connections == 0 {
            problems.push("LPS_DATABASE_MAX_CONNECTIONS must be at least 1".to_string());
        }
        if self.agent.workers == 0 {
            problems.push("LPS_ACCRUAL_WORKERS must be at least 1".to_string());
        }
        if self.agent.dispatch_interval.is_zero() {
            problems.push("LPS_DISPATCH_INTERVAL must be at least 1 second".to_string());
        }
        if self.accrual.timeout.is_zero() {
            problems.push(format!("LPS_ACCRUAL_TIMEOUT must be at least 1 second (default {DEFAULT_ACCRUAL_TIMEOUT:?})"));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServerError::ConfigurationError(problems.join("; ")))
        }
    }
}

fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    env::var(name)
        .map_err(|_| info!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.trim().parse::<T>().map_err(|e| {
                warn!("🪛️ Invalid configuration value for {name}: '{s}'. {e}. Using the default value of {default}.")
            })
        })
        .ok()
        .unwrap_or(default)
}

fn env_seconds_or_default(name: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or_default(name, default.as_secs()))
}
