use std::time::Duration;

use log::*;
use reqwest::Url;

use crate::AccrualApiError;

pub const DEFAULT_ACCRUAL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// The base URL of the accrual service, e.g. `http://localhost:8081`. Request paths are appended to it.
    pub base_url: String,
    /// Upper bound on the duration of a single request, including connecting and reading the body.
    pub timeout: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self { base_url: String::default(), timeout: DEFAULT_ACCRUAL_TIMEOUT }
    }
}

impl AccrualConfig {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.to_string(), ..Default::default() }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("LPS_ACCRUAL_SYSTEM_ADDRESS").unwrap_or_else(|_| {
            error!("🪛️ LPS_ACCRUAL_SYSTEM_ADDRESS is not set. Please set it to the base URL of the accrual service.");
            String::default()
        });
        let timeout = std::env::var("LPS_ACCRUAL_TIMEOUT")
            .map_err(|_| {
                info!(
                    "🪛️ LPS_ACCRUAL_TIMEOUT is not set. Using the default value of {}s.",
                    DEFAULT_ACCRUAL_TIMEOUT.as_secs()
                )
            })
            .and_then(|s| {
                s.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| warn!("🪛️ Invalid configuration value for LPS_ACCRUAL_TIMEOUT. {e}"))
            })
            .ok()
            .unwrap_or(DEFAULT_ACCRUAL_TIMEOUT);
        Self { base_url, timeout }
    }

    /// The base URL must be an absolute `http` or `https` URL.
    pub fn validate(&self) -> Result<(), AccrualApiError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| AccrualApiError::Initialization(format!("'{}' is not a valid URL. {e}", self.base_url)))?;
        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(()),
            _ => Err(AccrualApiError::Initialization(format!(
                "'{}' is not an http(s) address of the accrual service",
                self.base_url
            ))),
        }
    }
}
