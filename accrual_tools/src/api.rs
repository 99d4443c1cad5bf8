use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};

use crate::{config::AccrualConfig, AccrualApiError, AccrualResponse};

#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Asks the accrual service for the current state of the order with the given number.
    ///
    /// * `200 OK` responses are decoded into an [`AccrualResponse`].
    /// * `204 No Content` means the accrual service has never heard of the order. This is reported as an `INVALID`
    ///   response, since the order will never earn an accrual.
    /// * `429 Too Many Requests` is reported as [`AccrualApiError::TooManyRequests`], carrying the cooldown from the
    ///   `Retry-After` header.
    /// * Anything else is an error.
    pub async fn fetch_order_status(&self, order_number: &str) -> Result<AccrualResponse, AccrualApiError> {
        let url = self.url(&format!("/api/orders/{order_number}"));
        trace!("🧾️ Sending accrual query: {url}");
        let response =
            self.client.get(url).send().await.map_err(|e| AccrualApiError::RestResponseError(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                trace!("🧾️ Accrual query for order {order_number} successful");
                response.json::<AccrualResponse>().await.map_err(|e| AccrualApiError::JsonError(e.to_string()))
            },
            StatusCode::NO_CONTENT => {
                info!("🧾️ Order {order_number} is not registered with the accrual service");
                Ok(AccrualResponse::unregistered(order_number))
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = retry_after(&response)?;
                debug!("🧾️ Accrual service is throttling requests. Retry after {}s", retry_after.as_secs());
                Err(AccrualApiError::TooManyRequests { retry_after })
            },
            status => {
                let status = status.as_u16();
                let message =
                    response.text().await.unwrap_or_else(|e| format!("failed to read response body. {e}"));
                Err(AccrualApiError::QueryError { status, message })
            },
        }
    }
}

/// The accrual service sends the cooldown as a whole number of seconds.
fn retry_after(response: &Response) -> Result<Duration, AccrualApiError> {
    let value = response
        .headers()
        .get(RETRY_AFTER)
        .ok_or_else(|| AccrualApiError::InvalidRetryAfter("header is missing".to_string()))?;
    let value = value.to_str().map_err(|e| AccrualApiError::InvalidRetryAfter(e.to_string()))?;
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AccrualApiError::InvalidRetryAfter(format!("{value}: {e}")))
}
