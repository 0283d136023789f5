//! REST query client.
//!
//! Each query method builds a `{"command": <name>, ...}` parameter set,
//! validates its inputs, and forwards the payload unchanged to a
//! `QueryTransport` collaborator that performs the network call. The only
//! logic here is parameter validation and response-level error detection;
//! a response carrying an `error` key is logged and becomes `None` rather
//! than a fault.

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ConnectorConfig;
use crate::utils::{normalize_range, RangeError, TimeInput};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("invalid time range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("period {0}s is not an accepted candle period")]
    InvalidPeriod(u32),
}

/// Transport collaborator that performs the actual network call for a
/// built query payload and returns the decoded response.
#[allow(async_fn_in_trait)]
pub trait QueryTransport {
    async fn get(&self, params: &[(String, String)]) -> Result<Value, ApiError>;
}

/// Production transport: GET against the configured REST base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.rest_url.clone(),
        }
    }
}

impl QueryTransport for HttpTransport {
    async fn get(&self, params: &[(String, String)]) -> Result<Value, ApiError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Which slice of the order book a snapshot query asks for.
#[derive(Debug, Clone)]
pub enum BookScope {
    /// One currency pair, e.g. `BTC_NXT`.
    Pair(String),
    /// Every pair the exchange lists.
    All,
}

/// Query client for the exchange's public REST API.
#[derive(Debug, Clone)]
pub struct PoloniexRestClient<T = HttpTransport> {
    transport: T,
    valid_periods: Vec<u32>,
}

impl PoloniexRestClient<HttpTransport> {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self {
            transport: HttpTransport::new(config),
            valid_periods: config.valid_periods.clone(),
        }
    }
}

impl<T: QueryTransport> PoloniexRestClient<T> {
    /// Builds a client over a custom transport (tests use a recording
    /// double here).
    pub fn with_transport(config: &ConnectorConfig, transport: T) -> Self {
        Self {
            transport,
            valid_periods: config.valid_periods.clone(),
        }
    }

    /// Ticker for every listed pair.
    pub async fn ticker(&self) -> Result<Option<Value>, ApiError> {
        self.send_check(vec![command("returnTicker")]).await
    }

    /// 24-hour volume across the exchange.
    pub async fn day_volume(&self) -> Result<Option<Value>, ApiError> {
        self.send_check(vec![command("return24hVolume")]).await
    }

    /// Order-book snapshot for one pair or all pairs, limited to `depth`
    /// levels per side.
    pub async fn order_book(
        &self,
        scope: BookScope,
        depth: u32,
    ) -> Result<Option<Value>, ApiError> {
        let pair = match scope {
            BookScope::Pair(pair) => pair,
            BookScope::All => "all".to_string(),
        };
        self.send_check(vec![
            command("returnOrderBook"),
            param("currencyPair", pair),
            param("depth", depth.to_string()),
        ])
        .await
    }

    /// Trade history for `pair` over `[start, end]`. The range is
    /// validated and normalized to epoch seconds before anything is sent.
    pub async fn trade_history(
        &self,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
        pair: &str,
    ) -> Result<Option<Value>, ApiError> {
        let range = normalize_range(start, end)?;
        self.send_check(vec![
            command("returnTradeHistory"),
            param("start", range.start.to_string()),
            param("end", range.end.to_string()),
            param("currencyPair", pair.to_string()),
        ])
        .await
    }

    /// Candle data for `pair` over `[start, end]` at `period` seconds per
    /// candle. Both the range and the period are validated before the
    /// request is built.
    pub async fn chart_data(
        &self,
        start: impl Into<TimeInput>,
        end: impl Into<TimeInput>,
        period: u32,
        pair: &str,
    ) -> Result<Option<Value>, ApiError> {
        let range = normalize_range(start, end)?;
        if !self.valid_periods.contains(&period) {
            return Err(ApiError::InvalidPeriod(period));
        }
        self.send_check(vec![
            command("returnChartData"),
            param("start", range.start.to_string()),
            param("end", range.end.to_string()),
            param("period", period.to_string()),
            param("currencyPair", pair.to_string()),
        ])
        .await
    }

    /// Listed currencies and their properties.
    pub async fn currencies(&self) -> Result<Option<Value>, ApiError> {
        self.send_check(vec![command("returnCurrencies")]).await
    }

    /// Open loan orders for one currency.
    pub async fn loan_orders(&self, currency: &str) -> Result<Option<Value>, ApiError> {
        self.send_check(vec![
            command("returnLoanOrders"),
            param("currency", currency.to_string()),
        ])
        .await
    }

    /// Forwards a built payload and screens the response for an explicit
    /// error indicator. Exchange-reported errors become `None`, not
    /// faults.
    async fn send_check(&self, payload: Vec<(String, String)>) -> Result<Option<Value>, ApiError> {
        debug!(?payload, "dispatching query");
        let response = self.transport.get(&payload).await?;
        if let Some(err) = response.get("error") {
            warn!(error = %err, "query rejected by exchange");
            return Ok(None);
        }
        Ok(Some(response))
    }
}

fn command(name: &str) -> (String, String) {
    ("command".to_string(), name.to_string())
}

fn param(key: &str, value: String) -> (String, String) {
    (key.to_string(), value)
}
