//! Connector configuration.
//!
//! Everything the connector needs to know about the exchange lives in one
//! `ConnectorConfig` value built at startup and passed by reference to the
//! components that consult it. Nothing in this crate reads configuration
//! from ambient global state after construction.

/// Default public REST endpoint.
const DEFAULT_REST_URL: &str = "https://poloniex.com/public";

/// Default streaming endpoint.
const DEFAULT_WS_URL: &str = "wss://api2.poloniex.com";

/// Candle aggregation periods the exchange accepts, in seconds.
const DEFAULT_VALID_PERIODS: [u32; 6] = [300, 900, 1800, 7200, 14400, 86400];

/// Read-only configuration for one exchange connector.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Base URL for REST queries.
    pub rest_url: String,
    /// Base URL for the streaming connection.
    pub ws_url: String,
    /// Streaming channel names the connector knows how to subscribe to.
    pub valid_streams: Vec<String>,
    /// Candle periods accepted by the historical-data queries, in seconds.
    pub valid_periods: Vec<u32>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            valid_streams: vec!["depth".to_string()],
            valid_periods: DEFAULT_VALID_PERIODS.to_vec(),
        }
    }
}

impl ConnectorConfig {
    /// Builds a config from defaults with endpoint overrides taken from
    /// `POLONIEX_REST_URL` / `POLONIEX_WS_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("POLONIEX_REST_URL") {
            config.rest_url = url;
        }
        if let Ok(url) = std::env::var("POLONIEX_WS_URL") {
            config.ws_url = url;
        }
        config
    }

    /// Builds a config with explicit endpoints (useful for tests against
    /// local fixtures).
    pub fn with_endpoints(rest_url: String, ws_url: String) -> Self {
        Self {
            rest_url,
            ws_url,
            ..Self::default()
        }
    }

    /// Returns true if `stream` is a subscribable channel name.
    pub fn is_valid_stream(&self, stream: &str) -> bool {
        self.valid_streams.iter().any(|s| s == stream)
    }

    /// Returns true if `period` is an accepted candle period.
    pub fn is_valid_period(&self, period: u32) -> bool {
        self.valid_periods.contains(&period)
    }
}
