//! Depth stream watcher.
//!
//! Owns the connection lifecycle for one pair's depth stream: connect,
//! pump frames, and reconnect with exponential backoff when the transport
//! drops. The subscription state machine itself never retries; a closed
//! subscription is terminal, so every reconnect opens a fresh one.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::ConnectorConfig;
use crate::connectors::{OutputMode, PoloniexWebSocket, SubscribeError, Subscription};
use crate::events::StreamEvent;

/// Reconnect policy for the watcher.
#[derive(Debug, Clone)]
pub struct DepthWatcherConfig {
    /// Maximum consecutive failed connection attempts before giving up.
    pub max_reconnect_attempts: u32,
    /// First backoff delay; doubles per failed attempt.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for DepthWatcherConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 100,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// Keeps one pair's depth stream alive and feeds its events to a consumer
/// channel.
pub struct DepthWatcher {
    config: ConnectorConfig,
    watcher_config: DepthWatcherConfig,
    stream: String,
    symbol: String,
    mode: OutputMode,
    event_tx: mpsc::Sender<StreamEvent>,
}

impl DepthWatcher {
    pub fn new(
        config: ConnectorConfig,
        stream: &str,
        symbol: &str,
        mode: OutputMode,
        event_tx: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            config,
            watcher_config: DepthWatcherConfig::default(),
            stream: stream.to_string(),
            symbol: symbol.to_string(),
            mode,
            event_tx,
        }
    }

    pub fn with_config(mut self, watcher_config: DepthWatcherConfig) -> Self {
        self.watcher_config = watcher_config;
        self
    }

    /// Runs the watcher until the reconnect budget is exhausted or the
    /// requested stream turns out to be invalid.
    ///
    /// Stream validation happens before the first connection attempt, so
    /// an unsupported stream name fails without any network activity.
    pub async fn run(self) -> Result<(), SubscribeError> {
        info!(stream = %self.stream, symbol = %self.symbol, "depth watcher starting");

        let mut backoff = self.watcher_config.initial_backoff;
        let mut attempts: u32 = 0;

        loop {
            // A subscription never outlives its connection; build a fresh
            // one per attempt. Validation errors are fatal to the call.
            let subscription =
                Subscription::open(&self.config, &self.stream, &self.symbol, self.mode)?;
            let mut ws = PoloniexWebSocket::new(&self.config, subscription, self.event_tx.clone());

            match ws.connect().await {
                Ok(()) => {
                    attempts = 0;
                    backoff = self.watcher_config.initial_backoff;

                    let _ = self
                        .event_tx
                        .send(StreamEvent::Connected {
                            timestamp: Utc::now(),
                        })
                        .await;

                    let reason = match ws.run_until_disconnect().await {
                        Ok(()) => {
                            // Consumer hung up; we are done.
                            info!(symbol = %self.symbol, "depth watcher stopping");
                            return Ok(());
                        }
                        Err(e) => e.to_string(),
                    };

                    warn!(symbol = %self.symbol, %reason, "stream disconnected");
                    let _ = self
                        .event_tx
                        .send(StreamEvent::Disconnected {
                            reason,
                            timestamp: Utc::now(),
                        })
                        .await;
                }
                Err(e) => {
                    warn!(symbol = %self.symbol, error = %e, "connection attempt failed");
                }
            }

            attempts += 1;
            if attempts > self.watcher_config.max_reconnect_attempts {
                error!(
                    symbol = %self.symbol,
                    attempts,
                    "reconnect budget exhausted, giving up"
                );
                return Ok(());
            }

            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, self.watcher_config.max_backoff);
        }
    }
}

impl std::fmt::Debug for DepthWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthWatcher")
            .field("stream", &self.stream)
            .field("symbol", &self.symbol)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_policy() {
        let config = DepthWatcherConfig::default();
        assert_eq!(config.max_reconnect_attempts, 100);
        assert_eq!(config.initial_backoff.as_secs(), 1);
        assert_eq!(config.max_backoff.as_secs(), 60);
    }

    #[tokio::test]
    async fn unsupported_stream_fails_before_connecting() {
        let (tx, mut rx) = mpsc::channel(8);
        let watcher = DepthWatcher::new(
            ConnectorConfig::default(),
            "unknown-stream",
            "BTC_NXT",
            OutputMode::Canonical,
            tx,
        );
        let err = watcher.run().await.unwrap_err();
        assert!(matches!(err, SubscribeError::UnsupportedStream(_)));
        // No Connected (or any other) event was ever emitted.
        assert!(rx.try_recv().is_err());
    }
}
