//! Streaming subscription state machine and WebSocket driver.
//!
//! A `Subscription` is the pure half: it validates the requested stream
//! name before anything touches the network, binds the translator for that
//! stream, builds the handshake frame, and tracks the
//! `Idle -> Open -> {Error, Closed}` lifecycle. `PoloniexWebSocket` is the
//! transport half: it owns exactly one connection for exactly one
//! subscription and feeds inbound frames through it.
//!
//! A bad frame never terminates a live subscription; it is logged and
//! dropped. Retry/reconnect policy lives in the watcher layer, not here.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::config::ConnectorConfig;
use crate::events::{
    translate_depth, DepthEvent, StreamContext, StreamEvent, TranslateError,
};

/// Exchange name stamped into every canonical event.
pub const EXCHANGE_NAME: &str = "poloniex";

#[derive(Debug, Error)]
pub enum WebSocketError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("stream {0:?} is not a supported stream")]
    UnsupportedStream(String),

    #[error("stream {0:?} is configured but has no translator bound")]
    MissingTranslator(String),
}

/// Lifecycle of one subscription. `Error` never returns to `Open`;
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Idle,
    Open,
    Error,
    Closed,
}

/// How a subscription surfaces inbound frames, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Frames run through the stream's translator; consumers get
    /// canonical events.
    Canonical,
    /// The decoded frame is forwarded verbatim and translation is skipped.
    Raw,
}

/// Pure translation function bound to a stream type.
type TranslateFn = fn(&serde_json::Value, &StreamContext) -> Result<Vec<DepthEvent>, TranslateError>;

/// Lookup table from stream name to its translator. Adding a stream type
/// means adding an arm here; the state machine itself never changes.
fn translator_for(stream: &str) -> Option<TranslateFn> {
    match stream {
        "depth" => Some(translate_depth),
        _ => None,
    }
}

/// Subscription handshake frame, sent exactly once per opened connection.
#[derive(Debug, Serialize)]
struct SubscribeCommand {
    command: &'static str,
    channel: String,
}

/// One logical subscription to one streaming channel.
pub struct Subscription {
    ctx: StreamContext,
    translate: TranslateFn,
    mode: OutputMode,
    status: SubscriptionStatus,
}

impl Subscription {
    /// Validates the requested stream against the configured set and binds
    /// its translator. Runs no network activity; failures here mean no
    /// connection is ever attempted.
    pub fn open(
        config: &ConnectorConfig,
        stream: &str,
        symbol: &str,
        mode: OutputMode,
    ) -> Result<Self, SubscribeError> {
        if !config.is_valid_stream(stream) {
            return Err(SubscribeError::UnsupportedStream(stream.to_string()));
        }
        // A configured name without a translator is a configuration error,
        // caught at this boundary rather than on the first frame.
        let translate = translator_for(stream)
            .ok_or_else(|| SubscribeError::MissingTranslator(stream.to_string()))?;

        Ok(Self {
            ctx: StreamContext {
                exchange: EXCHANGE_NAME.to_string(),
                stream: stream.to_string(),
                pair: symbol.to_string(),
            },
            translate,
            mode,
            status: SubscriptionStatus::Idle,
        })
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn symbol(&self) -> &str {
        &self.ctx.pair
    }

    pub fn stream(&self) -> &str {
        &self.ctx.stream
    }

    /// Builds the handshake frame as wire JSON.
    pub fn handshake(&self) -> String {
        let command = SubscribeCommand {
            command: "subscribe",
            channel: self.ctx.pair.clone(),
        };
        // A two-field struct of strings cannot fail to serialize.
        serde_json::to_string(&command).unwrap_or_default()
    }

    /// The handshake send succeeded; the subscription is live.
    pub fn mark_open(&mut self) {
        if self.status == SubscriptionStatus::Idle {
            self.status = SubscriptionStatus::Open;
        }
    }

    /// The transport reported an error. The subscription stays enumerable
    /// in the error state and is not closed from here.
    pub fn mark_error(&mut self) {
        if self.status != SubscriptionStatus::Closed {
            self.status = SubscriptionStatus::Error;
        }
    }

    /// The transport reported connection close. Terminal; a new
    /// subscription is required to resume.
    pub fn mark_closed(&mut self) {
        self.status = SubscriptionStatus::Closed;
    }

    /// Handles one inbound text frame.
    ///
    /// Synchronous and non-blocking. A malformed frame returns an error
    /// but leaves the status untouched; the caller logs it and keeps the
    /// subscription alive.
    pub fn handle_frame(&mut self, text: &str) -> Result<Vec<StreamEvent>, TranslateError> {
        let payload: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| TranslateError::MalformedMessage(e.to_string()))?;

        match self.mode {
            OutputMode::Raw => Ok(vec![StreamEvent::Raw {
                payload,
                received_at: Utc::now(),
            }]),
            OutputMode::Canonical => {
                let events = (self.translate)(&payload, &self.ctx)?;
                Ok(events.into_iter().map(StreamEvent::Depth).collect())
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("stream", &self.ctx.stream)
            .field("symbol", &self.ctx.pair)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .finish()
    }
}

/// WebSocket driver owning one connection for one subscription.
pub struct PoloniexWebSocket {
    url: String,
    subscription: Subscription,
    connection: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    event_tx: mpsc::Sender<StreamEvent>,
}

impl PoloniexWebSocket {
    pub fn new(
        config: &ConnectorConfig,
        subscription: Subscription,
        event_tx: mpsc::Sender<StreamEvent>,
    ) -> Self {
        Self {
            url: config.ws_url.clone(),
            subscription,
            connection: None,
            event_tx,
        }
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.subscription.status()
    }

    /// Dials the endpoint and sends the subscription handshake. The
    /// subscription becomes `Open` only after the handshake send succeeds.
    pub async fn connect(&mut self) -> Result<(), WebSocketError> {
        info!(
            stream = self.subscription.stream(),
            symbol = self.subscription.symbol(),
            url = %self.url,
            "connecting"
        );

        let (mut ws_stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| WebSocketError::ConnectionFailed(e.to_string()))?;

        let handshake = self.subscription.handshake();
        debug!(frame = %handshake, "sending subscribe handshake");
        ws_stream
            .send(Message::Text(handshake))
            .await
            .map_err(|e| WebSocketError::SendFailed(e.to_string()))?;

        self.connection = Some(ws_stream);
        self.subscription.mark_open();
        info!(symbol = self.subscription.symbol(), "subscription open");
        Ok(())
    }

    /// Pumps inbound frames until the connection ends.
    ///
    /// Per-frame decode failures are logged and dropped. Transport errors
    /// move the subscription to the error state and return; connection
    /// close is terminal for this subscription.
    pub async fn run_until_disconnect(&mut self) -> Result<(), WebSocketError> {
        loop {
            let conn = self
                .connection
                .as_mut()
                .ok_or_else(|| WebSocketError::ConnectionFailed("not connected".to_string()))?;

            match conn.next().await {
                Some(Ok(Message::Text(text))) => match self.subscription.handle_frame(&text) {
                    Ok(events) => {
                        for event in events {
                            if self.event_tx.send(event).await.is_err() {
                                // Consumer is gone; nothing left to do.
                                info!("event channel closed, stopping");
                                return Ok(());
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "dropping malformed frame");
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Some(conn) = self.connection.as_mut() {
                        let _ = conn.send(Message::Pong(data)).await;
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    debug!("pong received");
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "server closed connection".to_string());
                    self.subscription.mark_closed();
                    return Err(WebSocketError::ConnectionClosed(reason));
                }
                Some(Ok(_)) => {
                    debug!("ignoring non-text frame");
                }
                Some(Err(e)) => {
                    self.subscription.mark_error();
                    let _ = self
                        .event_tx
                        .send(StreamEvent::TransportError {
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        })
                        .await;
                    return Err(WebSocketError::ReceiveFailed(e.to_string()));
                }
                None => {
                    self.subscription.mark_closed();
                    return Err(WebSocketError::ConnectionClosed(
                        "stream ended".to_string(),
                    ));
                }
            }
        }
    }

    /// Gracefully closes the connection.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            let _ = conn.close(None).await;
        }
        self.subscription.mark_closed();
        info!(symbol = self.subscription.symbol(), "subscription closed");
    }
}

impl std::fmt::Debug for PoloniexWebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoloniexWebSocket")
            .field("url", &self.url)
            .field("subscription", &self.subscription)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::DepthAction;
    use serde_json::json;

    fn depth_subscription(mode: OutputMode) -> Subscription {
        Subscription::open(&ConnectorConfig::default(), "depth", "BTC_NXT", mode).unwrap()
    }

    #[test]
    fn unknown_stream_rejected_before_any_connection_exists() {
        // Validation is pure: no driver, no socket, no network.
        let err = Subscription::open(
            &ConnectorConfig::default(),
            "unknown-stream",
            "BTC_NXT",
            OutputMode::Canonical,
        )
        .unwrap_err();
        assert!(matches!(err, SubscribeError::UnsupportedStream(s) if s == "unknown-stream"));
    }

    #[test]
    fn configured_stream_without_translator_is_a_config_error() {
        let mut config = ConnectorConfig::default();
        config.valid_streams.push("trades".to_string());
        let err = Subscription::open(&config, "trades", "BTC_NXT", OutputMode::Canonical)
            .unwrap_err();
        assert!(matches!(err, SubscribeError::MissingTranslator(_)));
    }

    #[test]
    fn handshake_frame_shape() {
        let sub = depth_subscription(OutputMode::Canonical);
        let frame: serde_json::Value = serde_json::from_str(&sub.handshake()).unwrap();
        assert_eq!(frame, json!({"command": "subscribe", "channel": "BTC_NXT"}));
    }

    #[test]
    fn status_walks_idle_open_closed() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        assert_eq!(sub.status(), SubscriptionStatus::Idle);
        sub.mark_open();
        assert_eq!(sub.status(), SubscriptionStatus::Open);
        sub.mark_closed();
        assert_eq!(sub.status(), SubscriptionStatus::Closed);
    }

    #[test]
    fn error_never_returns_to_open() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        sub.mark_open();
        sub.mark_error();
        assert_eq!(sub.status(), SubscriptionStatus::Error);
        sub.mark_open();
        assert_eq!(sub.status(), SubscriptionStatus::Error);
        // Error may still be followed by close.
        sub.mark_closed();
        assert_eq!(sub.status(), SubscriptionStatus::Closed);
    }

    #[test]
    fn closed_is_terminal() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        sub.mark_open();
        sub.mark_closed();
        sub.mark_error();
        assert_eq!(sub.status(), SubscriptionStatus::Closed);
        sub.mark_open();
        assert_eq!(sub.status(), SubscriptionStatus::Closed);
    }

    #[test]
    fn canonical_mode_translates_frames() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        sub.mark_open();
        let frame = json!({
            "action": "insert",
            "data": [{"id": "p1", "price": 100.5, "size": 2, "side": "Buy"}]
        });
        let events = sub.handle_frame(&frame.to_string()).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Depth(e) => {
                assert_eq!(e.action, DepthAction::Insert);
                assert_eq!(e.pair, "BTC_NXT");
                assert_eq!(e.exchange, EXCHANGE_NAME);
            }
            other => panic!("expected depth event, got {other:?}"),
        }
    }

    #[test]
    fn raw_mode_skips_translation() {
        let mut sub = depth_subscription(OutputMode::Raw);
        sub.mark_open();
        // This frame would be malformed for the translator; raw mode
        // forwards it anyway.
        let events = sub.handle_frame(r#"{"hello": "world"}"#).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Raw { payload, .. } => {
                assert_eq!(payload["hello"], "world");
            }
            other => panic!("expected raw event, got {other:?}"),
        }
    }

    #[test]
    fn malformed_frame_leaves_subscription_open() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        sub.mark_open();
        assert!(sub.handle_frame("not json at all").is_err());
        assert_eq!(sub.status(), SubscriptionStatus::Open);
        assert!(sub.handle_frame(r#"{"action": "update"}"#).is_err());
        assert_eq!(sub.status(), SubscriptionStatus::Open);
    }

    #[test]
    fn unknown_action_frame_yields_no_events_and_no_error() {
        let mut sub = depth_subscription(OutputMode::Canonical);
        sub.mark_open();
        let events = sub
            .handle_frame(r#"{"action": "snapshot", "data": []}"#)
            .unwrap();
        assert!(events.is_empty());
        assert_eq!(sub.status(), SubscriptionStatus::Open);
    }
}
