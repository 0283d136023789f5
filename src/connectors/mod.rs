//! Clients for the exchange's APIs.
//!
//! `rest` builds and dispatches query payloads; `websocket` owns the
//! streaming subscription lifecycle. Everything either client produces is
//! normalized through the events layer before downstream code sees it.

pub mod rest;
pub mod websocket;

pub use rest::{ApiError, BookScope, HttpTransport, PoloniexRestClient, QueryTransport};
pub use websocket::{
    OutputMode, PoloniexWebSocket, SubscribeError, Subscription, SubscriptionStatus,
    WebSocketError, EXCHANGE_NAME,
};
