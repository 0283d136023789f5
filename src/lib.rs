//! Poloniex market-data connector.
//!
//! A request/response query client for historical and snapshot data, plus a
//! persistent streaming client that normalizes the exchange's order-book
//! delta messages into one canonical event schema.
//!
//! # Architecture
//!
//! - **Event-driven**: every inbound frame is normalized into typed events
//!   before downstream code (e.g. a book builder) sees it
//! - **Explicit configuration**: valid streams, valid periods and base URLs
//!   live in a `ConnectorConfig` value built once at startup
//! - **Local failure**: a malformed frame is dropped and logged; it never
//!   terminates a live subscription
//! - **One connection per subscription**: a `Subscription` never outlives
//!   its connection; reconnects open a fresh one
//!
//! # Usage
//!
//! ```no_run
//! use poloniex_connector::config::ConnectorConfig;
//! use poloniex_connector::connectors::OutputMode;
//! use poloniex_connector::watchers::DepthWatcher;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ConnectorConfig::from_env();
//!     let (event_tx, mut event_rx) = mpsc::channel(1000);
//!
//!     let watcher = DepthWatcher::new(config, "depth", "BTC_NXT", OutputMode::Canonical, event_tx);
//!     tokio::spawn(watcher.run());
//!
//!     while let Some(event) = event_rx.recv().await {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod config;
pub mod connectors;
pub mod events;
pub mod utils;
pub mod watchers;

// Re-export commonly used types
pub use config::ConnectorConfig;
pub use connectors::{BookScope, OutputMode, PoloniexRestClient, Subscription};
pub use events::{DepthAction, DepthEvent, Side, StreamEvent};
