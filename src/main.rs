//! Demo entry point.
//!
//! Opens a depth subscription for each requested pair and logs the
//! canonical event stream. Pairs come from the command line, or
//! `POLONIEX_PAIRS` (comma separated), defaulting to BTC_NXT.

use tokio::sync::mpsc;
use tracing::{info, warn};

use poloniex_connector::config::ConnectorConfig;
use poloniex_connector::connectors::OutputMode;
use poloniex_connector::events::StreamEvent;
use poloniex_connector::utils::init_telemetry;
use poloniex_connector::watchers::DepthWatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_telemetry();

    let config = ConnectorConfig::from_env();

    let pairs: Vec<String> = {
        let from_args: Vec<String> = std::env::args().skip(1).collect();
        if !from_args.is_empty() {
            from_args
        } else {
            std::env::var("POLONIEX_PAIRS")
                .unwrap_or_else(|_| "BTC_NXT".to_string())
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        }
    };

    info!(rest_url = %config.rest_url, ws_url = %config.ws_url, "connector starting");
    info!(?pairs, "opening depth streams");

    let (event_tx, mut event_rx) = mpsc::channel(1000);

    for pair in &pairs {
        let watcher = DepthWatcher::new(
            config.clone(),
            "depth",
            pair,
            OutputMode::Canonical,
            event_tx.clone(),
        );
        let pair = pair.clone();
        tokio::spawn(async move {
            if let Err(e) = watcher.run().await {
                warn!(%pair, error = %e, "watcher failed to start");
            }
        });
    }
    drop(event_tx);

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(StreamEvent::Depth(depth)) => {
                        info!(
                            pair = %depth.pair,
                            action = ?depth.action,
                            price_id = %depth.price_id,
                            price = ?depth.price,
                            quantity = depth.quantity,
                            side = depth.side.as_str(),
                            "depth event"
                        );
                    }
                    Some(event) => info!(?event, "stream event"),
                    None => {
                        info!("all watchers stopped, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
