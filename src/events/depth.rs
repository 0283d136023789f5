//! Depth-delta translation.
//!
//! The exchange pushes order-book deltas in three action shapes (`insert`,
//! `update`, `delete`). This module flattens all three into one canonical
//! event type so downstream book builders apply every delta identically:
//! `quantity = 0` is the universal "remove this level" signal, and `price`
//! is only present when a new level is being inserted.
//!
//! Translation is pure and synchronous - one frame in, zero or more events
//! out. A malformed frame is an error for that frame only and must never
//! bring down the subscription that received it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("malformed depth frame: {0}")]
    MalformedMessage(String),
}

/// Book side of a depth entry, lowercased on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parses the provider's side vocabulary, case-insensitively.
    /// `bid`/`ask` spellings are accepted as synonyms.
    pub fn parse(raw: &str) -> Option<Side> {
        match raw.to_ascii_lowercase().as_str() {
            "buy" | "bid" => Some(Side::Buy),
            "sell" | "ask" => Some(Side::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }

    /// Returns true for the bid side of the book.
    pub fn is_bid(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

/// Action shape of a depth delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthAction {
    Insert,
    Update,
    Delete,
}

/// One canonical order-book delta.
///
/// Invariants: `price` is present only for `Insert`; `Delete` always
/// carries `quantity = 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthEvent {
    pub exchange: String,
    pub stream: String,
    pub pair: String,
    /// Unix-epoch seconds at translation time.
    pub timestamp: f64,
    pub action: DepthAction,
    pub price_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub quantity: f64,
    pub side: Side,
}

/// Identity of the subscription a frame arrived on, copied into the header
/// of every event it produces.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub exchange: String,
    pub stream: String,
    pub pair: String,
}

/// Known wire shape of a depth frame. Entries stay loosely typed because
/// the provider is inconsistent about numbers-vs-strings inside them.
#[derive(Debug, Deserialize)]
struct RawDepthFrame {
    data: Vec<Value>,
    action: String,
}

/// Translates one raw depth frame into canonical events.
///
/// Entry order of the frame's `data` array is preserved. Unknown `action`
/// values yield an empty vec rather than an error, so future provider
/// action types pass through harmlessly.
pub fn translate_depth(
    payload: &Value,
    ctx: &StreamContext,
) -> Result<Vec<DepthEvent>, TranslateError> {
    let frame: RawDepthFrame = serde_json::from_value(payload.clone())
        .map_err(|e| TranslateError::MalformedMessage(e.to_string()))?;

    let action = match frame.action.as_str() {
        "insert" => DepthAction::Insert,
        "update" => DepthAction::Update,
        "delete" => DepthAction::Delete,
        _ => return Ok(Vec::new()),
    };

    let timestamp = unix_now();
    let mut events = Vec::with_capacity(frame.data.len());

    for entry in &frame.data {
        let price_id = entry_id(entry)?;
        let side = entry_side(entry)?;

        let (price, quantity) = match action {
            DepthAction::Insert => (Some(entry_f64(entry, "price")?), entry_f64(entry, "size")?),
            DepthAction::Update => (None, entry_f64(entry, "size")?),
            DepthAction::Delete => (None, 0.0),
        };

        events.push(DepthEvent {
            exchange: ctx.exchange.clone(),
            stream: ctx.stream.clone(),
            pair: ctx.pair.clone(),
            timestamp,
            action,
            price_id,
            price,
            quantity,
            side,
        });
    }

    Ok(events)
}

/// Current time as unix-epoch seconds.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// The provider sends level ids as either JSON strings or numbers.
fn entry_id(entry: &Value) -> Result<String, TranslateError> {
    match entry.get("id") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(TranslateError::MalformedMessage(
            "depth entry missing id".to_string(),
        )),
    }
}

fn entry_side(entry: &Value) -> Result<Side, TranslateError> {
    let raw = entry.get("side").and_then(Value::as_str).ok_or_else(|| {
        TranslateError::MalformedMessage("depth entry missing side".to_string())
    })?;
    Side::parse(raw).ok_or_else(|| {
        TranslateError::MalformedMessage(format!("unrecognized side {raw:?}"))
    })
}

/// Numeric fields may arrive as numbers or numeric strings.
fn entry_f64(entry: &Value, key: &str) -> Result<f64, TranslateError> {
    match entry.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            TranslateError::MalformedMessage(format!("{key} is not representable as f64"))
        }),
        Some(Value::String(s)) => s.parse::<f64>().map_err(|_| {
            TranslateError::MalformedMessage(format!("{key} is not numeric: {s:?}"))
        }),
        _ => Err(TranslateError::MalformedMessage(format!(
            "depth entry missing {key}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> StreamContext {
        StreamContext {
            exchange: "poloniex".to_string(),
            stream: "depth".to_string(),
            pair: "BTC_NXT".to_string(),
        }
    }

    #[test]
    fn insert_carries_price_and_lowercases_side() {
        let frame = json!({
            "action": "insert",
            "data": [{"id": "p1", "price": 100.5, "size": 2, "side": "Buy"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.exchange, "poloniex");
        assert_eq!(e.pair, "BTC_NXT");
        assert_eq!(e.action, DepthAction::Insert);
        assert_eq!(e.price_id, "p1");
        assert_eq!(e.price, Some(100.5));
        assert_eq!(e.quantity, 2.0);
        assert_eq!(e.side, Side::Buy);
        assert_eq!(e.side.as_str(), "buy");
    }

    #[test]
    fn update_omits_price() {
        let frame = json!({
            "action": "update",
            "data": [{"id": "p1", "size": 5, "side": "buy"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quantity, 5.0);
        assert!(events[0].price.is_none());
    }

    #[test]
    fn delete_forces_zero_quantity() {
        let frame = json!({
            "action": "delete",
            "data": [{"id": "p1", "side": "Sell"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quantity, 0.0);
        assert_eq!(events[0].side, Side::Sell);
        assert!(events[0].price.is_none());
    }

    #[test]
    fn unknown_action_yields_no_events() {
        let frame = json!({
            "action": "snapshot",
            "data": [{"id": "p1", "size": 1, "side": "buy"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn missing_data_is_malformed() {
        let frame = json!({"action": "update"});
        assert!(matches!(
            translate_depth(&frame, &ctx()),
            Err(TranslateError::MalformedMessage(_))
        ));
    }

    #[test]
    fn missing_action_is_malformed() {
        let frame = json!({"data": []});
        assert!(matches!(
            translate_depth(&frame, &ctx()),
            Err(TranslateError::MalformedMessage(_))
        ));
    }

    #[test]
    fn non_object_frame_is_malformed() {
        let frame = json!([1, 2, 3]);
        assert!(translate_depth(&frame, &ctx()).is_err());
    }

    #[test]
    fn insert_without_price_is_malformed() {
        let frame = json!({
            "action": "insert",
            "data": [{"id": "p1", "size": 2, "side": "buy"}]
        });
        assert!(translate_depth(&frame, &ctx()).is_err());
    }

    #[test]
    fn entry_order_is_preserved() {
        let frame = json!({
            "action": "update",
            "data": [
                {"id": "p1", "size": 1, "side": "buy"},
                {"id": "p2", "size": 2, "side": "sell"},
                {"id": "p3", "size": 3, "side": "buy"}
            ]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.price_id.as_str()).collect();
        assert_eq!(ids, ["p1", "p2", "p3"]);
    }

    #[test]
    fn numeric_strings_and_numeric_ids_are_accepted() {
        let frame = json!({
            "action": "insert",
            "data": [{"id": 42, "price": "0.015", "size": "7.5", "side": "ask"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        assert_eq!(events[0].price_id, "42");
        assert_eq!(events[0].price, Some(0.015));
        assert_eq!(events[0].quantity, 7.5);
        assert_eq!(events[0].side, Side::Sell);
    }

    #[test]
    fn depth_event_serializes_without_null_price() {
        let frame = json!({
            "action": "update",
            "data": [{"id": "p1", "size": 5, "side": "buy"}]
        });
        let events = translate_depth(&frame, &ctx()).unwrap();
        let out = serde_json::to_value(&events[0]).unwrap();
        assert!(out.get("price").is_none());
        assert_eq!(out["side"], "buy");
        assert_eq!(out["action"], "update");
    }
}
