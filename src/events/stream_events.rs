//! Events surfaced by a streaming subscription.
//!
//! Consumers see exactly one of two data shapes per subscription, chosen at
//! construction: canonical depth events, or the raw decoded payload when the
//! caller has taken over interpretation. Connection lifecycle changes are
//! reported on the same channel so a consumer can tell a quiet market from a
//! dead connection.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::events::DepthEvent;

/// One event emitted by a streaming subscription.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A canonical depth delta.
    Depth(DepthEvent),

    /// The raw decoded frame, forwarded verbatim (raw-passthrough mode).
    Raw {
        payload: Value,
        received_at: DateTime<Utc>,
    },

    /// The connection opened and the subscription handshake was sent.
    Connected { timestamp: DateTime<Utc> },

    /// The connection closed; the subscription is terminal.
    Disconnected {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The transport reported an error. The subscription is left in the
    /// error state but is not closed from this layer.
    TransportError {
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamEvent {
    /// Returns true for data-carrying events (depth or raw).
    pub fn is_data(&self) -> bool {
        matches!(self, StreamEvent::Depth(_) | StreamEvent::Raw { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_are_not_data() {
        let connected = StreamEvent::Connected {
            timestamp: Utc::now(),
        };
        assert!(!connected.is_data());

        let raw = StreamEvent::Raw {
            payload: serde_json::json!({}),
            received_at: Utc::now(),
        };
        assert!(raw.is_data());
    }
}
