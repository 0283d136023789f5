//! Event layer for the connector.
//!
//! Raw provider frames are normalized into typed events before anything
//! downstream sees them. Book builders consume `DepthEvent`s and never the
//! provider's wire format directly.

mod depth;
mod stream_events;

pub use depth::{
    translate_depth, unix_now, DepthAction, DepthEvent, Side, StreamContext, TranslateError,
};
pub use stream_events::StreamEvent;
