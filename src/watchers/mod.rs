//! Watcher subsystems that keep streams alive.
//!
//! A watcher owns connection lifecycle and reconnection policy; the
//! subscription state machine underneath performs no retries of its own.

mod depth_watcher;

pub use depth_watcher::{DepthWatcher, DepthWatcherConfig};
