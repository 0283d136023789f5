//! Shared utilities: logging setup and time-range normalization.

mod telemetry;
mod time_range;

pub use telemetry::{init_telemetry, init_telemetry_json};
pub use time_range::{normalize_range, RangeError, TimeInput, TimeRange};
