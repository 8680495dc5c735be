//! Configuration Layer
//!
//! YAML-backed configuration for the monitor: per-target probe settings plus
//! global scheduling knobs. Durations use humantime syntax (`30s`, `500ms`,
//! `1m30s`).

mod app;
mod validation;

pub use app::{AppConfig, PingTargetConfig, TraceTargetConfig};
pub use validation::{ConfigError, parse_duration};
