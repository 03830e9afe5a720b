//! Utilities module for configuration, logging and error handling
//!
//! This module provides:
//! - TOML configuration with defaults for the PlantVillage checkpoint
//! - Structured logging with tracing
//! - The error taxonomy shared by every pipeline stage

pub mod config;
pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use config::AppConfig;
pub use error::{DiagnosisError, Result};
pub use logging::{init_logging, LogConfig, LogLevel, ProgressLogger};

/// Format a duration in milliseconds for display
pub fn format_millis(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{:.2} ms", ms)
    } else {
        format!("{:.2} s", ms / 1000.0)
    }
}
