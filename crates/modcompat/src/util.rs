//! Provides several utilities and helper functions.

pub mod checksum;
pub mod env;
mod log_level;

pub use log_level::LogLevel;
