//! # Core Module
//!
//! Configuration, logging and reply helpers shared by the framework.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add logging module with JSON line output
//! - 1.1.0: Add response module with reply helpers
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod logging;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use logging::LogFormat;
pub use response::{truncate_for_message, EXECUTION_FAILED, MESSAGE_LIMIT};
