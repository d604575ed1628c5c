//! Infrastructure adapters for configuration, durable file IO, and logging.

pub mod config;
pub mod fs;
pub mod logging;
