//! Configuration persistence
//!
//! [`ConfigManager`] reads and writes a serde config object as JSON, and a
//! [`ConfigBinding`] copies it into (and back out of) the live properties.

pub mod manager;

pub use manager::{ConfigBinding, ConfigManager};
