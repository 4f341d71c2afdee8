//! Application-wide constants
//!
//! Single source of truth for file names and environment variables.

/// Config file location
pub mod config {
    /// Directory created under the platform config dir
    pub const APP_DIR: &str = "property-group";

    /// Config file name inside [`APP_DIR`]
    pub const FILENAME: &str = "settings.json";
}

/// Logging setup for the demo binary
pub mod logging {
    /// Environment variable holding the log level (trace/debug/info/warn/error)
    pub const LEVEL_ENV: &str = "LOG_LEVEL";

    pub const DEFAULT_LEVEL: &str = "info";
}
