//! Default configuration values for pveoff

use crate::types::ShutdownMethod;

// Shutdown policy defaults
pub const DEFAULT_SHUTDOWN_METHOD: ShutdownMethod = ShutdownMethod::Shutdown;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MUST_SUCCEED: bool = true;

// pvesh defaults
pub const DEFAULT_PVESH_BINARY: &str = "/usr/bin/pvesh";

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
pub const VALID_LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];
