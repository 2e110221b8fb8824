//! Structured logging setup and span helpers

use std::time::Instant;
use tracing::Span;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{PveoffError, PveoffResult};
use crate::types::{GuestKind, ShutdownMethod};

/// Initialize tracing from the logging configuration.
///
/// `RUST_LOG` takes precedence over the configured level. Output goes to stderr
/// so that command output on stdout stays machine-readable.
pub fn init_tracing(config: &LoggingConfig) -> PveoffResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            PveoffError::ConfigError(format!("Invalid log directive '{}': {}", config.level, e))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };

    result.map_err(|e| PveoffError::ConfigError(format!("Failed to initialize tracing: {}", e)))
}

/// Create a span for shutting down one guest
#[inline]
pub fn guest_span(kind: GuestKind, vmid: u32, method: ShutdownMethod) -> Span {
    tracing::info_span!(
        "guest",
        kind = %kind,
        vmid = vmid,
        method = %method,
        duration_ms = tracing::field::Empty,
    )
}

/// Create a span for a single management CLI call
#[inline]
pub fn pvesh_span(action: &str, path: &str) -> Span {
    tracing::debug_span!(
        "pvesh",
        action = %action,
        path = %path,
        duration_ms = tracing::field::Empty,
    )
}

/// Record the duration of an operation in the current span
pub fn record_duration(start: Instant) {
    let duration = start.elapsed();
    Span::current().record("duration_ms", duration.as_millis() as u64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn guest_span_carries_identity() {
        {
            let _span = guest_span(GuestKind::Qemu, 101, ShutdownMethod::Stop).entered();
            info!("powering off");
        }
        assert!(logs_contain("kind=qemu"));
        assert!(logs_contain("vmid=101"));
        assert!(logs_contain("method=stop"));
    }
}
