use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the stderr subscriber. Standard output stays reserved for the
/// tool's own messages. Later calls are no-ops.
pub fn init(level: LogLevel) {
    INIT.get_or_init(|| {
        let Some(tracing_level) = level.as_tracing_level() else {
            return;
        };
        init_stderr_logging(tracing_level);
    });
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("ureq=warn".parse().unwrap())
        .add_directive("ureq_proto=warn".parse().unwrap())
        .add_directive("rustls=warn".parse().unwrap())
}

fn init_stderr_logging(level: Level) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(build_env_filter(level))
        .with(stderr_layer)
        .try_init();
}
