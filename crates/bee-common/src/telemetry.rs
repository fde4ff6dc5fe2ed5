//! Tracing setup shared by every long-lived BEE service.
//!
//! Installs a stdout `fmt` layer driven by `RUST_LOG`/`EnvFilter`, matching
//! what every binary in this workspace does, plus a rolling file layer under
//! `{workdir}/logs/{component}.log` so each component keeps its own log file
//! the way the original orchestrator did.
//!
//! The original's `STEP_INFO` level (a milestone level between DEBUG and
//! INFO) has no direct equivalent in `tracing`'s fixed level set; call sites
//! that would have used it should emit `tracing::info!(step = true, ...)`
//! instead so the field survives in structured output.

use std::path::Path;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Must be kept alive for the lifetime of the process; dropping it stops
/// flushing the non-blocking file writer.
pub struct TelemetryGuard {
    _file_guard: tracing_appender::non_blocking::WorkerGuard,
}

pub fn init(component: &str, workdir: &Path) -> std::io::Result<TelemetryGuard> {
    let log_dir = workdir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, format!("{component}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer().with_target(true);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(TelemetryGuard { _file_guard: guard })
}
