use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Honours `RUST_LOG`, falling back to `info`. Fails if a global subscriber
/// is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Create a span for one remotely executed command
pub fn command_span(name: &str, instance_name: &str) -> Span {
    span!(Level::INFO, "command", command_name = %name, instance_name = %instance_name)
}

/// Direction of a CAS transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Upload,
    Download,
}

/// Emit a structured event for a CAS transfer
pub fn transfer_event(direction: Transfer, digest: &str, bytes: u64) {
    match direction {
        Transfer::Upload => trace!(digest = %digest, bytes = %bytes, "cas_upload"),
        Transfer::Download => trace!(digest = %digest, bytes = %bytes, "cas_download"),
    }
}
