//! Telemetry initialization: structured logging via `tracing`.
//!
//! The log level defaults to `info` for this crate and can be adjusted with
//! the standard `RUST_LOG` environment variable, e.g.
//! `RUST_LOG=regctl=debug,sqlx=warn`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the global tracing subscriber.
///
/// Safe to call once at startup; returns an error if a subscriber is already
/// installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regctl=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
