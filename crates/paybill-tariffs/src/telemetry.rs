//! Tracing setup for binaries, benches and demos

use paybill_common::{BillingError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when `RUST_LOG` is unset.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| BillingError::Internal(format!("Failed to initialize tracing: {}", e)))
}
