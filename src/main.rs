//! leadgate - small-business lead discovery and qualification.
//!
//! Ingests directory discovery records, deduplicates them by fingerprint,
//! and runs the qualification gates over the collected evidence.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    // Initialize logging based on verbosity
    let default_filter = if leadgate::cli::is_verbose() {
        "leadgate=info"
    } else {
        "leadgate=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    leadgate::cli::run().await
}
