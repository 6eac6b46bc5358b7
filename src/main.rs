//! AppHub CLI
//!
//! Command-line admin console for the AppHub backend.

use apphub::cli::{self, Cli};
use apphub::config::{Config, LoggingConfig};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;

    init_logging(&config.logging);
    tracing::debug!("AppHub console v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("API base URL: {}", cli.api_url.as_deref().unwrap_or(&config.api.base_url));

    cli::run(cli, config).await
}

/// Logs go to stderr so command output stays pipeable
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("apphub={}", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
