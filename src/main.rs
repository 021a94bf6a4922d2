use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = reportnav::config::ServerConfig::load(None)?;
    info!(
        target: "reportnav",
        "reportnav starting: RUST_LOG='{}', host={}, port={}, reports_dir={:?}",
        rust_log, config.host, config.port, config.reports_dir
    );

    reportnav::server::run(config).await
}
