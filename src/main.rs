use tracing_subscriber::{fmt, EnvFilter};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let cfg = inkpress::config::Config::from_env()?;
    info!(
        target: "inkpress",
        "inkpress starting: RUST_LOG='{}', http_port={}, data_root='{}', public_base='{}', federated_issuer='{}'",
        rust_log,
        cfg.http_port,
        cfg.data_root.display(),
        cfg.public_base_url,
        cfg.federated_issuer
    );

    inkpress::server::run_with_config(cfg).await
}
