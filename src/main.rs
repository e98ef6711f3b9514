use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use httpecho::EchoServerTrait;
use httpecho::cli::Args;
use httpecho::http::HttpEchoServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("httpecho=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Args::parse().into_config();
    info!(
        address = %config.listen_addr,
        include_env = config.include_env,
        version = env!("CARGO_PKG_VERSION"),
        "Starting HTTP echo server"
    );

    let server = HttpEchoServer::new(config);
    server.run().await.wrap_err("Failed to run HTTP echo server")?;

    Ok(())
}
