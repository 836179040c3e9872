use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use tts_relay::config::load_config;
use tts_relay::proxy::handle_connection;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Arc::new(load_config()?);
    info!(
        config_file = "config.toml",
        listen_ip = %config.listen.ip,
        listen_port = config.listen.port,
        upstream_url = %config.upstream.speak_url,
        "Configuration loaded"
    );

    let addr = format!("{}:{}", config.listen.ip, config.listen.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;

    info!(
        listen_addr = %addr,
        "Text-to-speech relay listening"
    );

    while let Ok((stream, addr)) = listener.accept().await {
        let config = config.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &config).await {
                error!(client_addr = %addr, error = %e, "Connection failed");
            }
        });
    }

    Ok(())
}
