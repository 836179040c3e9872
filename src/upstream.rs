use anyhow::{Context, Result};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{HeaderValue, header},
    },
};
use tracing::{debug, info};

use crate::config::UpstreamConfig;
use crate::params::ProxyParams;
use crate::session::UpstreamStream;

/// Opens the provider-side leg for a session. The relay authenticates with
/// its own API key; the client's session token never crosses this
/// connection. A dial failure is terminal for the session — the relay
/// performs no retry.
pub async fn connect(config: &UpstreamConfig, params: &ProxyParams) -> Result<UpstreamStream> {
    let url = format!("{}?{}", config.speak_url, params.as_query());
    debug!(url = %url, "Connecting to upstream speak endpoint");

    let mut request = url
        .as_str()
        .into_client_request()
        .with_context(|| format!("Invalid upstream URL {url}"))?;
    let credential = HeaderValue::from_str(&format!("Token {}", config.api_key))
        .context("API key is not a valid header value")?;
    request.headers_mut().insert(header::AUTHORIZATION, credential);

    let (stream, _response) = connect_async(request)
        .await
        .with_context(|| format!("Failed to connect to upstream {url}"))?;

    info!(url = %url, "Connected to upstream");
    Ok(stream)
}
