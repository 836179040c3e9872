use anyhow::{Context, Result, anyhow};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::{HeaderValue, StatusCode, header},
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{error, info, warn};

use crate::auth;
use crate::config::Config;
use crate::params::ProxyParams;
use crate::{session, upstream};

/// Path served by the relay. All other paths are rejected during the
/// upgrade handshake; plain HTTP routes live in a separate layer.
pub const SPEAK_PATH: &str = "/api/live-text-to-speech";

struct AcceptedUpgrade {
    params: ProxyParams,
    subprotocol: String,
}

fn reject(status: StatusCode, body: &str) -> ErrorResponse {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Some(body.to_string()))
        .unwrap()
}

#[tracing::instrument(skip(stream, config), fields(client_addr = %stream.peer_addr().unwrap_or_else(|_| "unknown".parse().unwrap())))]
pub async fn handle_connection(stream: TcpStream, config: &Config) -> Result<()> {
    let accepted = Arc::new(Mutex::new(None::<AcceptedUpgrade>));
    let accepted_clone = accepted.clone();
    let token_secret = config.auth.token_secret.clone();

    let callback = move |req: &Request, mut response: Response| {
        if req.uri().path() != SPEAK_PATH {
            return Err(reject(StatusCode::NOT_FOUND, "Not found"));
        }

        let offered = req
            .headers()
            .get(header::SEC_WEBSOCKET_PROTOCOL)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        let Some(subprotocol) = auth::authenticate(offered, &token_secret) else {
            warn!("Rejecting upgrade without a valid session token");
            return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized"));
        };

        // The client completes its handshake against the negotiated
        // subprotocol, so the matched entry is echoed back verbatim.
        let Ok(value) = HeaderValue::from_str(&subprotocol) else {
            return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized"));
        };
        response
            .headers_mut()
            .insert(header::SEC_WEBSOCKET_PROTOCOL, value);

        let params = ProxyParams::from_query(req.uri().query());
        if let Ok(mut guard) = accepted_clone.lock() {
            *guard = Some(AcceptedUpgrade {
                params,
                subprotocol,
            });
        }
        Ok(response)
    };

    let mut client = accept_hdr_async(stream, callback)
        .await
        .context("Failed to perform WebSocket handshake")?;

    let AcceptedUpgrade {
        params,
        subprotocol,
    } = accepted
        .lock()
        .unwrap()
        .take()
        .ok_or_else(|| anyhow!("Upgrade accepted without handshake state"))?;

    info!(
        model = %params.model,
        encoding = %params.encoding,
        sample_rate = %params.sample_rate,
        container = %params.container,
        subprotocol = %subprotocol,
        "Session authenticated"
    );

    let upstream = match upstream::connect(&config.upstream, &params).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "Failed to open upstream connection");
            client
                .close(Some(CloseFrame {
                    code: CloseCode::Error,
                    reason: "upstream connection failed".into(),
                }))
                .await
                .ok();
            return Err(e);
        }
    };

    session::run(client, upstream).await
}
