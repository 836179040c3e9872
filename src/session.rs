use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Error as TungsteniteError, Message,
        error::ProtocolError,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{debug, error, info};

pub type ClientStream = WebSocketStream<TcpStream>;
pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Audio frames arrive at rates that would flood the log if every frame
/// were recorded, so binary forwarding is logged on a sampling cadence.
/// Text messages are low-rate control traffic and are logged individually.
const UPSTREAM_BINARY_LOG_INTERVAL: u64 = 10;
const CLIENT_BINARY_LOG_INTERVAL: u64 = 100;

/// Replaces close codes that must not be sent on the wire. 1004, 1005,
/// 1006 and 1015 are reserved by RFC 6455, and codes outside 1000-4999 are
/// not transmittable; all of them map to normal closure.
#[must_use]
pub fn sanitize_close_code(code: CloseCode) -> CloseCode {
    match u16::from(code) {
        1004 | 1005 | 1006 | 1015 => CloseCode::Normal,
        1000..=4999 => code,
        _ => CloseCode::Normal,
    }
}

fn sanitize_close_frame(frame: Option<CloseFrame>) -> CloseFrame {
    frame.map_or(
        CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        },
        |f| CloseFrame {
            code: sanitize_close_code(f.code),
            reason: f.reason,
        },
    )
}

/// Runs one proxy session over an accepted client connection and an open
/// upstream connection. Each direction owns its source stream half and its
/// target sink half, so the directions share no mutable state; when either
/// direction finishes, the `select!` drops the other and the pair is torn
/// down as a unit.
#[tracing::instrument(skip(client, upstream))]
pub async fn run(client: ClientStream, upstream: UpstreamStream) -> Result<()> {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    let upstream_to_client = async {
        let mut messages: u64 = 0;
        let mut close_frame = None;
        while let Some(msg) = upstream_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    messages += 1;
                    debug!(bytes = text.len(), "Forwarding text message to client");
                    client_tx
                        .send(Message::Text(text))
                        .await
                        .context("Failed to forward upstream text message to client")?;
                }
                Ok(Message::Binary(data)) => {
                    messages += 1;
                    if messages % UPSTREAM_BINARY_LOG_INTERVAL == 0 {
                        debug!(
                            messages,
                            bytes = data.len(),
                            "Forwarding audio frame to client"
                        );
                    }
                    client_tx
                        .send(Message::Binary(data))
                        .await
                        .context("Failed to forward upstream audio frame to client")?;
                }
                Ok(Message::Close(frame)) => {
                    info!(messages, "Upstream closed the connection");
                    close_frame = frame;
                    break;
                }
                Ok(_) => {}
                Err(e) => match e {
                    TungsteniteError::ConnectionClosed
                    | TungsteniteError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                        debug!("Upstream disconnected: {e}");
                    }
                    _ => {
                        // Log only; the stream terminates right after and the
                        // close below reaches the client.
                        error!("Upstream WebSocket error: {e}");
                    }
                },
            }
        }
        client_tx
            .send(Message::Close(Some(sanitize_close_frame(close_frame))))
            .await
            .ok();
        anyhow::Ok(())
    };

    let client_to_upstream = async {
        let mut messages: u64 = 0;
        while let Some(msg) = client_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    messages += 1;
                    debug!(bytes = text.len(), "Forwarding text message to upstream");
                    upstream_tx
                        .send(Message::Text(text))
                        .await
                        .context("Failed to forward client text message to upstream")?;
                }
                Ok(Message::Binary(data)) => {
                    messages += 1;
                    if messages % CLIENT_BINARY_LOG_INTERVAL == 0 {
                        debug!(
                            messages,
                            bytes = data.len(),
                            "Forwarding binary message to upstream"
                        );
                    }
                    upstream_tx
                        .send(Message::Binary(data))
                        .await
                        .context("Failed to forward client binary message to upstream")?;
                }
                Ok(Message::Close(_)) => {
                    info!(messages, "Client closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    match e {
                        TungsteniteError::ConnectionClosed
                        | TungsteniteError::Protocol(
                            ProtocolError::ResetWithoutClosingHandshake,
                        ) => {
                            debug!("Client disconnected: {e}");
                        }
                        _ => {
                            error!("Client WebSocket error: {e}");
                        }
                    }
                    break;
                }
            }
        }
        // Client departure closes the upstream leg unconditionally, with no
        // code translation in this direction.
        upstream_tx.send(Message::Close(None)).await.ok();
        anyhow::Ok(())
    };

    tokio::select! {
        result = upstream_to_client => result?,
        result = client_to_upstream => result?,
    }

    info!("Session closed");
    Ok(())
}
