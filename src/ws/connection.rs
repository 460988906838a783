//! WebSocket transport task: one per bot

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::debug;
use url::Url;

use crate::bot::session::SessionShared;

/// Commands from the session handle to its transport task
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Encoded binary frame
    Frame(Vec<u8>),
    /// Send a close frame and stop
    Close,
}

/// Connect, then pump frames both ways until either side goes away
pub(crate) async fn run(
    url: Url,
    shared: Arc<SessionShared>,
    mut outbound_rx: mpsc::UnboundedReceiver<Outbound>,
) {
    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            shared.failed(format!("connect to {url} failed: {e}"));
            return;
        }
    };
    shared.opened();

    let (mut ws_sink, mut ws_stream) = socket.split();

    loop {
        tokio::select! {
            command = outbound_rx.recv() => match command {
                Some(Outbound::Frame(bytes)) => {
                    if let Err(e) = ws_sink.send(WsMessage::Binary(bytes)).await {
                        shared.failed(format!("send failed: {e}"));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = ws_sink.close().await {
                        debug!(bot_id = shared.bot_id(), error = %e, "Close handshake failed");
                    }
                    break;
                }
            },
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Binary(bytes))) => shared.handle_frame(&bytes),
                Some(Ok(WsMessage::Text(text))) => shared.handle_text(&text),
                Some(Ok(WsMessage::Close(_))) | None => {
                    shared.failed("connection closed by server");
                    break;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    shared.failed(format!("socket error: {e}"));
                    break;
                }
            },
        }
    }

    debug!(bot_id = shared.bot_id(), "Transport task finished");
}
