//! WebSocket upgrade handler

use std::ops::ControlFlow;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::registry::OUTBOUND_BUFFER;
use crate::game::SessionHandle;
use crate::ws::protocol::{decode_client_msg, Frame};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let session = state.session.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    let (ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER);

    // Registration queues `init` on the outbound channel before any broadcast
    let player_id = match session.connect(outbound_tx).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Failed to register connection");
            return;
        }
    };

    info!(player_id = %player_id, "New WebSocket connection");

    // Spawn writer task: session frames -> WebSocket
    let mut writer_handle = tokio::spawn(write_frames(player_id, ws_sink, outbound_rx));

    // Reader loop: WebSocket -> session actor, until either side gives up
    loop {
        tokio::select! {
            message = ws_stream.next() => {
                let Some(message) = message else { break };
                if on_message(&session, player_id, message).await.is_break() {
                    break;
                }
            }
            _ = &mut writer_handle => {
                // The session evicted this connection or the socket stopped accepting writes
                info!(player_id = %player_id, "Outbound channel closed, dropping connection");
                break;
            }
        }
    }

    // Cleanup on disconnect
    let _ = session.disconnect(player_id).await;
    writer_handle.abort();

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Handle one inbound WebSocket message; `Break` ends the connection
async fn on_message(
    session: &SessionHandle,
    player_id: Uuid,
    message: Result<Message, axum::Error>,
) -> ControlFlow<()> {
    match message {
        Ok(Message::Text(text)) => match decode_client_msg(&text) {
            Ok(Some(msg)) => {
                if session.client_msg(player_id, msg).await.is_err() {
                    debug!(player_id = %player_id, "Session closed");
                    return ControlFlow::Break(());
                }
            }
            Ok(None) => {
                debug!(player_id = %player_id, "Ignoring unknown message type");
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to parse client message");
            }
        },
        Ok(Message::Binary(_)) => {
            warn!(player_id = %player_id, "Received binary message, ignoring");
        }
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
        Ok(Message::Close(_)) => {
            info!(player_id = %player_id, "Client initiated close");
            return ControlFlow::Break(());
        }
        Err(e) => {
            error!(player_id = %player_id, error = %e, "WebSocket error");
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Forward queued frames until the session drops the channel or the socket fails
async fn write_frames(
    player_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame.to_string())).await {
            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
    let _ = ws_sink.close().await;
}
