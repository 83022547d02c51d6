//! WebSocket transport: one metric stream per connection

use crate::server::StreamServer;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use eeg_core::MetricMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Messages buffered between a session and its socket
const CLIENT_QUEUE: usize = 16;

/// Router serving the metric stream at `/`
pub fn router(server: Arc<StreamServer>) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(server)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<StreamServer>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_client(socket, server))
}

async fn handle_client(mut socket: WebSocket, server: Arc<StreamServer>) {
    let (tx, mut rx) = mpsc::channel::<MetricMessage>(CLIENT_QUEUE);
    let session = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.run_client(tx).await }
    });

    info!("WebSocket client connected");

    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else {
                    // Session ended on its own: shutdown or refusal
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(error = %e, "Close frame not delivered");
                    }
                    break;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Dropping unserializable message");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!("Send failed; client gone");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {} // client messages are ignored
                }
            }
        }
    }

    // Dropping the receiver ends the session task
    drop(rx);
    if let Err(e) = session.await {
        warn!(error = %e, "Client session task failed");
    }
    info!("WebSocket client disconnected");
}
