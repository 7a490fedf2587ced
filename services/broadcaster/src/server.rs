//! WebSocket accept loop and per-session tasks
//!
//! Each accepted session registers an unbounded send queue with the shared
//! state; a writer task drains that queue onto the socket so writes are
//! serialized per session. Inbound frames are read and discarded until the
//! client closes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::{HeaderValue, SERVER};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::Shared;

/// Server identification returned on the upgrade response.
const SERVER_TAG: &str = "Solstice-LOB-Broadcaster";

pub(crate) async fn serve(listener: tokio::net::TcpListener, shared: Arc<Shared>) {
    let app = Router::new().route("/", get(ws_handler)).with_state(shared);
    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "broadcaster server stopped");
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(shared): State<Arc<Shared>>) -> Response {
    let mut response = ws.on_upgrade(move |socket| handle_session(socket, shared));
    response
        .headers_mut()
        .insert(SERVER, HeaderValue::from_static(SERVER_TAG));
    response
}

async fn handle_session(socket: WebSocket, shared: Arc<Shared>) {
    let (sender, mut outbound) = mpsc::unbounded_channel::<Message>();
    shared.sessions.lock().push(sender);
    tracing::info!("client connected");

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Drain inbound frames until the client goes away.
    while let Some(Ok(frame)) = stream.next().await {
        if matches!(frame, Message::Close(_)) {
            break;
        }
    }

    writer.abort();
    tracing::info!("client disconnected");
}
