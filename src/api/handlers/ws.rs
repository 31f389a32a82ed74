use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;

use crate::hub::{BroadcastHub, SubscriberHandle, SUBSCRIBER_BUFFER};
use crate::AppState;

pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state.hub))
}

async fn handle_socket(mut socket: WebSocket, hub: BroadcastHub) {
    let (handle, mut rx) = SubscriberHandle::channel(SUBSCRIBER_BUFFER);
    let id = handle.id();
    hub.register(handle).await;

    tracing::info!(subscriber = %id, "Dashboard WebSocket client connected");

    loop {
        tokio::select! {
            // Forward published alerts to client
            payload = rx.recv() => {
                match payload {
                    Some(json) => {
                        if socket.send(Message::Text(json.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Hub pruned us
                    None => break,
                }
            }
            // Handle incoming messages from client (ping/pong, close)
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {} // ignore text/binary from client
                    Some(Err(_)) => break,
                }
            }
        }
    }

    hub.unregister(id).await;
    tracing::info!(subscriber = %id, "Dashboard WebSocket client disconnected");
}
