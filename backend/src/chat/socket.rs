//! WebSocket transport for the chat relay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{chat::relay::ChatRelay, models::user::AuthUser, state::AppState};

/// Server sends a Ping every 15 seconds; two missed Pongs drop the connection.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub async fn chat_socket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ws: WebSocketUpgrade,
) -> Response {
    let relay = state.chat.clone();
    ws.on_upgrade(move |socket| run_connection(socket, relay, user))
}

async fn run_connection(socket: WebSocket, relay: ChatRelay, user: AuthUser) {
    let (mut sender, mut receiver) = socket.split();
    let (conn_id, mut outbound) = relay.connect(&user).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = outbound.recv() => {
                    let Some(event) = event else { break };
                    if sender.send(Message::Text(event.to_json().into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping chat connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Set once the outbound side is gone; the reader finishes its current
    // frame before stopping.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let recv_relay = relay.clone();
    let recv_user = user.clone();
    let mut recv_task = tokio::spawn(async move {
        // Frames are handled sequentially so per-connection order is preserved.
        loop {
            let next = tokio::select! {
                next = receiver.next() => next,
                _ = shutdown_rx.changed() => break,
            };
            let Some(Ok(msg)) = next else { break };
            match msg {
                Message::Text(text) => {
                    recv_relay
                        .handle_frame(conn_id, &recv_user, text.as_str())
                        .await;
                }
                Message::Pong(_) => pong_received.store(true, Ordering::Release),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            let _ = shutdown_tx.send(true);
            let _ = recv_task.await;
        }
        _ = &mut recv_task => send_task.abort(),
    }

    relay.disconnect(conn_id).await;
    info!("{} ({}) left chat", user.user_name, user.id);
}
