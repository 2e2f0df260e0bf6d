use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use wishwall_core::clock;
use wishwall_core::config::{
    CLIENT_QUEUE_CAPACITY, HANDSHAKE_TIMEOUT_MS, HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES,
};
use wishwall_core::types::{ConnId, DeviceId, View};
use wishwall_store::Subscription;

use crate::app::AppState;
use crate::ws::{events, handshake, message, send};

/// An admitted client.
pub struct Session {
    pub view: View,
    pub device: DeviceId,
    pub token: Option<String>,
    /// Shared with the snapshot listener so a logout downgrades the
    /// projection immediately.
    pub admin: Arc<AtomicBool>,
    /// Dropping it unsubscribes from the record store.
    pub _subscription: Subscription,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.admin.load(Ordering::Acquire)
    }

    pub fn revoke_admin(&self) {
        self.admin.store(false, Ordering::Release);
    }
}

/// WS connection states: linear progression, no backwards transitions.
pub enum ConnState {
    AwaitingConnect,
    Authenticated(Session),
    Closing,
}

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_PAYLOAD_BYTES)
        .on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop: lives for the entire WS session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new().to_string();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    // snapshots and fan-out events land here; bounded so a stalled client
    // cannot grow memory
    let (queue_tx, mut queue_rx) = mpsc::channel::<String>(CLIENT_QUEUE_CAPACITY);
    let mut stage_rx = state.stage.subscribe();
    let mut stage_open = true;

    // send challenge and enter AwaitingConnect state
    let nonce = handshake::make_nonce();
    if send::text(&mut tx, handshake::challenge_event(&nonce)).await.is_err() {
        return;
    }
    let mut conn_state = ConnState::AwaitingConnect;

    // handshake must complete within 10s
    let deadline =
        tokio::time::Instant::now() + std::time::Duration::from_millis(HANDSHAKE_TIMEOUT_MS);
    let mut handshake_timer = Box::pin(tokio::time::sleep_until(deadline));

    // clock heartbeat after auth
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    // oversized frames are rejected by `max_message_size`
                    Some(Ok(Message::Text(text))) => {
                        conn_state = message::handle(
                            &conn_id, text.as_str(), conn_state, &mut tx, &queue_tx, &state,
                        ).await;
                        if matches!(conn_state, ConnState::Closing) { break; }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id, error = %e, "WS read error");
                        break;
                    }
                    _ => {}
                }
            }

            Some(text) = queue_rx.recv() => {
                if send::text(&mut tx, text).await.is_err() {
                    break;
                }
            }

            update = stage_rx.recv(), if stage_open => {
                match update {
                    Ok(update) => {
                        let ConnState::Authenticated(session) = &conn_state else { continue };
                        if let Some(ev) = events::stage_event(&update, session.view) {
                            let ev = ev.with_seq(state.next_seq());
                            if send::json(&mut tx, &ev).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(conn_id, skipped, "stage updates lagged");
                    }
                    // engine gone; the rest of the connection still works
                    Err(broadcast::error::RecvError::Closed) => {
                        stage_open = false;
                    }
                }
            }

            _ = tick.tick() => {
                if matches!(conn_state, ConnState::Authenticated(_)) {
                    let ev = events::tick_event(clock::now_ms()).with_seq(state.next_seq());
                    if send::json(&mut tx, &ev).await.is_err() {
                        break;
                    }
                }
            }

            _ = &mut handshake_timer, if matches!(conn_state, ConnState::AwaitingConnect) => {
                warn!(conn_id, "handshake timeout");
                break;
            }
        }
    }

    // drops the session, and with it the store subscription
    drop(conn_state);
    state.ws_clients.remove(&conn_id);
    info!(conn_id, "WS connection closed");
}
