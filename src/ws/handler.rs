//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Lobby, Outbound, RoomHandle};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outgoing messages buffered per connection
const OUTBOX_CAPACITY: usize = 256;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.lobby))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, lobby: Lobby) {
    // Fresh id per connection, never reused
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    let room = run_session(player_id, &lobby, ws_sink, ws_stream).await;

    // Disconnect always leaves the room
    if let Err(e) = room.leave(player_id).await {
        debug!(player_id = %player_id, error = %e, "Leave not delivered");
    }

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split.
///
/// Returns the room the connection was attached to when it closed.
async fn run_session(
    player_id: Uuid,
    lobby: &Lobby,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
) -> RoomHandle {
    let rate_limiter = ConnectionRateLimiter::new();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMsg>(OUTBOX_CAPACITY);

    // Spawn writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Subscribe before any join so the roster reply cannot be missed
    let mut room = lobby.current();
    let mut forwarder = spawn_forwarder(player_id, room.subscribe(), out_tx.clone());

    // Reader loop: WebSocket -> room queue
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                let sent = match msg {
                    ClientMsg::Join { name } => {
                        // A finished match is replaced by a fresh room; follow it
                        let current = lobby.current();
                        if current.id != room.id {
                            debug!(
                                player_id = %player_id,
                                from_room = %room.id,
                                to_room = %current.id,
                                "Moving connection to current room"
                            );
                            forwarder.abort();
                            room = current;
                            forwarder =
                                spawn_forwarder(player_id, room.subscribe(), out_tx.clone());
                        }
                        room.join(player_id, name).await
                    }
                    ClientMsg::Input(input) => {
                        if !rate_limiter.check_input() {
                            debug!(player_id = %player_id, "Rate limited input message");
                            continue;
                        }
                        room.input(player_id, input).await
                    }
                    ClientMsg::TogglePause => room.toggle_pause(player_id).await,
                };

                if let Err(e) = sent {
                    // Match over; the next join picks up the replacement room
                    debug!(player_id = %player_id, room_id = %room.id, error = %e, "Command not delivered");
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    forwarder.abort();
    writer_handle.abort();
    room
}

/// Forward room messages addressed to this connection into its outbox
fn spawn_forwarder(
    player_id: Uuid,
    mut events_rx: broadcast::Receiver<Outbound>,
    out_tx: mpsc::Sender<ServerMsg>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(out) => {
                    if !out.to.includes(player_id) {
                        continue;
                    }
                    if out_tx.send(out.msg).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        player_id = %player_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - the next state update supersedes what was dropped
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(player_id = %player_id, "Room channel closed");
                    break;
                }
            }
        }
    })
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
