//! Per-connection read and write tasks
//!
//! Each accepted WebSocket gets a read loop (this task) and a write task.
//! The read loop enforces the frame-size cap and the rolling message-rate
//! cap, decodes the `{type,data}` envelope, and dispatches to the command
//! handlers; the write task drains the bounded outbound queue, pings on a
//! timer, and honours kick signals. Either side failing tears the
//! connection down and frees the player slot.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::commands::{handle_message, CommandContext};
use crate::game::World;
use crate::net::hub::{ClientHandle, Hub, RateWindow};
use crate::net::protocol::{ClientMessage, ServerMessage, Target, TeamCounts};

use crate::game::constants::net as netc;

/// Drive one accepted WebSocket until it closes
pub async fn handle_socket(socket: WebSocket, world: Arc<World>, hub: Arc<Hub>) {
    let id = Uuid::new_v4();
    let (handle, outbound_rx) = match hub.register(id) {
        Ok(pair) => pair,
        Err(e) => {
            // The upgrade path also checks the cap; this is the race loser
            warn!(client = %id, "closing fresh connection: {e}");
            let mut socket = socket;
            let _ = socket.close().await;
            return;
        }
    };
    info!(client = %id, "connected");

    let (ws_tx, ws_rx) = socket.split();
    let write_task = tokio::spawn(write_loop(ws_tx, outbound_rx, handle.clone()));

    read_loop(ws_rx, &world, &hub, &handle).await;

    write_task.abort();
    hub.unregister(id);
    disconnect_cleanup(&world, &hub, &handle);
    info!(client = %id, "disconnected");
}

async fn write_loop(
    mut ws_tx: futures_util::stream::SplitSink<WebSocket, Message>,
    mut outbound_rx: tokio::sync::mpsc::Receiver<Arc<str>>,
    handle: Arc<ClientHandle>,
) {
    let mut ping = interval(Duration::from_secs(netc::PING_INTERVAL_SECS));
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let write_deadline = Duration::from_secs(netc::WRITE_DEADLINE_SECS);

    loop {
        tokio::select! {
            maybe = outbound_rx.recv() => {
                let Some(frame) = maybe else { break };
                let send = ws_tx.send(Message::Text(frame.to_string()));
                match timeout(write_deadline, send).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(client = %handle.id, "write failed: {e}");
                        break;
                    }
                    Err(_) => {
                        debug!(client = %handle.id, "write deadline blown");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                if timeout(write_deadline, ws_tx.send(Message::Ping(Vec::new())))
                    .await
                    .map_or(true, |r| r.is_err())
                {
                    break;
                }
            }
            _ = handle.kick.notified() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }
}

async fn read_loop(
    mut ws_rx: futures_util::stream::SplitStream<WebSocket>,
    world: &Arc<World>,
    hub: &Arc<Hub>,
    handle: &Arc<ClientHandle>,
) {
    let read_deadline = Duration::from_secs(netc::READ_DEADLINE_SECS);
    let rate_window = Duration::from_secs(1);
    let mut rate = RateWindow::new();

    loop {
        // Any inbound frame, pongs included, refreshes the deadline
        let frame = match timeout(read_deadline, ws_rx.next()).await {
            Err(_) => {
                debug!(client = %handle.id, "read deadline blown");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(client = %handle.id, "read failed: {e}");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                if text.len() > netc::MAX_FRAME_BYTES {
                    warn!(client = %handle.id, len = text.len(), "oversized frame, closing");
                    break;
                }
                if !rate.check(netc::MAX_MESSAGES_PER_SEC, rate_window) {
                    debug!(client = %handle.id, "message rate cap, dropping");
                    continue;
                }
                dispatch(world, hub, handle, &text);
            }
            Message::Close(_) => break,
            // Ping replies are generated by the socket layer; pongs only
            // matter for the deadline refresh above
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }
}

/// Decode and run one inbound frame. Malformed input is dropped silently;
/// a panicking handler is contained to the one message.
fn dispatch(world: &Arc<World>, hub: &Arc<Hub>, handle: &Arc<ClientHandle>, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(client = %handle.id, "undecodable message: {e}");
            return;
        }
    };

    let ctx = CommandContext {
        world,
        hub,
        client: handle,
    };
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| handle_message(&ctx, msg)));
    if let Err(panic) = result {
        warn!(client = %handle.id, "handler panicked: {panic:?}");
    }
}

/// Free the slot of a departing human and tell everyone the new rosters
fn disconnect_cleanup(world: &Arc<World>, hub: &Arc<Hub>, handle: &Arc<ClientHandle>) {
    let counts = {
        let mut state = world.state.write();
        if let Some(slot) = handle.slot() {
            if slot < state.players.len()
                && state.players[slot].owner_client == Some(handle.id)
                && !state.players[slot].is_bot
            {
                state.players[slot].free();
            }
        }
        TeamCounts::from_state(&state)
    };
    // World lock is released; the hub channel send never blocks
    hub.send(Target::All, ServerMessage::TeamUpdate(counts));
}
