//! Per-socket reader and writer tasks.
//!
//! The reader classifies each frame once and posts it to the relay loop.
//! The writer drains the connection's outbound queue and pings on an
//! interval. Neither touches relay state.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use relay_core::{classify, RawFrame, Role};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::Connection;
use crate::relay_loop::RelayEvent;

/// Per-socket settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Outbound queue depth.
    pub send_queue: usize,
    /// Time between keep-alive pings.
    pub ping_interval: Duration,
}

/// Drive one upgraded socket until either side closes or `shutdown` fires.
pub async fn run_session(
    socket: WebSocket,
    role: Role,
    events: mpsc::Sender<RelayEvent>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (tx, mut rx) = mpsc::channel(config.send_queue.max(1));
    let conn = Connection::new(role, tx);
    let conn_id = conn.id().clone();
    info!(conn_id = %conn_id, role = %role, "websocket opened");

    if events.send(RelayEvent::Connected(conn.clone())).await.is_err() {
        warn!(conn_id = %conn_id, "relay loop is gone, dropping connection");
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_id = conn_id.clone();
    let ping_interval = config.ping_interval;
    let mut writer = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if ws_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if ws_tx.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                    trace!(conn_id = %writer_id, "sent ping");
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader_id = conn_id.clone();
    let reader_events = events.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            let raw = match frame {
                Ok(Message::Text(text)) => RawFrame::Text(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => RawFrame::Binary(data),
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_) | Message::Pong(_)) => continue,
                Err(e) => {
                    debug!(conn_id = %reader_id, error = %e, "websocket read error");
                    break;
                }
            };
            let event = RelayEvent::Inbound {
                sender: role,
                inbound: classify(raw),
            };
            if reader_events.send(event).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
        () = shutdown.cancelled() => {
            reader.abort();
            writer.abort();
        }
    }

    info!(conn_id = %conn_id, role = %role, "websocket closed");
    let _ = events.send(RelayEvent::Closed(conn)).await;
}
