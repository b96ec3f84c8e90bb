//! The task that owns the [`RelayContext`].
//!
//! Socket tasks never touch relay state. They post [`RelayEvent`]s to one
//! queue and this loop applies them in arrival order.

use metrics::{counter, gauge};
use relay_core::{Inbound, Role};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL};
use crate::registry::Occupancy;
use crate::router::{DeliveryBatch, RelayContext};

/// Everything a socket task reports to the relay loop.
#[derive(Debug)]
pub enum RelayEvent {
    /// A socket finished its handshake.
    Connected(Connection),
    /// A classified frame from a connected socket.
    Inbound {
        /// Role of the sending socket.
        sender: Role,
        /// The classified frame.
        inbound: Inbound,
    },
    /// A socket went away.
    Closed(Connection),
}

/// What the HTTP side may observe without going through the loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RelaySnapshot {
    /// Which roles are connected.
    pub occupancy: Occupancy,
    /// Whether AI detections drive the robot.
    pub ai_control_enabled: bool,
}

impl RelaySnapshot {
    fn of(ctx: &RelayContext) -> Self {
        Self {
            occupancy: ctx.registry().occupancy(),
            ai_control_enabled: ctx.ai_control_enabled(),
        }
    }
}

/// Cloneable handle to a running relay loop.
#[derive(Clone, Debug)]
pub struct RelayHandle {
    events: mpsc::Sender<RelayEvent>,
    snapshot: watch::Receiver<RelaySnapshot>,
}

impl RelayHandle {
    /// Queue consumed by the loop.
    pub fn events(&self) -> &mpsc::Sender<RelayEvent> {
        &self.events
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> RelaySnapshot {
        *self.snapshot.borrow()
    }

    /// Receiver notified whenever the snapshot changes.
    pub fn watch(&self) -> watch::Receiver<RelaySnapshot> {
        self.snapshot.clone()
    }
}

/// Start the relay loop with a fresh context.
pub fn spawn_relay(queue: usize, shutdown: CancellationToken) -> (RelayHandle, JoinHandle<()>) {
    let (events, rx) = mpsc::channel(queue.max(1));
    let (snapshot_tx, snapshot) = watch::channel(RelaySnapshot::default());
    let task = tokio::spawn(run(RelayContext::new(), rx, snapshot_tx, shutdown));
    (RelayHandle { events, snapshot }, task)
}

async fn run(
    mut ctx: RelayContext,
    mut rx: mpsc::Receiver<RelayEvent>,
    snapshot: watch::Sender<RelaySnapshot>,
    shutdown: CancellationToken,
) {
    info!("relay loop started");
    loop {
        let event = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        let _ = apply(&mut ctx, event);

        let next = RelaySnapshot::of(&ctx);
        let _ = snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
    info!("relay loop stopped");
}

/// Apply one event to the context.
pub fn apply(ctx: &mut RelayContext, event: RelayEvent) -> DeliveryBatch {
    match event {
        RelayEvent::Connected(conn) => {
            counter!(WS_CONNECTIONS_TOTAL, "role" => conn.role().as_str()).increment(1);
            let batch = ctx.connect(conn);
            record_active(ctx);
            batch
        }
        RelayEvent::Inbound { sender, inbound } => ctx.route(inbound, sender),
        RelayEvent::Closed(conn) => {
            let batch = ctx.disconnect(&conn);
            record_active(ctx);
            debug!(conn_id = %conn.id(), deliveries = batch.len(), "close handled");
            batch
        }
    }
}

fn record_active(ctx: &RelayContext) {
    let occ = ctx.registry().occupancy();
    let active = usize::from(occ.robot) + usize::from(occ.camera) + usize::from(occ.ai) + occ.ui;
    gauge!(WS_CONNECTIONS_ACTIVE).set(active as f64);
}
