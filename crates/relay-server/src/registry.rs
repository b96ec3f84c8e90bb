//! Role-indexed registry of live connections.

use relay_core::Role;
use serde::Serialize;
use tracing::{debug, info};

use crate::connection::Connection;

/// Which roles are currently connected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    /// A robot is registered.
    pub robot: bool,
    /// A camera is registered.
    pub camera: bool,
    /// An inference worker is registered.
    pub ai: bool,
    /// Number of connected UIs.
    pub ui: usize,
}

impl Occupancy {
    /// Whether at least one connection of `role` is registered.
    pub fn is_connected(&self, role: Role) -> bool {
        match role {
            Role::Robot => self.robot,
            Role::Camera => self.camera,
            Role::Ai => self.ai,
            Role::Ui => self.ui > 0,
            Role::Unknown => false,
        }
    }
}

/// One slot per singleton role plus the set of UI observers.
///
/// Owned by the relay loop; no interior locking.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    robot: Option<Connection>,
    camera: Option<Connection>,
    ai: Option<Connection>,
    ui: Vec<Connection>,
}

impl ConnectionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, role: Role) -> Option<&mut Option<Connection>> {
        match role {
            Role::Robot => Some(&mut self.robot),
            Role::Camera => Some(&mut self.camera),
            Role::Ai => Some(&mut self.ai),
            Role::Ui | Role::Unknown => None,
        }
    }

    /// Store a connection under its role.
    ///
    /// Singleton roles overwrite the slot and return the replaced
    /// connection, which is left open. UI connections are appended unless
    /// already present. `Unknown` connections are not stored.
    pub fn register(&mut self, conn: Connection) -> Option<Connection> {
        let role = conn.role();
        if let Some(slot) = self.slot_mut(role) {
            let replaced = slot.replace(conn);
            if let Some(old) = &replaced {
                info!(role = %role, replaced = %old.id(), "singleton slot replaced");
            }
            return replaced;
        }
        if role == Role::Ui {
            if self.ui.iter().any(|c| c.same_as(&conn)) {
                debug!(conn_id = %conn.id(), "ui connection already registered");
            } else {
                self.ui.push(conn);
            }
        }
        None
    }

    /// Remove a connection. A singleton slot is only cleared if it still
    /// holds this exact connection, so a late close from a replaced socket
    /// cannot evict its successor. Returns whether anything was removed.
    pub fn deregister(&mut self, conn: &Connection) -> bool {
        let role = conn.role();
        if let Some(slot) = self.slot_mut(role) {
            if slot.as_ref().is_some_and(|current| current.same_as(conn)) {
                *slot = None;
                return true;
            }
            if let Some(current) = slot.as_ref() {
                debug!(
                    role = %role,
                    closing = %conn.id(),
                    current = %current.id(),
                    "ignoring close from replaced connection"
                );
            }
            return false;
        }
        if role == Role::Ui {
            let before = self.ui.len();
            self.ui.retain(|c| !c.same_as(conn));
            return self.ui.len() != before;
        }
        false
    }

    /// Current connection in a singleton slot.
    pub fn singleton(&self, role: Role) -> Option<&Connection> {
        match role {
            Role::Robot => self.robot.as_ref(),
            Role::Camera => self.camera.as_ref(),
            Role::Ai => self.ai.as_ref(),
            Role::Ui | Role::Unknown => None,
        }
    }

    /// Singleton connection only if its socket is still open.
    pub fn open_singleton(&self, role: Role) -> Option<&Connection> {
        self.singleton(role).filter(|c| c.is_open())
    }

    /// Registered UIs, in join order.
    pub fn ui(&self) -> &[Connection] {
        &self.ui
    }

    /// All connections registered under `role`, possibly none.
    pub fn lookup(&self, role: Role) -> Vec<&Connection> {
        match role {
            Role::Ui => self.ui.iter().collect(),
            other => self.singleton(other).into_iter().collect(),
        }
    }

    /// Current presence per role.
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            robot: self.robot.is_some(),
            camera: self.camera.is_some(),
            ai: self.ai.is_some(),
            ui: self.ui.len(),
        }
    }
}
