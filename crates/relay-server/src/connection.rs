//! A connected WebSocket peer as the relay sees it.

use axum::extract::ws::Message;
use bytes::Bytes;
use relay_core::{ConnectionId, Role, SendFailure};
use tokio::sync::mpsc;

/// Handle to one socket's outbound queue.
///
/// Cheap to clone; clones share identity. The socket's writer task owns the
/// receiving end, so once the socket closes every clone reports closed.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    role: Role,
    tx: mpsc::Sender<Message>,
}

impl Connection {
    /// Wrap the sending half of a socket queue under a fresh id.
    pub fn new(role: Role, tx: mpsc::Sender<Message>) -> Self {
        Self::with_id(ConnectionId::new(), role, tx)
    }

    /// Like [`Connection::new`] with a caller-chosen id.
    pub fn with_id(id: ConnectionId, role: Role, tx: mpsc::Sender<Message>) -> Self {
        Self { id, role, tx }
    }

    /// Identity shared by every clone.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Role declared at handshake.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the writer task still holds the queue.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Same underlying socket.
    pub fn same_as(&self, other: &Connection) -> bool {
        self.id == other.id
    }

    /// Enqueue a message without waiting. A full queue drops the message.
    pub fn send(&self, message: Message) -> Result<(), SendFailure> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendFailure::Closed,
        })
    }

    /// Enqueue a text frame.
    pub fn send_text(&self, text: String) -> Result<(), SendFailure> {
        self.send(Message::Text(text.into()))
    }

    /// Enqueue a binary frame.
    pub fn send_binary(&self, data: Bytes) -> Result<(), SendFailure> {
        self.send(Message::Binary(data))
    }
}
