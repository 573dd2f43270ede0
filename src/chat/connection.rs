//! Connections and their outbound queues.

use tokio::sync::{mpsc, Mutex};

use super::user::User;
use crate::ChatError;

/// Server-generated connection identifier.
pub type ConnectionId = String;

/// Sending half of a connection's bounded outbound queue.
///
/// Enqueueing never waits: a closed or full queue is reported as a transport
/// failure, so a stalled recipient cannot hold up a broadcast.
#[derive(Debug, Clone)]
pub struct Outbound {
    sender: mpsc::Sender<String>,
}

impl Outbound {
    /// Wrap an existing sender.
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }

    /// Create a queue with room for `capacity` frames.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }

    /// Enqueue a serialized frame.
    pub fn send(&self, frame: &str) -> Result<(), ChatError> {
        self.sender
            .try_send(frame.to_owned())
            .map_err(|_| ChatError::TransportFailure)
    }

    /// Frames waiting to be written. A closed queue counts as empty.
    pub fn queued(&self) -> usize {
        if self.sender.is_closed() {
            return 0;
        }
        self.sender.max_capacity() - self.sender.capacity()
    }
}

/// Per-connection state, guarded by the connection state lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    /// Registered identity, if any.
    pub user: Option<User>,
    /// Cleared once teardown has begun detaching the connection.
    pub active: bool,
}

/// An accepted connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    outbound: Outbound,
    pub(crate) state: Mutex<SessionState>,
    /// Serializes this connection's own operations.
    pub(crate) ops: Mutex<()>,
}

impl Connection {
    pub(crate) fn new(id: ConnectionId, outbound: Outbound) -> Self {
        Self {
            id,
            outbound,
            state: Mutex::new(SessionState {
                user: None,
                active: true,
            }),
            ops: Mutex::new(()),
        }
    }

    /// Connection ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enqueue a serialized frame for this connection.
    pub fn deliver(&self, frame: &str) -> Result<(), ChatError> {
        self.outbound.send(frame)
    }

    /// Frames waiting in this connection's queue.
    pub fn queued(&self) -> usize {
        self.outbound.queued()
    }
}
