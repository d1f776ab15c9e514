//! Outbound message routing to connection tasks.

use std::collections::HashMap;

use protocol::{ConnId, ServerMessage};
use tokio::sync::mpsc::Sender;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Per-connection outbound channels. Each connection task owns the receiving
/// half and writes frames to its socket in order.
///
/// Channels are bounded: a client that stops reading loses messages once its
/// queue is full instead of growing it without limit.
#[derive(Debug, Default)]
pub struct Outbox {
    links: HashMap<ConnId, Sender<ServerMessage>>,
}

impl Outbox {
    pub fn link(&mut self, id: ConnId, tx: Sender<ServerMessage>) {
        self.links.insert(id, tx);
    }

    pub fn unlink(&mut self, id: ConnId) {
        self.links.remove(&id);
    }

    /// Queue `msg` for one connection. Returns `false` if it was dropped.
    pub fn send(&self, to: ConnId, msg: ServerMessage) -> bool {
        let Some(tx) = self.links.get(&to) else {
            return false;
        };
        deliver(to, tx, msg)
    }

    pub fn broadcast(&self, ids: &[ConnId], msg: &ServerMessage) {
        for &id in ids {
            self.send(id, msg.clone());
        }
    }

    pub fn broadcast_except(&self, ids: &[ConnId], except: ConnId, msg: &ServerMessage) {
        for &id in ids.iter().filter(|id| **id != except) {
            self.send(id, msg.clone());
        }
    }

    /// Send to every linked connection.
    pub fn broadcast_all(&self, msg: &ServerMessage) {
        for (&id, tx) in &self.links {
            deliver(id, tx, msg.clone());
        }
    }
}

fn deliver(to: ConnId, tx: &Sender<ServerMessage>, msg: ServerMessage) -> bool {
    match tx.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(msg)) => {
            debug!("Outbound queue full for connection {}, dropping {}", to, msg.event());
            false
        }
        Err(TrySendError::Closed(msg)) => {
            debug!("Dropping {} for closed connection {}", msg.event(), to);
            false
        }
    }
}
