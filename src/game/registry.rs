//! Live connection registry and outbound fan-out

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ws::protocol::{encode_server_msg, Frame, ServerMsg};

/// Per-connection outbound buffer (frames)
pub const OUTBOUND_BUFFER: usize = 64;

/// Sending half of a connection's writer channel
pub type Outbound = mpsc::Sender<Frame>;

/// Outbound channels of every open connection, in connect order
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<Uuid, Outbound>,
    order: Vec<Uuid>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Uuid, outbound: Outbound) {
        if self.connections.insert(id, outbound).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: &Uuid) -> bool {
        let removed = self.connections.remove(id).is_some();
        if removed {
            self.order.retain(|open| open != id);
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send to one connection
    pub fn send_to(&mut self, id: &Uuid, msg: &ServerMsg) {
        let Some(frame) = encode(msg) else { return };
        let lagging = match self.connections.get(id) {
            Some(outbound) => deliver(id, outbound, frame) == Delivery::Lagging,
            None => false,
        };
        if lagging {
            self.evict(id);
        }
    }

    /// Send to every connection
    pub fn broadcast(&mut self, msg: &ServerMsg) {
        self.broadcast_filtered(msg, |_| true);
    }

    /// Send to every connection except `skip`
    pub fn broadcast_except(&mut self, skip: &Uuid, msg: &ServerMsg) {
        self.broadcast_filtered(msg, |id| id != skip);
    }

    fn broadcast_filtered(&mut self, msg: &ServerMsg, include: impl Fn(&Uuid) -> bool) {
        if self.connections.is_empty() {
            return;
        }
        let Some(frame) = encode(msg) else { return };

        let mut lagging = Vec::new();
        for id in self.order.iter().filter(|id| include(id)) {
            if let Some(outbound) = self.connections.get(id) {
                if deliver(id, outbound, frame.clone()) == Delivery::Lagging {
                    lagging.push(*id);
                }
            }
        }
        for id in &lagging {
            self.evict(id);
        }
    }

    /// Drop a connection whose buffer is full.
    ///
    /// Event frames are not repeated by later syncs, so a client that missed
    /// one is out of date. Dropping the sender ends its writer task, which
    /// closes the socket; the client reconnects and starts from a fresh `init`.
    fn evict(&mut self, id: &Uuid) {
        if self.remove(id) {
            warn!(player_id = %id, "Client lagging, closing connection");
        }
    }
}

fn encode(msg: &ServerMsg) -> Option<Frame> {
    match encode_server_msg(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!(error = %e, "Failed to encode server message");
            None
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Queued,
    Closed,
    Lagging,
}

/// Queue a frame without blocking; closed connections are skipped
fn deliver(id: &Uuid, outbound: &Outbound, frame: Frame) -> Delivery {
    if outbound.is_closed() {
        debug!(player_id = %id, "Skipping send to closed connection");
        return Delivery::Closed;
    }

    match outbound.try_send(frame) {
        Ok(()) => Delivery::Queued,
        Err(TrySendError::Full(_)) => Delivery::Lagging,
        Err(TrySendError::Closed(_)) => {
            debug!(player_id = %id, "Connection closed during send");
            Delivery::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn recv_type(rx: &mut mpsc::Receiver<Frame>) -> Option<String> {
        let frame = rx.try_recv().ok()?;
        let value: Value = serde_json::from_str(&frame).unwrap();
        value["type"].as_str().map(str::to_string)
    }

    #[tokio::test]
    async fn broadcast_except_skips_one_connection() {
        let mut registry = ConnectionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = mpsc::channel(OUTBOUND_BUFFER);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOUND_BUFFER);
        registry.insert(a, tx_a);
        registry.insert(b, tx_b);

        registry.broadcast_except(&a, &ServerMsg::PlayerLeft { id: Uuid::new_v4() });

        assert_eq!(recv_type(&mut rx_a), None);
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("player_left"));
    }

    #[tokio::test]
    async fn closed_connections_do_not_break_broadcast() {
        let mut registry = ConnectionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, rx_a) = mpsc::channel(OUTBOUND_BUFFER);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOUND_BUFFER);
        registry.insert(a, tx_a);
        registry.insert(b, tx_b);
        drop(rx_a);

        registry.broadcast(&ServerMsg::PlayerLeft { id: a });
        assert_eq!(recv_type(&mut rx_b).as_deref(), Some("player_left"));
    }

    #[tokio::test]
    async fn full_buffer_evicts_instead_of_dropping_events() {
        let mut registry = ConnectionRegistry::new();
        let (slow, fast) = (Uuid::new_v4(), Uuid::new_v4());
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(OUTBOUND_BUFFER);
        registry.insert(slow, slow_tx);
        registry.insert(fast, fast_tx);

        registry.send_to(&slow, &ServerMsg::PlayerLeft { id: fast });
        registry.broadcast(&ServerMsg::PlayerLeft { id: slow });

        // The queued frame is still readable, then the channel ends
        assert!(recv_type(&mut slow_rx).is_some());
        assert!(matches!(
            slow_rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));

        // Other connections keep receiving
        assert_eq!(recv_type(&mut fast_rx).as_deref(), Some("player_left"));
        registry.broadcast(&ServerMsg::PlayerLeft { id: slow });
        assert_eq!(recv_type(&mut fast_rx).as_deref(), Some("player_left"));
        assert!(!registry.remove(&slow));
    }

    #[test]
    fn remove_forgets_connection() {
        let mut registry = ConnectionRegistry::new();
        let id = Uuid::new_v4();
        let (tx, _rx) = mpsc::channel(1);
        registry.insert(id, tx);
        assert!(!registry.is_empty());
        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }
}
