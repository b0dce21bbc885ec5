//! In-process loopback transport
//!
//! Every connected peer owns an inbox. Sending appends an encoded datagram to the
//! recipient's inbox; receiving pops from the caller's own inbox in arrival order.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::{NetError, PeerId};

/// Bytes delivered to a peer together with the sender
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub from: PeerId,
    pub bytes: Vec<u8>,
}

/// Reliable, ordered, in-memory message routing between peers
#[derive(Debug, Default)]
pub struct LoopbackHub {
    inboxes: HashMap<PeerId, VecDeque<Datagram>>,
    /// Total bytes routed, for diagnostics
    pub bytes_sent: u64,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer so it can send and receive
    pub fn connect(&mut self, peer: PeerId) {
        self.inboxes.entry(peer).or_default();
        debug!("Peer {} connected to loopback", peer);
    }

    /// Remove a peer and drop its undelivered messages
    pub fn disconnect(&mut self, peer: PeerId) {
        if let Some(inbox) = self.inboxes.remove(&peer) {
            if !inbox.is_empty() {
                warn!("Peer {} disconnected with {} undelivered messages", peer, inbox.len());
            }
        }
    }

    pub fn is_connected(&self, peer: PeerId) -> bool {
        self.inboxes.contains_key(&peer)
    }

    /// Connected peers, in no particular order
    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.inboxes.keys().copied()
    }

    /// Queue bytes for delivery to `to`
    pub fn send(&mut self, from: PeerId, to: PeerId, bytes: Vec<u8>) -> Result<(), NetError> {
        let inbox = self.inboxes.get_mut(&to).ok_or(NetError::UnknownPeer(to))?;
        self.bytes_sent += bytes.len() as u64;
        inbox.push_back(Datagram { from, bytes });
        Ok(())
    }

    /// Queue the same bytes for every connected peer except the sender
    pub fn broadcast(&mut self, from: PeerId, bytes: &[u8]) {
        for (peer, inbox) in self.inboxes.iter_mut() {
            if *peer == from {
                continue;
            }
            self.bytes_sent += bytes.len() as u64;
            inbox.push_back(Datagram {
                from,
                bytes: bytes.to_vec(),
            });
        }
    }

    /// Pop the oldest datagram addressed to `peer`
    pub fn recv(&mut self, peer: PeerId) -> Option<Datagram> {
        self.inboxes.get_mut(&peer)?.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_receive_in_order() {
        let mut hub = LoopbackHub::new();
        let server = PeerId::new();
        let client = PeerId::new();
        hub.connect(server);
        hub.connect(client);

        hub.send(client, server, vec![1]).unwrap();
        hub.send(client, server, vec![2]).unwrap();

        assert_eq!(hub.recv(server).map(|d| d.bytes), Some(vec![1]));
        let second = hub.recv(server).unwrap();
        assert_eq!(second.bytes, vec![2]);
        assert_eq!(second.from, client);
        assert!(hub.recv(server).is_none());
        assert_eq!(hub.bytes_sent, 2);
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let mut hub = LoopbackHub::new();
        let server = PeerId::new();
        hub.connect(server);
        let result = hub.send(server, PeerId::new(), vec![0]);
        assert!(matches!(result, Err(NetError::UnknownPeer(_))));
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let mut hub = LoopbackHub::new();
        let server = PeerId::new();
        let a = PeerId::new();
        let b = PeerId::new();
        for peer in [server, a, b] {
            hub.connect(peer);
        }

        hub.broadcast(server, &[9]);
        assert!(hub.recv(server).is_none());
        assert!(hub.recv(a).is_some());
        assert!(hub.recv(b).is_some());

        hub.disconnect(b);
        assert!(!hub.is_connected(b));
        assert_eq!(hub.peers().count(), 2);
    }
}
