use std::collections::HashMap;
use std::sync::Arc;

use dwork_rpc::TransportError;
use parking_lot::RwLock;
use tracing::trace;

#[derive(Debug, Clone, Default)]
/// The set of known peers, mapping each peer id to its `host:port` address.
///
/// The registry is shared by the dispatcher, which applies JOIN and LEAVE,
/// and the client, which looks up the target of every outbound command.
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<String, String>>>,
}

impl PeerRegistry {
    /// Registers a peer, replacing any address it was previously known by.
    pub fn put(&self, peer_id: impl Into<String>, address: impl Into<String>) {
        let peer_id = peer_id.into();
        let address = address.into();
        trace!(peer_id = %peer_id, address = %address, "Register peer.");

        let mut guard = self.peers.write();
        guard.insert(peer_id, address);
    }

    /// Removes a peer from the registry.
    ///
    /// Returns the address the peer was registered with, if any.
    pub fn remove(&self, peer_id: &str) -> Option<String> {
        trace!(peer_id = %peer_id, "Remove peer.");

        let mut guard = self.peers.write();
        guard.remove(peer_id)
    }

    /// Gets the address of the given peer.
    pub fn lookup(&self, peer_id: &str) -> Result<String, TransportError> {
        let guard = self.peers.read();
        guard
            .get(peer_id)
            .cloned()
            .ok_or_else(|| TransportError::UnknownPeer(peer_id.to_string()))
    }

    /// A snapshot of every registered peer and its address.
    pub fn peers(&self) -> Vec<(String, String)> {
        let guard = self.peers.read();
        guard
            .iter()
            .map(|(id, addr)| (id.clone(), addr.clone()))
            .collect()
    }

    /// Whether the peer is currently registered.
    pub fn contains(&self, peer_id: &str) -> bool {
        self.peers.read().contains_key(peer_id)
    }

    /// The number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
