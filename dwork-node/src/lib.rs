//! # Dwork Node
//!
//! Peer membership, work forwarding and capacity notifications for a cluster
//! of work executors, built ontop of `dwork-rpc`.
//!
//! A node starts its RPC server, announces itself to every statically
//! configured peer and from then on tracks peers joining and leaving.
//! Work can be forwarded to any known peer through the [TransportClient].

mod capacity;
mod error;
mod executor;
mod listener;
mod registry;
mod rpc;
mod statistics;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub use capacity::{CapacityCache, Delta, DeltaCounts, PeerCapacity};
use dwork_rpc::{RpcClient, Server};
use rpc::DispatchService;
pub use error::NodeError;
pub use executor::WorkExecutor;
use futures::future;
pub use listener::NotificationListener;
pub use registry::PeerRegistry;
pub use rpc::{TransportClient, PING_UNREACHABLE};
pub use statistics::TransportStatistics;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Build a dwork node using provided settings.
pub struct DworkNodeBuilder {
    node_id: String,
    connection_cfg: ConnectionConfig,
    executor: Arc<dyn WorkExecutor>,
    listeners: Vec<Arc<dyn NotificationListener>>,
}

impl DworkNodeBuilder {
    /// Create a new node builder.
    pub fn new(
        node_id: impl Into<String>,
        connection_cfg: ConnectionConfig,
        executor: impl WorkExecutor,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            connection_cfg,
            executor: Arc::new(executor),
            listeners: Vec::new(),
        }
    }

    /// Registers a listener which is notified of membership and capacity
    /// changes sent by peers.
    pub fn with_listener(mut self, listener: impl NotificationListener) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Starts the node, announcing it to every peer in the static peer table.
    ///
    /// Listeners are told each peer of the static peer table has joined
    /// before any announcement is sent.
    ///
    /// The `node_id` **must be unique** among live nodes, peers replace any
    /// previous address registered under the same id.
    ///
    /// Peers do not need to be live at the time of connecting, failing to
    /// announce the node to a peer is logged and otherwise ignored.
    pub async fn connect(self) -> Result<DworkNode, NodeError> {
        if self.node_id.is_empty() {
            return Err(NodeError::Config("Node id must not be empty.".to_string()));
        }

        let node_id: Arc<str> = Arc::from(self.node_id);
        let public_addr = self.connection_cfg.public_addr.to_string();

        let statistics = TransportStatistics::default();
        let capacity = CapacityCache::default();
        let registry = PeerRegistry::default();
        for (peer_id, address) in self.connection_cfg.peers {
            if peer_id == node_id.as_ref() {
                continue;
            }

            capacity.insert_peer(&peer_id);
            for listener in self.listeners.iter() {
                listener.join(&peer_id);
            }
            registry.put(peer_id, address);
        }

        let rpc = match self.connection_cfg.timeout {
            Some(timeout) => RpcClient::with_timeout(timeout),
            None => RpcClient::new(),
        };
        let client = TransportClient::new(
            node_id.clone(),
            registry.clone(),
            self.executor.clone(),
            rpc,
            statistics.clone(),
        );

        let service = DispatchService::new(
            node_id.clone(),
            registry.clone(),
            capacity.clone(),
            self.executor,
            Arc::from(self.listeners),
            statistics.clone(),
        );
        let workers = self.connection_cfg.runtime.unwrap_or_else(Handle::current);
        let rpc_server = Server::listen_with_workers(
            self.connection_cfg.listen_addr,
            service,
            workers,
            self.connection_cfg.timeout,
        )
        .await?;

        announce(&client, &registry, &public_addr).await;

        info!(
            node_id = %node_id,
            listen_addr = %rpc_server.local_addr(),
            public_addr = %public_addr,
            num_peers = registry.len(),
            "Dwork node started."
        );

        Ok(DworkNode {
            rpc_server,
            handle: DworkHandle {
                node_id,
                client,
                registry,
                capacity,
                statistics,
            },
        })
    }
}

#[derive(Debug, Clone)]
/// Configuration for the node network.
pub struct ConnectionConfig {
    /// The binding address for the RPC server to bind and listen on.
    ///
    /// This is often `0.0.0.0` + your chosen port.
    pub listen_addr: SocketAddr,

    /// The public address announced to peers when joining.
    ///
    /// This is normally the machine's public IP address and the port the server is listening on.
    pub public_addr: SocketAddr,

    /// The static peer table, pairs of peer id and `host:port` address.
    ///
    /// The node joins every peer in this table when it starts.
    pub peers: Vec<(String, String)>,

    /// The runtime accepted connections are handled on.
    ///
    /// Defaults to the runtime the node is started on.
    pub runtime: Option<Handle>,

    /// The time allowed for connecting to a peer and for each exchange.
    ///
    /// The RPC server also allows peers this long to send their request.
    /// Defaults to no timeout.
    pub timeout: Option<Duration>,
}

impl ConnectionConfig {
    /// Creates a new connection config.
    pub fn new(
        listen_addr: SocketAddr,
        public_addr: SocketAddr,
        peers: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            listen_addr,
            public_addr,
            peers: peers
                .into_iter()
                .map(|(id, addr)| (id.into(), addr.into()))
                .collect(),
            runtime: None,
            timeout: None,
        }
    }

    /// Set the runtime accepted connections are handled on.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set the timeout applied to every outbound command and inbound request read.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub struct DworkNode {
    rpc_server: Server,
    handle: DworkHandle,
}

impl DworkNode {
    /// Tells every known peer the node is leaving and stops the RPC server.
    pub async fn shutdown(self) {
        let peers = self.handle.registry.peers();
        let client = &self.handle.client;
        let tasks = peers.iter().map(|(peer_id, _)| async move {
            if let Err(e) = client.leave(peer_id).await {
                warn!(
                    node_id = %client.node_id(),
                    target_node_id = %peer_id,
                    error = ?e,
                    "Failed to notify peer of leaving."
                );
            }
        });
        future::join_all(tasks).await;

        info!(
            node_id = %self.handle.node_id,
            num_peers = peers.len(),
            "Dwork node is shutting down."
        );
        self.rpc_server.shutdown().await;
    }

    #[inline]
    /// The address the RPC server is bound to.
    pub fn listen_addr(&self) -> SocketAddr {
        self.rpc_server.local_addr()
    }

    #[inline]
    /// Creates a handle to the node providing the core functionality of the node.
    pub fn handle(&self) -> DworkHandle {
        self.handle.clone()
    }
}

impl std::ops::Deref for DworkNode {
    type Target = DworkHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

#[derive(Clone)]
pub struct DworkHandle {
    node_id: Arc<str>,
    client: TransportClient,
    registry: PeerRegistry,
    capacity: CapacityCache,
    statistics: TransportStatistics,
}

impl DworkHandle {
    #[inline]
    /// The unique id of the node.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    #[inline]
    /// Get access to the client used to send commands to peers.
    pub fn client(&self) -> &TransportClient {
        &self.client
    }

    #[inline]
    /// Get access to the currently known peers.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    #[inline]
    /// Get access to the cached capacity of each peer.
    pub fn capacity(&self) -> &CapacityCache {
        &self.capacity
    }

    #[inline]
    /// Gets the live transport statistics.
    pub fn statistics(&self) -> TransportStatistics {
        self.statistics.clone()
    }

    /// Registers a peer without it having joined this node.
    pub fn add_peer(&self, peer_id: impl Into<String>, address: impl Into<String>) {
        let peer_id = peer_id.into();
        self.capacity.insert_peer(&peer_id);
        self.registry.put(peer_id, address);
    }

    /// Removes a peer along with its cached capacity.
    pub fn remove_peer(&self, peer_id: &str) {
        self.registry.remove(peer_id);
        self.capacity.remove_peer(peer_id);
    }
}

/// Sends JOIN to every peer in the registry.
async fn announce(client: &TransportClient, registry: &PeerRegistry, public_addr: &str) {
    let peers = registry.peers();
    let tasks = peers.iter().map(|(peer_id, address)| async move {
        if let Err(e) = client.join(peer_id, public_addr).await {
            warn!(
                node_id = %client.node_id(),
                target_node_id = %peer_id,
                target_addr = %address,
                error = ?e,
                "Failed to join peer."
            );
        }
    });

    future::join_all(tasks).await;
}
