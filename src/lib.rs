//! # Dwork
//! Forward work units between a cluster of peer work executors.
//!
//! This is a convenience package which includes all of the sub-projects within
//! Dwork:
//!
//! ### Features
//! - `dwork_rpc` - The connection-per-call wire protocol, client and server.
//! - `dwork_node` - Peer membership, work forwarding and capacity notifications.

#[cfg(feature = "dwork-node")]
pub use dwork_node as node;
#[cfg(feature = "dwork-rpc")]
pub use dwork_rpc as rpc;
