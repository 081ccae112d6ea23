//! # Dwork RPC
//!
//! A small, connection-per-call RPC transport used to forward work units and
//! capacity notifications between peer nodes.
//!
//! Every exchange opens a fresh TCP connection, writes exactly one framed
//! request, reads exactly one framed response and closes the connection.
//!
//! ```text
//! request:  [opcode: i32][declared params: i32][value]*
//! response: [opcode: i32][declared params: i32][payload]
//! ```
//!
//! Integers are big-endian. Argument and error values use a versioned,
//! checksummed rkyv envelope, see [MAX_VALUE_SIZE].

#[macro_use]
extern crate tracing;

mod client;
mod error;
mod handler;
mod net;
mod protocol;
mod request;
mod server;
mod value;

/// The scratch space used when archiving values.
pub const SCRATCH_SPACE: usize = 4096;

/// The maximum size of a single archived value in bytes.
pub const MAX_VALUE_SIZE: usize = 64 << 20;

/// The maximum number of argument values a single request may declare.
pub const MAX_PARAMETERS: usize = 16;

/// The version tag written ahead of every archived value.
pub const VALUE_FORMAT_VERSION: u8 = 1;

pub use async_trait::async_trait;
pub use client::RpcClient;
pub use error::{HandlerError, TransportError};
pub use handler::{Handler, Reply};
pub use net::{
    ArchivedErrorCode,
    ArchivedStatus,
    ArchivedWorkError,
    ArchivedWorkErrorKind,
    CodecError,
    ErrorCode,
    Status,
    WorkError,
    WorkErrorKind,
};
pub use protocol::{RequestKind, Response, ResponseKind};
pub use request::Request;
pub use server::Server;
pub use value::{ArchivedValue, ArchivedWorkUnit, Value, WorkUnit};
