use std::io;

use crate::net::{CodecError, FrameError, Status, WorkError};

#[derive(Debug, thiserror::Error)]
/// The single error returned by the RPC client.
///
/// Raw transport failures never escape the client, they are always wrapped
/// in one of these variants.
pub enum TransportError {
    #[error("{0}")]
    /// The remote work executor raised a work error.
    ///
    /// Carries the same kind and message as raised remotely.
    Work(#[from] WorkError),

    #[error("Remote failure: {0}")]
    /// The remote node failed to process the request for any other reason.
    Remote(Status),

    #[error("Unknown response received: {0}")]
    /// The remote node replied with a response kind this version does not know.
    UnknownResponse(i32),

    #[error("Unknown peer: {0}")]
    /// No address is registered for the target peer.
    UnknownPeer(String),

    #[error("Invalid peer address {address:?}: {reason}")]
    /// The peer address is not a resolvable `host:port` pair.
    InvalidAddress { address: String, reason: String },

    #[error("IO Error: {0}")]
    /// Connecting, writing or reading failed.
    Io(#[from] io::Error),

    #[error("The operation took too long to be completed.")]
    /// The configured timeout elapsed before the exchange completed.
    Timeout,

    #[error("Codec Error: {0}")]
    /// A value could not be encoded or decoded.
    Codec(#[from] CodecError),
}

impl TransportError {
    #[inline]
    /// Returns the work error if this failure was raised by the remote executor.
    pub fn as_work_error(&self) -> Option<&WorkError> {
        match self {
            Self::Work(error) => Some(error),
            _ => None,
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Io(e) => Self::Io(e),
            FrameError::Codec(e) => Self::Codec(e),
            FrameError::UnknownResponse(opcode) => Self::UnknownResponse(opcode),
        }
    }
}

#[derive(Debug, thiserror::Error)]
/// A failure produced while handling a request on the receiving node.
pub enum HandlerError {
    #[error("{0}")]
    /// Returned to the caller as a work error response.
    Work(#[from] WorkError),

    #[error("{0}")]
    /// Returned to the caller as a generic error response.
    Generic(#[from] Status),
}
