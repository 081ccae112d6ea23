use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use rkyv::{Archive, Deserialize, Serialize};

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Clone, PartialEq, Eq)]
#[archive(compare(PartialEq), check_bytes)]
#[archive_attr(derive(PartialEq, Eq, Debug))]
/// Status information around the cause of a request failing.
///
/// This is the generic failure carried across the wire; it includes a
/// generic status code and a best-effort message.
pub struct Status {
    /// The generic error code of the request.
    pub code: ErrorCode,
    /// The display message for the error.
    pub message: String,
}

impl Status {
    /// The receiver does not know the command it was sent.
    pub fn unknown_command(opcode: i32) -> Self {
        Self {
            code: ErrorCode::UnknownCommand,
            message: format!("Unknown command received: {opcode}"),
        }
    }

    /// An internal error occurred while processing the request.
    pub fn internal(msg: impl Display) -> Self {
        Self {
            code: ErrorCode::InternalError,
            message: msg.to_string(),
        }
    }

    /// The provided arguments are invalid or unable to be deserialized
    /// by the node processing them.
    pub fn invalid(msg: impl Display) -> Self {
        Self {
            code: ErrorCode::InvalidPayload,
            message: msg.to_string(),
        }
    }

    /// The connection is closed or interrupted during the operation.
    pub fn connection(msg: impl Display) -> Self {
        Self {
            code: ErrorCode::ConnectionError,
            message: msg.to_string(),
        }
    }

    /// The operation took too long to be completed and was aborted.
    pub fn timeout() -> Self {
        Self {
            code: ErrorCode::Timeout,
            message: "The operation took too long to be completed.".to_string(),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Status")
            .field("code", &self.code)
            .field("message", &self.message)
            .finish()
    }
}

impl Error for Status {}

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Copy, Clone, PartialEq, Eq, Debug)]
#[archive(compare(PartialEq), check_bytes)]
#[archive_attr(derive(Debug, PartialEq, Eq))]
/// A generic error code describing the high level reason why the request failed.
pub enum ErrorCode {
    /// The receiver does not recognise the opcode of the request.
    UnknownCommand,
    /// An internal error occurred while processing the request.
    InternalError,
    /// The provided arguments are invalid or unable to be deserialized
    /// by the node processing them.
    InvalidPayload,
    /// The connection is closed or interrupted during the operation.
    ConnectionError,
    /// The operation took too long to be completed and was aborted.
    Timeout,
}

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Clone, PartialEq, Eq)]
#[archive(compare(PartialEq), check_bytes)]
#[archive_attr(derive(PartialEq, Eq, Debug))]
/// A failure raised by a work executor while accepting or running a work unit.
///
/// Unlike [Status], a work error is returned to the remote caller exactly as
/// it was raised so the caller can branch on its [WorkErrorKind].
pub struct WorkError {
    /// The kind of work failure.
    pub kind: WorkErrorKind,
    /// The display message for the error.
    pub message: String,
}

impl WorkError {
    pub fn new(kind: WorkErrorKind, msg: impl Display) -> Self {
        Self {
            kind,
            message: msg.to_string(),
        }
    }

    /// The executor refused to accept the work.
    pub fn rejected(msg: impl Display) -> Self {
        Self::new(WorkErrorKind::Rejected, msg)
    }

    /// The work was accepted but did not complete successfully.
    pub fn completed(msg: impl Display) -> Self {
        Self::new(WorkErrorKind::Completed, msg)
    }

    /// The work was not started within its start timeout.
    pub fn start_timed_out(msg: impl Display) -> Self {
        Self::new(WorkErrorKind::StartTimedOut, msg)
    }

    /// The executor failed internally.
    pub fn internal(msg: impl Display) -> Self {
        Self::new(WorkErrorKind::Internal, msg)
    }
}

impl Display for WorkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Work {:?}: {}", self.kind, self.message)
    }
}

impl Debug for WorkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl Error for WorkError {}

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Copy, Clone, PartialEq, Eq, Debug)]
#[archive(compare(PartialEq), check_bytes)]
#[archive_attr(derive(Debug, PartialEq, Eq))]
pub enum WorkErrorKind {
    /// The work was rejected by the executor.
    Rejected,
    /// The work was accepted but failed while running.
    Completed,
    /// The work could not be started in time.
    StartTimedOut,
    /// The executor itself failed.
    Internal,
}
