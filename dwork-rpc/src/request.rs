use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;

use crate::net::Status;
use crate::protocol::RequestKind;
use crate::value::{Value, WorkUnit};

/// A decoded request along with the address of the peer that sent it.
///
/// The number of arguments always matches [RequestKind::num_parameters],
/// requests which do not are answered by the server before reaching a handler.
pub struct Request {
    pub(crate) remote_addr: SocketAddr,
    pub(crate) kind: RequestKind,
    pub(crate) args: Vec<Value>,
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

impl Request {
    pub(crate) fn new(remote_addr: SocketAddr, kind: RequestKind, args: Vec<Value>) -> Self {
        Self {
            remote_addr,
            kind,
            args,
        }
    }

    #[inline]
    /// The command of the request.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    #[inline]
    /// The remote address of the incoming request.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[inline]
    /// The argument values in the order they were sent.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Gets the string argument at the given position.
    pub fn str_arg(&self, idx: usize) -> Result<&str, Status> {
        match self.arg(idx)? {
            Value::Str(v) => Ok(v.as_str()),
            other => Err(self.unexpected(idx, "string", other)),
        }
    }

    /// Gets the numeric argument at the given position.
    pub fn long_arg(&self, idx: usize) -> Result<i64, Status> {
        match self.arg(idx)? {
            Value::Long(v) => Ok(*v),
            other => Err(self.unexpected(idx, "long", other)),
        }
    }

    /// Takes the work unit argument at the given position out of the request.
    pub fn take_work(&mut self, idx: usize) -> Result<WorkUnit, Status> {
        let kind = self.kind;
        let slot = self.args.get_mut(idx).ok_or_else(|| missing(kind, idx))?;

        match std::mem::replace(slot, Value::Long(0)) {
            Value::Work(work) => Ok(work),
            other => {
                let status = unexpected(kind, idx, "work", &other);
                *slot = other;
                Err(status)
            },
        }
    }

    fn arg(&self, idx: usize) -> Result<&Value, Status> {
        self.args.get(idx).ok_or_else(|| missing(self.kind, idx))
    }

    fn unexpected(&self, idx: usize, expected: &str, value: &Value) -> Status {
        unexpected(self.kind, idx, expected, value)
    }
}

fn missing(kind: RequestKind, idx: usize) -> Status {
    Status::invalid(format!("{kind} is missing argument {idx}."))
}

fn unexpected(kind: RequestKind, idx: usize, expected: &str, value: &Value) -> Status {
    Status::invalid(format!(
        "{kind} expected a {expected} for argument {idx} but got a {}.",
        value.type_name(),
    ))
}

#[cfg(feature = "test-utils")]
impl Request {
    /// A test utility for creating a mocked request.
    ///
    /// This should be used for testing only.
    pub fn using_owned(kind: RequestKind, args: Vec<Value>) -> Self {
        use std::net::{Ipv4Addr, SocketAddrV4};

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from([127, 0, 0, 1]), 80));
        Self::new(addr, kind, args)
    }
}
