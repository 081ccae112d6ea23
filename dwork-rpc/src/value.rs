use std::fmt::{Debug, Formatter};
use std::ops::Deref;

use bytes::Bytes;
use rkyv::{Archive, Deserialize, Serialize};

#[repr(C)]
#[derive(Serialize, Deserialize, Archive, Clone, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// An opaque, self-contained unit of work.
///
/// The transport never looks inside a work unit, the bytes are forwarded to
/// the remote executor exactly as they were provided.
pub struct WorkUnit {
    data: Vec<u8>,
}

impl WorkUnit {
    /// Creates a new work unit from the raw payload.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Gets the raw payload of the work unit.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the work unit returning the raw payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for WorkUnit {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<Bytes> for WorkUnit {
    fn from(data: Bytes) -> Self {
        Self { data: data.to_vec() }
    }
}

impl From<WorkUnit> for Bytes {
    fn from(work: WorkUnit) -> Self {
        Bytes::from(work.data)
    }
}

impl Deref for WorkUnit {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl Debug for WorkUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkUnit")
            .field("len", &self.data.len())
            .finish()
    }
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// A single argument value carried by a request.
pub enum Value {
    /// A peer id or address.
    Str(String),
    /// A numeric count.
    Long(i64),
    /// A work unit to be executed by the receiver.
    Work(WorkUnit),
}

impl Value {
    /// A short name of the value type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Long(_) => "long",
            Self::Work(_) => "work",
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<WorkUnit> for Value {
    fn from(v: WorkUnit) -> Self {
        Self::Work(v)
    }
}
