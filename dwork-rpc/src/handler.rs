use async_trait::async_trait;

use crate::error::HandlerError;
use crate::request::Request;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// The natural result of a successfully handled request.
pub enum Reply {
    /// Answered with a `VOID_OK` response.
    Void,
    /// Answered with a `LONG_OK` response.
    Long(i64),
}

impl Reply {
    /// Returns the carried value, `0` for [Reply::Void].
    pub fn into_long(self) -> i64 {
        match self {
            Self::Void => 0,
            Self::Long(v) => v,
        }
    }
}

#[async_trait]
/// The local side of the dispatcher.
///
/// The server decodes exactly one request per connection and hands it to the
/// handler, the returned value becomes the single response of that connection.
///
/// Unknown opcodes and malformed frames never reach the handler.
pub trait Handler: Send + Sync + 'static {
    /// Process a request.
    async fn on_request(&self, request: Request) -> Result<Reply, HandlerError>;
}
