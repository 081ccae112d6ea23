use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::TransportError;
use crate::handler::Reply;
use crate::net;
use crate::protocol::{RequestKind, Response};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
/// A connection-per-call RPC client.
///
/// Every call to [RpcClient::send] opens its own TCP connection to the peer,
/// performs exactly one request/response exchange and closes the connection
/// again. Nothing is pooled, so the client is cheap to clone and share.
pub struct RpcClient {
    timeout: Option<Duration>,
}

impl RpcClient {
    /// Creates a new client with no timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new client which bounds both connecting and the exchange
    /// itself by the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    #[inline]
    /// The timeout applied to each call, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sends a single request to the peer at `address` and waits for its reply.
    ///
    /// The address must be a `host:port` pair. Work errors raised by the remote
    /// executor are returned as [TransportError::Work], any other failure on the
    /// remote side as [TransportError::Remote].
    pub async fn send(
        &self,
        address: &str,
        kind: RequestKind,
        args: &[Value],
    ) -> Result<Reply, TransportError> {
        let result = self.try_send(address, kind, args).await;

        if let Err(e) = &result {
            debug!(
                error = ?e,
                command = %kind,
                address = %address,
                "Error sending command."
            );
        }

        result
    }

    async fn try_send(
        &self,
        address: &str,
        kind: RequestKind,
        args: &[Value],
    ) -> Result<Reply, TransportError> {
        let buffer = net::serialize_request(kind, args)?;
        let remote_addr = resolve(address).await?;

        let stream = self.bounded(TcpStream::connect(remote_addr)).await??;
        self.bounded(exchange(stream, &buffer)).await?
    }

    async fn bounded<F, T>(&self, fut: F) -> Result<T, TransportError>
    where
        F: Future<Output = T>,
    {
        match self.timeout {
            None => Ok(fut.await),
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| TransportError::Timeout),
        }
    }
}

/// Writes the request and reads back the single response.
///
/// The stream is dropped, and therefore closed, on every exit path.
async fn exchange(mut stream: TcpStream, buffer: &[u8]) -> Result<Reply, TransportError> {
    stream.write_all(buffer).await?;
    stream.flush().await?;

    match net::read_response(&mut stream).await? {
        Response::VoidOk => Ok(Reply::Void),
        Response::LongOk(value) => Ok(Reply::Long(value)),
        Response::WorkError(error) => Err(TransportError::Work(error)),
        Response::GenericError(status) => Err(TransportError::Remote(status)),
    }
}

/// Parses a `host:port` pair and resolves it to a socket address.
pub(crate) async fn resolve(address: &str) -> Result<SocketAddr, TransportError> {
    let invalid = |reason: &str| TransportError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected a host:port pair"))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(invalid("missing host"));
    }

    let port = port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| invalid(&e.to_string()))?;

    addrs
        .next()
        .ok_or_else(|| invalid("host did not resolve to any address"))
}
