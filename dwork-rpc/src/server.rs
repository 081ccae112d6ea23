use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::handler::{Handler, Reply};
use crate::net::{self, FrameError, RawRequest, Status};
use crate::protocol::{RequestKind, Response};
use crate::request::Request;
use crate::HandlerError;

/// A RPC server instance.
///
/// A single task accepts inbound connections while the server is running,
/// each accepted connection is handled by its own task on the worker runtime.
pub struct Server {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Server {
    /// Binds the listener and spawns the accept loop.
    ///
    /// Connections are handled on the current runtime and peers may take
    /// as long as they like to send their request.
    pub async fn listen<H>(bind_addr: SocketAddr, handler: H) -> io::Result<Self>
    where
        H: Handler,
    {
        Self::listen_with_workers(bind_addr, handler, Handle::current(), None).await
    }

    /// Binds the listener and spawns the accept loop.
    ///
    /// Each accepted connection is spawned onto the provided `workers` runtime.
    /// If a `read_timeout` is set, peers which do not send a complete request
    /// within it are answered with a [Status::timeout] and disconnected.
    pub async fn listen_with_workers<H>(
        bind_addr: SocketAddr,
        handler: H,
        workers: Handle,
        read_timeout: Option<Duration>,
    ) -> io::Result<Self>
    where
        H: Handler,
    {
        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(accept_connections(
            listener,
            Arc::new(handler),
            workers,
            read_timeout,
            running.clone(),
            shutdown_rx,
        ));

        info!(listen_addr = %local_addr, "RPC server is listening for connections.");

        Ok(Self {
            local_addr,
            running,
            shutdown_tx,
            handle,
        })
    }

    #[inline]
    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    /// Whether the server is still accepting connections.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.handle.is_finished()
    }

    /// Stops accepting connections and closes the listener.
    ///
    /// Connections which have already been accepted run to completion.
    pub async fn shutdown(self) {
        self.running.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(());

        if let Err(e) = self.handle.await {
            error!(error = ?e, "RPC server accept loop failed.");
        }

        info!(listen_addr = %self.local_addr, "RPC server is shutting down.");
    }
}

/// Accepts connections until the running flag is cleared.
async fn accept_connections<H>(
    listener: TcpListener,
    handler: Arc<H>,
    workers: Handle,
    read_timeout: Option<Duration>,
    running: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    H: Handler,
{
    while running.load(Ordering::Acquire) {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    trace!(remote_addr = %remote_addr, "Accepted connection.");
                    let task = ServerTask::new(
                        stream,
                        remote_addr,
                        handler.clone(),
                        read_timeout,
                    );
                    workers.spawn(task.handle_request());
                },
                Err(e) => {
                    if !running.load(Ordering::Acquire) {
                        break;
                    }
                    error!(error = ?e, "Server failed to accept connection.");
                },
            },
        }
    }

    running.store(false, Ordering::Release);
}

/// A single request/response exchange on an accepted connection.
pub(crate) struct ServerTask<H> {
    stream: TcpStream,
    remote_addr: SocketAddr,
    handler: Arc<H>,
    read_timeout: Option<Duration>,
}

impl<H> ServerTask<H>
where
    H: Handler,
{
    pub(crate) fn new(
        stream: TcpStream,
        remote_addr: SocketAddr,
        handler: Arc<H>,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream,
            remote_addr,
            handler,
            read_timeout,
        }
    }

    /// Reads exactly one request, dispatches it, writes exactly one response
    /// and closes the connection.
    ///
    /// Failures writing the response are logged and never propagated.
    pub(crate) async fn handle_request(mut self) {
        let response = match self.read_request().await {
            Ok(request) => self.dispatch(request).await,
            Err(status) => Response::GenericError(status),
        };

        let buffer = net::serialize_response(&response);
        if let Err(e) = self.stream.write_all(&buffer).await {
            warn!(
                error = ?e,
                remote_addr = %self.remote_addr,
                "Encountered an IO error while writing response."
            );
            return;
        }

        if let Err(e) = self.stream.shutdown().await {
            warn!(
                error = ?e,
                remote_addr = %self.remote_addr,
                "Encountered an IO error while closing connection."
            );
        }
    }

    async fn read_request(&mut self) -> Result<RawRequest, Status> {
        let read = net::read_request(&mut self.stream);
        let result = match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        remote_addr = %self.remote_addr,
                        timeout = ?limit,
                        "Peer did not send a request in time."
                    );
                    return Err(Status::timeout());
                },
            },
            None => read.await,
        };

        result.map_err(|e| {
            warn!(
                error = ?e,
                remote_addr = %self.remote_addr,
                "Failed to read request from connection."
            );
            frame_error_status(e)
        })
    }

    async fn dispatch(&self, request: RawRequest) -> Response {
        let kind = match RequestKind::from_opcode(request.opcode) {
            Some(kind) => kind,
            None => {
                warn!(
                    opcode = request.opcode,
                    remote_addr = %self.remote_addr,
                    "Unknown command received."
                );
                return Response::GenericError(Status::unknown_command(request.opcode));
            },
        };

        if request.args.len() != kind.num_parameters() {
            return Response::GenericError(Status::invalid(format!(
                "{kind} expects {} arguments but {} were provided.",
                kind.num_parameters(),
                request.args.len(),
            )));
        }

        // The handler runs in a task of its own so a panic still gets a response.
        let request = Request::new(self.remote_addr, kind, request.args);
        let handler = self.handler.clone();
        let result = tokio::spawn(async move { handler.on_request(request).await }).await;

        match result {
            Ok(Ok(Reply::Void)) => Response::VoidOk,
            Ok(Ok(Reply::Long(value))) => Response::LongOk(value),
            Ok(Err(HandlerError::Work(error))) => Response::WorkError(error),
            Ok(Err(HandlerError::Generic(status))) => Response::GenericError(status),
            Err(e) => {
                error!(
                    error = ?e,
                    command = %kind,
                    remote_addr = %self.remote_addr,
                    "Handler failed to process request."
                );
                let reason = if e.is_panic() { "panicked" } else { "was cancelled" };
                Response::GenericError(Status::internal(format!(
                    "Handler {reason} while processing {kind}."
                )))
            },
        }
    }
}

fn frame_error_status(error: FrameError) -> Status {
    match error {
        FrameError::Io(e) => Status::connection(e),
        FrameError::Codec(e) => Status::invalid(e),
        FrameError::UnknownResponse(opcode) => Status::unknown_command(opcode),
    }
}
