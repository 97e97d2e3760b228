//! Connection Handler
//!
//! Serves exactly one request over one accepted connection, then closes it.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. Read bytes until one full frame is buffered (bounded by read timeout)
//!        │
//!        ▼
//! 4. Parse the request line ──(malformed)──> close, no reply
//!        │
//!        ▼
//! 5. Execute against the store, write every reply message
//!        │
//!        ▼
//! 6. Shut down the connection, task ends
//! ```
//!
//! Every failure in here stays local to the connection: it is logged and
//! the connection is dropped. The store is never touched by a request that
//! fails to parse.

use crate::commands::CommandHandler;
use crate::protocol::{FrameError, FrameParser, Reply, Request, RequestError};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 512;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections dropped because the request was malformed
    pub malformed_requests: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed_request(&self) {
        self.malformed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the byte stream so that a scripted stream can stand in for
/// the socket.
pub struct ConnectionHandler<S = TcpStream> {
    /// The stream for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler (shared store behind it)
    command_handler: CommandHandler,

    parser: FrameParser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Upper bound on the wait for the request frame (`None` = unbounded)
    read_timeout: Option<Duration>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing requests
    /// * `stats` - Shared connection statistics
    /// * `read_timeout` - How long to wait for the request before giving up
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        read_timeout: Option<Duration>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: FrameParser::new(),
            stats,
            read_timeout,
        }
    }

    /// Serves the one request of this connection and closes it.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.serve().await;

        match &result {
            Ok(()) => debug!(client = %self.addr, "Request served"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected before sending a request")
                }
                ConnectionError::Request(_) => {
                    self.stats.malformed_request();
                    warn!(client = %self.addr, error = %e, "Malformed request, closing connection")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        if let Err(e) = self.stream.shutdown().await {
            trace!(client = %self.addr, error = %e, "Shutdown failed");
        }

        self.stats.connection_closed();
        result
    }

    /// Read one request, execute it, write the reply.
    async fn serve(&mut self) -> Result<(), ConnectionError> {
        let line = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.read_request())
                .await
                .map_err(|_| ConnectionError::ReadTimeout(limit))??,
            None => self.read_request().await?,
        };
        info!(client = %self.addr, request = %redact(&line), "Received");

        let request = Request::parse(&line)?;
        let reply = self.command_handler.execute(request);
        self.stats.command_processed();

        self.send_reply(&reply).await
    }

    /// Reads from the socket until one complete frame is buffered.
    async fn read_request(&mut self) -> Result<String, ConnectionError> {
        loop {
            if let Some((line, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                if !self.buffer.is_empty() {
                    trace!(
                        client = %self.addr,
                        ignored = self.buffer.len(),
                        "Discarding bytes after the request"
                    );
                }
                return Ok(line);
            }

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(if self.buffer.is_empty() {
                    ConnectionError::ClientDisconnected
                } else {
                    ConnectionError::UnexpectedEof
                });
            }

            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, "Read data");
        }
    }

    /// Writes every message of a reply and flushes.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize()?;
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent reply"
        );
        Ok(())
    }
}

/// Masks the secret of a GETALL request before it reaches the log.
fn redact(line: &str) -> String {
    let mut tokens = line.split_ascii_whitespace();
    match tokens.next() {
        Some(keyword) if keyword.eq_ignore_ascii_case("GETALL") => {
            let masked = tokens.map(|_| "***").collect::<Vec<_>>().join(" ");
            format!("{} {}", keyword, masked).trim_end().to_string()
        }
        _ => line.to_string(),
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Bad framing, or a reply too large to frame
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// The request line could not be parsed
    #[error("Malformed request: {0}")]
    Request(#[from] RequestError),

    /// No complete request arrived in time
    #[error("No request within {0:?}")]
    ReadTimeout(Duration),

    /// Client closed the connection without sending anything
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    read_timeout: Option<Duration>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, read_timeout);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}
