//! Connection Acceptor
//!
//! Binds the listening socket once and accepts connections forever, handing
//! each one to its own Tokio task. The loop never waits on a handler.
//!
//! A failed `accept` only loses that one connection: it is logged and the
//! loop carries on after a short pause. Consecutive failures (for example
//! running out of file descriptors) double the pause up to a ceiling; the
//! first successful accept resets it.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::RecordStore;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

/// First pause after a failed accept
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);

/// Longest pause between consecutive failed accepts
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause schedule for a failing accept loop.
#[derive(Debug)]
struct AcceptBackoff {
    next: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            next: ACCEPT_BACKOFF_MIN,
        }
    }

    /// Returns the pause for this failure and doubles the next one.
    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(ACCEPT_BACKOFF_MAX);
        delay
    }

    fn reset(&mut self) {
        self.next = ACCEPT_BACKOFF_MIN;
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Secret required by GETALL
    pub secret: String,
    /// How long a connection may take to deliver its request
    pub read_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            secret: crate::DEFAULT_SECRET.to_string(),
            read_timeout: Some(crate::DEFAULT_READ_TIMEOUT),
        }
    }
}

impl ServerConfig {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A bound server, ready to run its accept loop.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    store: Arc<RecordStore>,
    stats: Arc<ConnectionStats>,
    read_timeout: Option<Duration>,
}

impl Server {
    /// Binds according to `config`, with a fresh store using the configured secret.
    pub async fn bind(config: &ServerConfig) -> io::Result<Self> {
        let store = Arc::new(RecordStore::with_secret(config.secret.clone()));
        Self::bind_with_store(config.bind_address(), store, config.read_timeout).await
    }

    /// Binds `addr` and serves the given store.
    pub async fn bind_with_store(
        addr: impl ToSocketAddrs,
        store: Arc<RecordStore>,
        read_timeout: Option<Duration>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            stats: Arc::new(ConnectionStats::new()),
            read_timeout,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The shared store.
    pub fn store(&self) -> Arc<RecordStore> {
        Arc::clone(&self.store)
    }

    /// The shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until the task is dropped.
    pub async fn run(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!("Listening on {}", addr);
        }

        let mut backoff = AcceptBackoff::new();
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    backoff.reset();
                    let handler = CommandHandler::new(Arc::clone(&self.store));
                    let stats = Arc::clone(&self.stats);

                    // Spawn a task to handle this connection
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        handler,
                        stats,
                        self.read_timeout,
                    ));
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    error!(retry_in = ?delay, "Failed to accept connection: {}", e);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
