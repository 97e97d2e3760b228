//! # recstore - A Concurrent In-Memory Record Store
//!
//! recstore keeps records of `(name, city, country)` under auto-incremented
//! integer handles and serves them over TCP. Every connection carries
//! exactly one request and is closed by the server after the reply.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              recstore                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (acceptor)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │  Framing +  │    │         RecordStore          │ │
//! │                     │  Request    │    │  AtomicU64 handle counter    │ │
//! │                     │  grammar    │    │  RwLock<HashMap<h, Record>>  │ │
//! │                     └─────────────┘    └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use recstore::server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(&ServerConfig::default()).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `INIT` - create an empty record, replies `USERCODE <handle>`
//! - `PUT handle name city country` - replies `OK` or `FAILED`
//! - `GET handle name|city|country` - replies the value (empty if absent)
//! - `DELETE handle` - replies `DELETED` or `NOT_FOUND`
//! - `GETALL secret` - one summary line per record then `END`, or `AUTH_FAILED`
//!
//! Anything else gets `UNKNOWN_COMMAND`. A known command with the wrong
//! number of arguments or a non-numeric handle is answered by closing the
//! connection.
//!
//! ## Module Overview
//!
//! - [`storage`]: the shared record store
//! - [`protocol`]: message framing, request grammar, reply tokens
//! - [`commands`]: request dispatch onto the store
//! - [`connection`]: per-connection handling
//! - [`server`]: listener and accept loop
//! - [`client`]: one-shot async client

use std::time::Duration;

pub mod client;
pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{FrameError, FrameParser, Reply, Request, RequestError};
pub use server::{Server, ServerConfig};
pub use storage::{Field, Handle, Record, RecordStore};

/// The default port recstore listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host recstore binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Secret required by GETALL unless configured otherwise
pub const DEFAULT_SECRET: &str = "s3cr3t";

/// Environment variable overriding the GETALL secret
pub const SECRET_ENV_VAR: &str = "RECSTORE_SECRET";

/// How long the server waits for a connection's request line
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the client waits for the TCP connection to be established
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Version of recstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
