//! Wire Protocol
//!
//! recstore speaks a tiny request/response protocol over TCP: the client
//! sends one framed request line, the server answers with one or more
//! framed messages and closes the connection.
//!
//! ## Modules
//!
//! - `frame`: 2-byte big-endian length prefix + UTF-8 payload
//! - `request`: the request line grammar
//! - `reply`: reply tokens and how they are rendered to messages
//!
//! ## Example
//!
//! ```
//! use recstore::protocol::{parse_message, Reply, Request};
//!
//! let data = b"\x00\x08DELETE 3";
//! let (line, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//! assert_eq!(Request::parse(&line).unwrap(), Request::Delete { handle: 3 });
//!
//! let bytes = Reply::NotFound.serialize().unwrap();
//! assert_eq!(&bytes[..], b"\x00\x09NOT_FOUND");
//! ```

pub mod frame;
pub mod reply;
pub mod request;

// Re-export commonly used types for convenience
pub use frame::{encode_message, parse_message, FrameError, FrameParser, FrameResult};
pub use reply::{Reply, TERMINATOR};
pub use request::{Request, RequestError};
