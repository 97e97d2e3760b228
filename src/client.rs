//! Client
//!
//! Connects to a recstore server, sends one request line and collects the
//! reply messages. Reading stops at the `END` terminator or when the server
//! closes the connection, whichever comes first; the client never guesses
//! from how many bytes happen to be buffered.
//!
//! ## Example
//!
//! ```ignore
//! use recstore::client::Client;
//! use std::time::Duration;
//!
//! let client = Client::connect("127.0.0.1:8080", Duration::from_secs(5)).await?;
//! let messages = client.send("INIT").await?;
//! assert_eq!(messages, vec!["USERCODE 1"]);
//! ```

use crate::protocol::{encode_message, FrameError, FrameParser, TERMINATOR};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

/// Errors that can occur on the client side.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The server closed the connection in the middle of a message
    #[error("connection closed mid-message")]
    UnexpectedEof,
}

/// A connection carrying a single request.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    parser: FrameParser,
}

impl Client<TcpStream> {
    /// Connects to `addr`, giving up after `timeout`.
    pub async fn connect(addr: impl ToSocketAddrs, timeout: Duration) -> Result<Self, ClientError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout(timeout))??;

        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-open stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            parser: FrameParser::new(),
        }
    }

    /// Sends one request line and returns every message received.
    ///
    /// When the reply ends with the terminator, `END` is the last element.
    /// An empty result means the server closed without answering.
    pub async fn send(mut self, line: &str) -> Result<Vec<String>, ClientError> {
        let mut out = BytesMut::new();
        encode_message(line, &mut out)?;
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;

        let mut messages = Vec::new();
        loop {
            while let Some((message, consumed)) = self.parser.parse(&self.buffer)? {
                self.buffer.advance(consumed);
                let done = message == TERMINATOR;
                messages.push(message);
                if done {
                    return Ok(messages);
                }
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(messages);
                }
                return Err(ClientError::UnexpectedEof);
            }
            trace!(bytes = n, "Read data");
        }
    }
}

/// Connects, sends `line` and collects the reply.
pub async fn request(
    addr: impl ToSocketAddrs,
    line: &str,
    connect_timeout: Duration,
) -> Result<Vec<String>, ClientError> {
    Client::connect(addr, connect_timeout).await?.send(line).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::encode_to_bytes;
    use tokio::net::TcpListener;
    use tokio_test::io::Builder;

    /// Accepts one connection, reads the request, writes `reply` and closes.
    async fn scripted_server(reply: Vec<u8>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = stream.read(&mut buf).await.unwrap();
            for chunk in reply.chunks(3) {
                stream.write_all(chunk).await.unwrap();
                stream.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_reads_slow_multi_message_reply() {
        let mut reply = BytesMut::new();
        encode_message("Usercode: 1, Name: a, City: b, Country: c", &mut reply).unwrap();
        encode_message("Usercode: 2, Name: d, City: e, Country: f", &mut reply).unwrap();
        encode_message("END", &mut reply).unwrap();
        let addr = scripted_server(reply.to_vec()).await;

        let messages = request(addr, "GETALL s3cr3t", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], "END");
    }

    #[tokio::test]
    async fn test_single_reply_then_close() {
        let addr = scripted_server(encode_to_bytes("OK").unwrap().to_vec()).await;

        let messages = request(addr, "PUT 1 a b c", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(messages, vec!["OK"]);
    }

    #[tokio::test]
    async fn test_close_without_reply() {
        let addr = scripted_server(Vec::new()).await;

        let messages = request(addr, "GET x name", Duration::from_secs(2))
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_reply() {
        let addr = scripted_server(b"\x00\x05OK".to_vec()).await;

        let result = request(addr, "INIT", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ClientError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_truncated_reply_scripted() {
        let stream = Builder::new()
            .write(b"\x00\x04INIT")
            .read(b"\x00\x0aUSER")
            .build();

        let result = Client::new(stream).send("INIT").await;
        assert!(matches!(result, Err(ClientError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let stream = Builder::new()
            .write(b"\x00\x0dGETALL s3cr3t")
            .read(b"\x00")
            .read(b"\x01a\x00")
            .read(b"\x03EN")
            .read(b"D")
            .build();

        let messages = Client::new(stream).send("GETALL s3cr3t").await.unwrap();
        assert_eq!(messages, vec!["a", "END"]);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = request(addr, "INIT", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
