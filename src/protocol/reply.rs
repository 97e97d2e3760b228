//! Reply Tokens
//!
//! A reply is rendered as one or more framed messages:
//!
//! | Reply            | Messages                               |
//! |------------------|----------------------------------------|
//! | `Usercode(h)`    | `USERCODE <h>`                         |
//! | `Ok` / `Failed`  | `OK` / `FAILED`                        |
//! | `Value(v)`       | `<v>` (possibly empty)                 |
//! | `Deleted`        | `DELETED`                              |
//! | `NotFound`       | `NOT_FOUND`                            |
//! | `Records(lines)` | each line, then `END`                  |
//! | `AuthFailed`     | `AUTH_FAILED` (no terminator)          |
//! | `UnknownCommand` | `UNKNOWN_COMMAND`                      |

use crate::protocol::frame::{encode_message, FrameResult};
use crate::storage::Handle;
use bytes::BytesMut;

/// Sentinel message closing a multi-message reply.
pub const TERMINATOR: &str = "END";

/// A reply to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Usercode(Handle),
    Ok,
    Failed,
    /// Field value; also sent (empty) when the handle or field is unknown
    Value(String),
    Deleted,
    NotFound,
    Records(Vec<String>),
    AuthFailed,
    UnknownCommand,
}

impl Reply {
    /// Returns the messages this reply is written as, in order.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Reply::Usercode(handle) => vec![format!("USERCODE {}", handle)],
            Reply::Ok => vec!["OK".to_string()],
            Reply::Failed => vec!["FAILED".to_string()],
            Reply::Value(value) => vec![value.clone()],
            Reply::Deleted => vec!["DELETED".to_string()],
            Reply::NotFound => vec!["NOT_FOUND".to_string()],
            Reply::Records(lines) => {
                let mut messages = Vec::with_capacity(lines.len() + 1);
                messages.extend(lines.iter().cloned());
                messages.push(TERMINATOR.to_string());
                messages
            }
            Reply::AuthFailed => vec!["AUTH_FAILED".to_string()],
            Reply::UnknownCommand => vec!["UNKNOWN_COMMAND".to_string()],
        }
    }

    /// Frames every message of this reply into one buffer.
    ///
    /// Fails without producing partial output if any message is too large.
    pub fn serialize(&self) -> FrameResult<BytesMut> {
        let mut buf = BytesMut::new();
        for message in self.messages() {
            encode_message(&message, &mut buf)?;
        }
        Ok(buf)
    }
}
