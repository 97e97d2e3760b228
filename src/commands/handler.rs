//! Command Handler
//!
//! Executes parsed requests against the record store and turns every
//! outcome into a reply token. Nothing that happens in the store crosses
//! the wire except through one of these tokens.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  Request ───> dispatch ───> RecordStore ───> Reply          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Reply, Request};
use crate::storage::{Handle, RecordStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatches requests to the shared record store.
#[derive(Clone, Debug)]
pub struct CommandHandler {
    store: Arc<RecordStore>,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Executes a request and returns the reply to send.
    pub fn execute(&self, request: Request) -> Reply {
        match request {
            Request::Init => self.cmd_init(),
            Request::Put {
                handle,
                name,
                city,
                country,
            } => self.cmd_put(handle, name, city, country),
            Request::Get { handle, field } => self.cmd_get(handle, &field),
            Request::Delete { handle } => self.cmd_delete(handle),
            Request::GetAll { secret } => self.cmd_getall(&secret),
            Request::Unknown(keyword) => {
                debug!(command = %keyword, "Unknown command");
                Reply::UnknownCommand
            }
        }
    }

    fn cmd_init(&self) -> Reply {
        let handle = self.store.create();
        debug!(handle, "Record created");
        Reply::Usercode(handle)
    }

    fn cmd_put(&self, handle: Handle, name: String, city: String, country: String) -> Reply {
        if self.store.update(handle, name, city, country) {
            Reply::Ok
        } else {
            Reply::Failed
        }
    }

    /// Missing handles and unknown fields both come back as an empty value.
    fn cmd_get(&self, handle: Handle, field: &str) -> Reply {
        Reply::Value(self.store.read_field(handle, field).unwrap_or_default())
    }

    fn cmd_delete(&self, handle: Handle) -> Reply {
        if self.store.delete(handle) {
            Reply::Deleted
        } else {
            Reply::NotFound
        }
    }

    fn cmd_getall(&self, secret: &str) -> Reply {
        match self.store.dump_all(secret) {
            Some(lines) => Reply::Records(lines),
            None => {
                warn!("Bulk dump rejected: wrong secret");
                Reply::AuthFailed
            }
        }
    }
}
