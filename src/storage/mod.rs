//! Storage Module
//!
//! This module provides the record store shared by every connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RecordStore                           │
//! │                                                             │
//! │   create() ──> next_handle.fetch_add(1)                     │
//! │                        │                                    │
//! │                        ▼                                    │
//! │   ┌─────────────────────────────────────────────────────┐   │
//! │   │  RwLock<HashMap<Handle, Record { name, city, ... }>>│   │
//! │   └─────────────────────────────────────────────────────┘   │
//! │     ▲          ▲              ▲             ▲               │
//! │   update   read_field       delete       dump_all           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use recstore::storage::{Field, RecordStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RecordStore::new());
//!
//! let handle = store.create();
//! store.update(handle, "Alice", "Paris", "France");
//! assert_eq!(store.get_field(handle, Field::Country), Some("France".to_string()));
//!
//! assert!(store.delete(handle));
//! assert!(!store.delete(handle));
//! ```

pub mod engine;

// Re-export commonly used types
pub use engine::{Field, Handle, Record, RecordStore, StoreStats, UnknownField};
