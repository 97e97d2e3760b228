//! Thread-Safe Record Store
//!
//! This module implements the shared record table for recstore.
//! Every record (name, city, country) lives under an integer handle that is
//! minted by [`RecordStore::create`] and never handed out again, even after
//! the record is deleted.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       RecordStore                           │
//! │  ┌───────────────────┐      ┌────────────────────────────┐  │
//! │  │   next_handle     │      │  RwLock<HashMap<Handle,    │  │
//! │  │   (AtomicI64)     │      │                 Record>>   │  │
//! │  └───────────────────┘      └────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handle allocation is a single `fetch_add` on the counter and does not
//! touch the map lock. Every map operation (including the bulk dump) runs
//! under one acquisition of the lock, so no caller ever observes a record
//! half-written or half-removed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use crate::protocol::frame::MAX_MESSAGE_LEN;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identifier of a record. Handles start at 1 and are never reused.
///
/// Signed so that any integer a client sends is a valid (if absent) handle.
pub type Handle = i64;

/// A stored record. All fields start out empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub city: String,
    pub country: String,
}

impl Record {
    /// Creates a record with the given field values.
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            country: country.into(),
        }
    }

    /// Returns the value of a single field.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::City => &self.city,
            Field::Country => &self.country,
        }
    }

    /// Renders the one-line summary used by the bulk dump.
    pub fn summary(&self, handle: Handle) -> String {
        format!(
            "Usercode: {}, Name: {}, City: {}, Country: {}",
            handle, self.name, self.city, self.country
        )
    }
}

/// A readable record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    City,
    Country,
}

impl Field {
    /// Returns the lowercase wire name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::City => "city",
            Field::Country => "country",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a field name is not one of `name`, `city`, `country`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    /// Parses a field name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("name") {
            Ok(Field::Name)
        } else if s.eq_ignore_ascii_case("city") {
            Ok(Field::City)
        } else if s.eq_ignore_ascii_case("country") {
            Ok(Field::Country)
        } else {
            Err(UnknownField(s.to_string()))
        }
    }
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Records currently stored
    pub records: usize,
    /// Handles issued since startup (including deleted ones)
    pub handles_issued: u64,
    pub updates: u64,
    pub reads: u64,
    pub deletes: u64,
    pub dumps: u64,
    /// Dump requests rejected for a wrong secret
    pub auth_failures: u64,
}

/// The shared record store.
///
/// Designed to be wrapped in an `Arc` and shared across all connection
/// tasks. Callers never lock anything themselves.
///
/// # Example
///
/// ```
/// use recstore::storage::RecordStore;
///
/// let store = RecordStore::with_secret("hunter2");
///
/// let handle = store.create();
/// assert!(store.update(handle, "Alice", "Paris", "France"));
/// assert_eq!(store.read_field(handle, "CITY"), Some("Paris".to_string()));
///
/// assert!(store.dump_all("wrong").is_none());
/// assert_eq!(store.dump_all("hunter2").unwrap().len(), 1);
/// ```
pub struct RecordStore {
    records: RwLock<HashMap<Handle, Record>>,

    /// Next handle to hand out
    next_handle: AtomicI64,

    /// Shared secret guarding the bulk dump
    secret: String,

    update_count: AtomicU64,
    read_count: AtomicU64,
    delete_count: AtomicU64,
    dump_count: AtomicU64,
    auth_failure_count: AtomicU64,
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // secret omitted
        f.debug_struct("RecordStore")
            .field("records", &self.len())
            .field("next_handle", &self.next_handle.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    /// Creates an empty store guarded by [`crate::DEFAULT_SECRET`].
    pub fn new() -> Self {
        Self::with_secret(crate::DEFAULT_SECRET)
    }

    /// Creates an empty store whose bulk dump requires `secret`.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_handle: AtomicI64::new(1),
            secret: secret.into(),
            update_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            delete_count: AtomicU64::new(0),
            dump_count: AtomicU64::new(0),
            auth_failure_count: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock cannot leave the map half-modified:
    // every mutation below is a single insert/remove/assignment.
    fn read_records(&self) -> RwLockReadGuard<'_, HashMap<Handle, Record>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, HashMap<Handle, Record>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocates a fresh handle and inserts an empty record under it.
    ///
    /// Never fails. Handles start at 1 and increase by one per call.
    pub fn create(&self) -> Handle {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.write_records().insert(handle, Record::default());
        handle
    }

    /// Replaces all three fields of an existing record.
    ///
    /// An update whose summary line would not fit in one wire message is
    /// refused, so the bulk dump can always be framed.
    ///
    /// # Returns
    ///
    /// Returns `true` if the record existed and was written, `false`
    /// otherwise (nothing is written).
    pub fn update(
        &self,
        handle: Handle,
        name: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> bool {
        self.update_count.fetch_add(1, Ordering::Relaxed);

        let updated = Record::new(name, city, country);
        if updated.summary(handle).len() > MAX_MESSAGE_LEN {
            return false;
        }

        let mut records = self.write_records();
        match records.get_mut(&handle) {
            Some(record) => {
                *record = updated;
                true
            }
            None => false,
        }
    }

    /// Reads one field of a record by its (case-insensitive) name.
    ///
    /// Returns `None` both when the handle does not exist and when the
    /// field name is not recognized.
    pub fn read_field(&self, handle: Handle, field: &str) -> Option<String> {
        let field = field.parse::<Field>().ok()?;
        self.get_field(handle, field)
    }

    /// Reads one field of a record.
    pub fn get_field(&self, handle: Handle, field: Field) -> Option<String> {
        self.read_count.fetch_add(1, Ordering::Relaxed);

        let records = self.read_records();
        records.get(&handle).map(|r| r.field(field).to_string())
    }

    /// Returns a copy of a whole record.
    pub fn get(&self, handle: Handle) -> Option<Record> {
        self.read_records().get(&handle).cloned()
    }

    /// Removes a record.
    ///
    /// # Returns
    ///
    /// Returns `true` if a record was removed, `false` if it didn't exist.
    pub fn delete(&self, handle: Handle) -> bool {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        self.write_records().remove(&handle).is_some()
    }

    /// Returns one summary line per live record, ordered by handle.
    ///
    /// Returns `None` if `secret` does not exactly match the store's secret,
    /// which is distinct from `Some(vec![])` for an empty store.
    pub fn dump_all(&self, secret: &str) -> Option<Vec<String>> {
        if secret != self.secret {
            self.auth_failure_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.dump_count.fetch_add(1, Ordering::Relaxed);

        let mut entries: Vec<(Handle, String)> = {
            let records = self.read_records();
            records
                .iter()
                .map(|(handle, record)| (*handle, record.summary(*handle)))
                .collect()
        };
        entries.sort_unstable_by_key(|(handle, _)| *handle);

        Some(entries.into_iter().map(|(_, line)| line).collect())
    }

    /// Returns `true` if `handle` refers to a live record.
    pub fn contains(&self, handle: Handle) -> bool {
        self.read_records().contains_key(&handle)
    }

    /// Returns the number of live records.
    pub fn len(&self) -> usize {
        self.read_records().len()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            records: self.len(),
            handles_issued: (self.next_handle.load(Ordering::SeqCst) - 1) as u64,
            updates: self.update_count.load(Ordering::Relaxed),
            reads: self.read_count.load(Ordering::Relaxed),
            deletes: self.delete_count.load(Ordering::Relaxed),
            dumps: self.dump_count.load(Ordering::Relaxed),
            auth_failures: self.auth_failure_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_create_starts_at_one() {
        let store = RecordStore::new();

        assert_eq!(store.create(), 1);
        assert_eq!(store.create(), 2);
        assert_eq!(store.get(1), Some(Record::default()));
    }

    #[test]
    fn test_handles_not_reused_after_delete() {
        let store = RecordStore::new();

        let h1 = store.create();
        assert!(store.delete(h1));
        let h2 = store.create();

        assert_ne!(h1, h2);
        assert!(h2 > h1);
    }

    #[test]
    fn test_concurrent_create_unique() {
        let store = Arc::new(RecordStore::new());

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || (0..500).map(|_| store.create()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for handle in t.join().unwrap() {
                assert!(handle > 0);
                assert!(seen.insert(handle), "duplicate handle {}", handle);
            }
        }

        assert_eq!(seen.len(), 4000);
        assert_eq!(store.len(), 4000);
    }

    #[test]
    fn test_update_then_read() {
        let store = RecordStore::new();
        let handle = store.create();

        assert!(store.update(handle, "Alice", "Paris", "France"));
        assert_eq!(store.read_field(handle, "name"), Some("Alice".to_string()));
        assert_eq!(store.read_field(handle, "city"), Some("Paris".to_string()));
        assert_eq!(
            store.read_field(handle, "country"),
            Some("France".to_string())
        );
    }

    #[test]
    fn test_update_replaces_all_fields() {
        let store = RecordStore::new();
        let handle = store.create();

        store.update(handle, "Alice", "Paris", "France");
        store.update(handle, "Bob", "Oslo", "Norway");

        assert_eq!(store.get(handle), Some(Record::new("Bob", "Oslo", "Norway")));
    }

    #[test]
    fn test_update_missing() {
        let store = RecordStore::new();

        assert!(!store.update(42, "Alice", "Paris", "France"));
        assert!(!store.contains(42));
    }

    #[test]
    fn test_read_field_case_insensitive() {
        let store = RecordStore::new();
        let handle = store.create();
        store.update(handle, "Alice", "Paris", "France");

        assert_eq!(store.read_field(handle, "CiTy"), Some("Paris".to_string()));
        assert_eq!(store.read_field(handle, "NAME"), Some("Alice".to_string()));
    }

    #[test]
    fn test_read_field_absent() {
        let store = RecordStore::new();
        let handle = store.create();

        // Fresh record: present but empty
        assert_eq!(store.read_field(handle, "name"), Some(String::new()));
        // Unknown field and unknown handle look the same
        assert_eq!(store.read_field(handle, "zipcode"), None);
        assert_eq!(store.read_field(999, "name"), None);
    }

    #[test]
    fn test_delete() {
        let store = RecordStore::new();
        let handle = store.create();
        store.update(handle, "Alice", "Paris", "France");

        assert!(store.delete(handle));
        assert_eq!(store.read_field(handle, "name"), None);
        assert_eq!(store.read_field(handle, "city"), None);
        assert!(!store.delete(handle)); // Already deleted
        assert!(!store.delete(12345)); // Never created
    }

    #[test]
    fn test_dump_all_auth() {
        let store = RecordStore::with_secret("s3cr3t");
        store.create();

        assert_eq!(store.dump_all("wrong"), None);
        assert_eq!(store.dump_all(""), None);
        assert_eq!(store.dump_all("S3CR3T"), None);
        assert_eq!(store.stats().auth_failures, 3);
    }

    #[test]
    fn test_dump_all_empty_is_not_auth_failure() {
        let store = RecordStore::with_secret("s3cr3t");
        assert_eq!(store.dump_all("s3cr3t"), Some(vec![]));
    }

    #[test]
    fn test_dump_all_one_line_per_live_record() {
        let store = RecordStore::with_secret("s3cr3t");
        let a = store.create();
        let b = store.create();
        let c = store.create();
        store.update(a, "Alice", "Paris", "France");
        store.update(c, "Carol", "Rome", "Italy");
        store.delete(b);

        let lines = store.dump_all("s3cr3t").unwrap();
        assert_eq!(
            lines,
            vec![
                "Usercode: 1, Name: Alice, City: Paris, Country: France".to_string(),
                "Usercode: 3, Name: Carol, City: Rome, Country: Italy".to_string(),
            ]
        );
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("Name".parse::<Field>(), Ok(Field::Name));
        assert_eq!("COUNTRY".parse::<Field>(), Ok(Field::Country));
        assert_eq!(
            "zip".parse::<Field>(),
            Err(UnknownField("zip".to_string()))
        );
        assert_eq!(Field::City.to_string(), "city");
    }

    #[test]
    fn test_stats() {
        let store = RecordStore::new();
        let h = store.create();
        store.create();
        store.update(h, "a", "b", "c");
        store.read_field(h, "name");
        store.delete(h);
        store.dump_all(crate::DEFAULT_SECRET);
        store.dump_all("nope");

        let stats = store.stats();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.handles_issued, 2);
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.dumps, 1);
        assert_eq!(stats.auth_failures, 1);
    }

    #[test]
    fn test_update_refuses_unframeable_summary() {
        let store = RecordStore::with_secret("s3cr3t");
        let a = store.create();
        let b = store.create();
        store.update(a, "Alice", "Paris", "France");

        let huge = "x".repeat(65_520);
        assert!(!store.update(b, huge.as_str(), "c", "k"));
        assert_eq!(store.get(b), Some(Record::default()));

        // Summary of exactly the limit is still accepted
        let prefix = Record::new("", "c", "k").summary(b).len();
        let fits = "x".repeat(MAX_MESSAGE_LEN - prefix);
        assert!(store.update(b, fits.as_str(), "c", "k"));
        assert_eq!(store.get(b).unwrap().summary(b).len(), MAX_MESSAGE_LEN);

        assert_eq!(store.dump_all("s3cr3t").unwrap().len(), 2);
    }

    #[test]
    fn test_negative_handle_is_absent() {
        let store = RecordStore::new();
        store.create();

        assert!(!store.update(-1, "a", "b", "c"));
        assert_eq!(store.read_field(-1, "name"), None);
        assert!(!store.delete(-1));
    }

    #[test]
    fn test_debug_hides_secret() {
        let store = RecordStore::with_secret("topsecret");
        assert!(!format!("{:?}", store).contains("topsecret"));
    }

    #[test]
    fn test_concurrent_delete_and_read() {
        let store = Arc::new(RecordStore::new());
        let handles: Vec<_> = (0..1000).map(|_| store.create()).collect();
        for h in &handles {
            store.update(*h, "n", "c", "k");
        }

        let reader = {
            let store = Arc::clone(&store);
            let handles = handles.clone();
            thread::spawn(move || {
                for h in handles {
                    // Either the full value or nothing, never a torn read
                    if let Some(v) = store.read_field(h, "city") {
                        assert_eq!(v, "c");
                    }
                }
            })
        };
        let deleter = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for h in handles {
                    assert!(store.delete(h));
                }
            })
        };

        reader.join().unwrap();
        deleter.join().unwrap();
        assert!(store.is_empty());
    }
}
