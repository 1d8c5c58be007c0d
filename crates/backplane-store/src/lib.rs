//! Data-access boundary for the platform.
//!
//! Every persistence concern sits behind a small sync trait so the
//! engine can be wired with in-memory backends in tests and real
//! backends in deployment:
//!
//! - [`Database`] — positional-parameter SQL with an interpolation
//!   guard applied before any statement reaches a backend
//! - [`RecordStore`] — typed CRUD used by the HTTP dispatcher
//! - [`KeyValue`] — string KV with TTL (60 second floor)
//! - [`SessionStore`] / [`CacheStore`] — envelope layers over KV
//! - [`ObjectStore`] — blobs with multipart upload, signed URLs, and
//!   cleanup sweeps

mod cache;
mod database;
mod error;
mod kv;
mod object;
mod records;
mod session;

pub use cache::CacheStore;
pub use database::{Database, GuardedDatabase, QueryResult, Statement, check_interpolation};
pub use error::StoreError;
pub use kv::{KeyValue, KvPage, MIN_TTL_SECONDS, MemoryKv};
pub use object::{
    MemoryObjects, ObjectMeta, ObjectPage, ObjectStore, UrlSigner, signed_url, upload_multipart,
    verify_signed_url,
};
pub use records::{ListQuery, MemoryRecords, RecordStore, SqlRecords};
pub use session::{Session, SessionStore};

/// Lowercase hex of a byte slice.
pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
