//! Object (blob) storage with multipart upload and signed URLs.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;
use crate::hex;

/// Stored object metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One page of an object listing.
#[derive(Debug, Clone)]
pub struct ObjectPage {
    pub objects: Vec<ObjectMeta>,
    pub cursor: Option<String>,
    pub truncated: bool,
}

/// Blob store with multipart upload support.
pub trait ObjectStore: Send + Sync {
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<ObjectMeta, StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// A byte range of the object; `length = None` reads to the end.
    fn get_range(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError>;
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Delete several keys; returns the count that existed.
    fn delete_many(&self, keys: &[String]) -> Result<u64, StoreError> {
        let mut deleted = 0;
        for key in keys {
            if self.delete(key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ObjectPage, StoreError>;

    fn set_expiration(
        &self,
        key: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    // Multipart upload: parts accumulate under an upload id until
    // completed or aborted.
    fn create_multipart(&self, key: &str) -> Result<String, StoreError>;
    fn upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        bytes: &[u8],
    ) -> Result<(), StoreError>;
    fn complete_multipart(&self, upload_id: &str) -> Result<ObjectMeta, StoreError>;
    fn abort_multipart(&self, upload_id: &str) -> Result<(), StoreError>;

    /// Delete objects uploaded before `older_than`. Sequential and
    /// non-atomic: the first failure aborts with earlier deletions
    /// kept.
    fn cleanup(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut deleted = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list("", 100, cursor.as_deref())?;
            for meta in &page.objects {
                if meta.uploaded_at < older_than {
                    self.delete(&meta.key)?;
                    deleted += 1;
                }
            }
            if !page.truncated {
                return Ok(deleted);
            }
            cursor = page.cursor;
        }
    }

    /// Delete objects whose `expires_at` has passed.
    fn cleanup_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut deleted = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list("", 100, cursor.as_deref())?;
            for meta in &page.objects {
                if meta.expires_at.is_some_and(|at| at <= now) {
                    self.delete(&meta.key)?;
                    deleted += 1;
                }
            }
            if !page.truncated {
                return Ok(deleted);
            }
            cursor = page.cursor;
        }
    }
}

/// Upload `bytes` in `chunk_size` parts, reporting progress as
/// `(uploaded, total)` after each part.
pub fn upload_multipart(
    store: &dyn ObjectStore,
    key: &str,
    bytes: &[u8],
    chunk_size: usize,
    mut progress: impl FnMut(u64, u64),
) -> Result<ObjectMeta, StoreError> {
    let chunk_size = chunk_size.max(1);
    let upload_id = store.create_multipart(key)?;
    let total = bytes.len() as u64;

    let mut uploaded = 0u64;
    for (index, chunk) in bytes.chunks(chunk_size).enumerate() {
        if let Err(err) = store.upload_part(&upload_id, index as u32 + 1, chunk) {
            store.abort_multipart(&upload_id)?;
            return Err(err);
        }
        uploaded += chunk.len() as u64;
        progress(uploaded, total);
    }
    store.complete_multipart(&upload_id)
}

/// Detached-signature provider for URL signing. Implemented by the
/// auth layer's token signer.
pub trait UrlSigner: Send + Sync {
    fn sign(&self, payload: &str) -> String;
    fn verify(&self, payload: &str, signature: &str) -> bool;
}

/// Build a signed URL of the form
/// `<base>/<key>?expires=<unix>&signature=<sig>`.
pub fn signed_url(signer: &dyn UrlSigner, base: &str, key: &str, ttl_seconds: u64) -> String {
    let expires = Utc::now().timestamp() + ttl_seconds as i64;
    let signature = signer.sign(&format!("{key}:{expires}"));
    format!("{base}/{key}?expires={expires}&signature={signature}")
}

/// Check a signed URL's components: signature must match and the
/// expiry must be in the future.
pub fn verify_signed_url(
    signer: &dyn UrlSigner,
    key: &str,
    expires: i64,
    signature: &str,
) -> bool {
    if expires <= Utc::now().timestamp() {
        return false;
    }
    signer.verify(&format!("{key}:{expires}"), signature)
}

struct StoredObject {
    bytes: Vec<u8>,
    meta: ObjectMeta,
}

struct Multipart {
    key: String,
    parts: BTreeMap<u32, Vec<u8>>,
}

/// In-memory [`ObjectStore`].
#[derive(Default)]
pub struct MemoryObjects {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    uploads: RwLock<BTreeMap<String, Multipart>>,
}

fn etag(bytes: &[u8]) -> String {
    hex(&Sha256::digest(bytes))
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    fn store_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> ObjectMeta {
        let meta = ObjectMeta {
            key: key.to_string(),
            size: bytes.len() as u64,
            etag: etag(&bytes),
            uploaded_at: Utc::now(),
            content_type: content_type.map(str::to_string),
            metadata,
            expires_at: None,
        };
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                meta: meta.clone(),
            },
        );
        debug!(key, size = meta.size, "stored object");
        meta
    }
}

impl ObjectStore for MemoryObjects {
    fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
        metadata: BTreeMap<String, String>,
    ) -> Result<ObjectMeta, StoreError> {
        Ok(self.store_object(key, bytes.to_vec(), content_type, metadata))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(key).map(|o| o.bytes.clone()))
    }

    fn get_range(
        &self,
        key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let Some(object) = objects.get(key) else {
            return Ok(None);
        };
        let start = (offset as usize).min(object.bytes.len());
        let end = match length {
            Some(len) => (start + len as usize).min(object.bytes.len()),
            None => object.bytes.len(),
        };
        Ok(Some(object.bytes[start..end].to_vec()))
    }

    fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.get(key).map(|o| o.meta.clone()))
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        Ok(objects.remove(key).is_some())
    }

    fn list(
        &self,
        prefix: &str,
        limit: usize,
        cursor: Option<&str>,
    ) -> Result<ObjectPage, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let metas: Vec<ObjectMeta> = objects
            .iter()
            .filter(|(key, _)| {
                key.starts_with(prefix) && cursor.is_none_or(|c| key.as_str() > c)
            })
            .map(|(_, object)| object.meta.clone())
            .take(limit + 1)
            .collect();

        let truncated = metas.len() > limit;
        let mut metas = metas;
        metas.truncate(limit);
        let cursor = if truncated {
            metas.last().map(|m| m.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: metas,
            cursor,
            truncated,
        })
    }

    fn set_expiration(
        &self,
        key: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        match objects.get_mut(key) {
            Some(object) => {
                object.meta.expires_at = expires_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_multipart(&self, key: &str) -> Result<String, StoreError> {
        let upload_id = etag(format!("{key}:{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)).as_bytes());
        let mut uploads = self.uploads.write().unwrap_or_else(PoisonError::into_inner);
        uploads.insert(
            upload_id.clone(),
            Multipart {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    fn upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        bytes: &[u8],
    ) -> Result<(), StoreError> {
        let mut uploads = self.uploads.write().unwrap_or_else(PoisonError::into_inner);
        let upload = uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UnknownUpload(upload_id.to_string()))?;
        upload.parts.insert(part_number, bytes.to_vec());
        Ok(())
    }

    fn complete_multipart(&self, upload_id: &str) -> Result<ObjectMeta, StoreError> {
        let upload = {
            let mut uploads = self.uploads.write().unwrap_or_else(PoisonError::into_inner);
            uploads
                .remove(upload_id)
                .ok_or_else(|| StoreError::UnknownUpload(upload_id.to_string()))?
        };
        let mut bytes = Vec::new();
        for part in upload.parts.values() {
            bytes.extend_from_slice(part);
        }
        Ok(self.store_object(&upload.key, bytes, None, BTreeMap::new()))
    }

    fn abort_multipart(&self, upload_id: &str) -> Result<(), StoreError> {
        let mut uploads = self.uploads.write().unwrap_or_else(PoisonError::into_inner);
        uploads.remove(upload_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn put_head_get_roundtrip() {
        let store = MemoryObjects::new();
        let meta = store
            .put("docs/a.txt", b"hello", Some("text/plain"), BTreeMap::new())
            .unwrap();
        assert_eq!(meta.size, 5);
        assert_eq!(store.get("docs/a.txt").unwrap().unwrap(), b"hello");
        let head = store.head("docs/a.txt").unwrap().unwrap();
        assert_eq!(head.etag, meta.etag);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn etag_tracks_content() {
        let store = MemoryObjects::new();
        let first = store.put("k", b"one", None, BTreeMap::new()).unwrap();
        let second = store.put("k", b"two", None, BTreeMap::new()).unwrap();
        assert_ne!(first.etag, second.etag);
    }

    #[test]
    fn range_reads_clamp() {
        let store = MemoryObjects::new();
        store.put("k", b"0123456789", None, BTreeMap::new()).unwrap();
        assert_eq!(store.get_range("k", 2, Some(3)).unwrap().unwrap(), b"234");
        assert_eq!(store.get_range("k", 8, None).unwrap().unwrap(), b"89");
        assert_eq!(store.get_range("k", 20, Some(5)).unwrap().unwrap(), b"");
    }

    #[test]
    fn multipart_assembles_in_part_order() {
        let store = MemoryObjects::new();
        let id = store.create_multipart("big").unwrap();
        store.upload_part(&id, 2, b"world").unwrap();
        store.upload_part(&id, 1, b"hello ").unwrap();
        let meta = store.complete_multipart(&id).unwrap();
        assert_eq!(meta.size, 11);
        assert_eq!(store.get("big").unwrap().unwrap(), b"hello world");
        assert!(matches!(
            store.upload_part(&id, 3, b"late"),
            Err(StoreError::UnknownUpload(_))
        ));
    }

    #[test]
    fn chunked_upload_reports_progress() {
        let store = MemoryObjects::new();
        let mut seen = Vec::new();
        upload_multipart(&store, "big", &[7u8; 10], 4, |done, total| {
            seen.push((done, total));
        })
        .unwrap();
        assert_eq!(seen, vec![(4, 10), (8, 10), (10, 10)]);
        assert_eq!(store.get("big").unwrap().unwrap().len(), 10);
    }

    #[test]
    fn cleanup_deletes_old_objects_only() {
        let store = MemoryObjects::new();
        store.put("old", b"x", None, BTreeMap::new()).unwrap();
        store.put("new", b"y", None, BTreeMap::new()).unwrap();
        {
            let mut objects = store.objects.write().unwrap();
            objects.get_mut("old").unwrap().meta.uploaded_at =
                Utc::now() - Duration::days(30);
        }
        let deleted = store.cleanup(Utc::now() - Duration::days(7)).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("new").unwrap().is_some());
    }

    #[test]
    fn cleanup_expired_honors_expiration() {
        let store = MemoryObjects::new();
        store.put("a", b"x", None, BTreeMap::new()).unwrap();
        store.put("b", b"y", None, BTreeMap::new()).unwrap();
        store
            .set_expiration("a", Some(Utc::now() - Duration::seconds(1)))
            .unwrap();
        assert_eq!(store.cleanup_expired().unwrap(), 1);
        assert!(store.get("a").unwrap().is_none());
    }

    struct StubSigner;

    impl UrlSigner for StubSigner {
        fn sign(&self, payload: &str) -> String {
            format!("sig-{payload}")
        }
        fn verify(&self, payload: &str, signature: &str) -> bool {
            signature == format!("sig-{payload}")
        }
    }

    #[test]
    fn signed_urls_verify_until_expiry() {
        let url = signed_url(&StubSigner, "https://files.test", "docs/a.txt", 300);
        assert!(url.starts_with("https://files.test/docs/a.txt?expires="));

        let expires = Utc::now().timestamp() + 300;
        let signature = StubSigner.sign(&format!("docs/a.txt:{expires}"));
        assert!(verify_signed_url(&StubSigner, "docs/a.txt", expires, &signature));
        assert!(!verify_signed_url(&StubSigner, "docs/b.txt", expires, &signature));
        assert!(!verify_signed_url(
            &StubSigner,
            "docs/a.txt",
            Utc::now().timestamp() - 1,
            &signature
        ));
    }
}
