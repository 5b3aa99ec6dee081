//! In-memory `ObjectStore` for tests
//!
//! Listing is paginated with a configurable page size, and individual keys
//! can be made to fail on delete or copy to exercise partial bulk failures.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::traits::{ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeSet<String>,
    objects: BTreeMap<(String, String), StoredObject>,
    failing_deletes: BTreeSet<String>,
    failing_copies: BTreeSet<String>,
    puts: usize,
}

/// Thread-safe in-memory bucket store
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<State>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 1000,
        }
    }

    /// Store holding one empty bucket
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::new();
        store.lock().buckets.insert(bucket.to_string());
        store
    }

    /// Limit listing pages to `page_size` keys
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.lock().objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Number of successful `put_object` calls
    pub fn put_count(&self) -> usize {
        self.lock().puts
    }

    /// Deleting `key` will report success without removing it
    pub fn fail_delete(&self, key: &str) {
        self.lock().failing_deletes.insert(key.to_string());
    }

    /// Copying from `key` will fail with a network error
    pub fn fail_copy(&self, key: &str) {
        self.lock().failing_copies.insert(key.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.lock().buckets.contains(bucket))
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .lock()
            .objects
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn put_object(&self, bucket: &str, key: &str, request: PutRequest) -> Result<()> {
        let body = tokio::fs::read(&request.source).await?;
        let mut state = self.lock();
        let id = (bucket.to_string(), key.to_string());
        if request.if_absent && state.objects.contains_key(&id) {
            return Err(Error::AlreadyExists(format!(
                "File: '{key}' already exists. This is to prevent overriding it."
            )));
        }
        state.objects.insert(
            id,
            StoredObject {
                body,
                content_type: request.content_type,
            },
        );
        state.puts += 1;
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        disposition: &str,
    ) -> Result<String> {
        Ok(format!(
            "memory://{bucket}/{key}?expires={}&disposition={disposition}",
            expires_in.as_secs()
        ))
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        let state = self.lock();
        if !state.buckets.contains(bucket) {
            return Err(Error::NotFound(format!("Bucket not found: {bucket}")));
        }

        let prefix = options.prefix.unwrap_or_default();
        let limit = options
            .max_keys
            .map(|m| (m.max(1) as usize).min(self.page_size))
            .unwrap_or(self.page_size);

        let mut matching = state
            .objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(&prefix))
            .filter(|((_, k), _)| match &options.continuation_token {
                Some(after) => k > after,
                None => true,
            })
            .map(|((_, k), _)| ObjectInfo::new(k.clone()));

        let items: Vec<ObjectInfo> = matching.by_ref().take(limit).collect();
        let truncated = matching.next().is_some();
        let continuation_token = if truncated {
            items.last().map(|i| i.key.clone())
        } else {
            None
        };

        Ok(ListResult {
            items,
            truncated,
            continuation_token,
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut state = self.lock();
        if state.failing_deletes.contains(key) {
            return Ok(());
        }
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()> {
        let mut state = self.lock();
        if state.failing_copies.contains(src_key) {
            return Err(Error::Network(format!("copy of '{src_key}' failed")));
        }
        let obj = state
            .objects
            .get(&(bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{src_key}")))?;
        state
            .objects
            .insert((bucket.to_string(), dst_key.to_string()), obj);
        Ok(())
    }

    async fn fetch_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let body = self
            .get(bucket, key)
            .ok_or_else(|| Error::NotFound(format!("{bucket}/{key}")))?
            .body;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }
}
