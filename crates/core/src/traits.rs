//! Storage backend abstraction
//!
//! `ObjectStore` is the seam between the gateway and a concrete SDK. It
//! stays independent of aws-sdk-s3 so gateway logic can be tested against
//! mocks or an in-memory store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// A listed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Zero-byte "folder" marker objects end with `/`
    pub fn is_dir_marker(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// Options for a single listing page
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Key prefix; `None` lists the whole bucket
    pub prefix: Option<String>,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub items: Vec<ObjectInfo>,
    pub truncated: bool,
    pub continuation_token: Option<String>,
}

/// Object body to store
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub source: PathBuf,
    pub content_type: String,
    /// Fail with `AlreadyExists` instead of overwriting, atomically on the backend
    pub if_absent: bool,
}

/// Operations the gateway consumes from a storage backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    /// Stream a local file to `key`
    async fn put_object(&self, bucket: &str, key: &str, request: PutRequest) -> Result<()>;

    /// Time-limited GET URL; `disposition` becomes the response Content-Disposition
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        disposition: &str,
    ) -> Result<String>;

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Server-side copy within the bucket
    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()>;

    /// Write the object body to `dest`, returning the number of bytes written
    async fn fetch_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64>;
}
