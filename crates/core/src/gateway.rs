//! Bucket gateway
//!
//! `BucketGateway` binds one bucket to a storage backend and exposes the
//! object and folder operations. Every mutation is guarded by an existence
//! check made immediately before it; the check and the mutation are separate
//! backend calls, so concurrent callers can interleave between them unless
//! conditional writes are enabled for uploads.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::archive::{self, FolderArchive, ScratchDir};
use crate::config::{DEFAULT_PRESIGN_EXPIRY_SECS, TransferConfig};
use crate::error::{Error, Result};
use crate::key;
use crate::traits::{ListOptions, ObjectStore, PutRequest};

/// Tunables applied to every operation of a gateway
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub presign_expiry: Duration,
    pub scratch_dir: Option<PathBuf>,
    pub conditional_writes: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            presign_expiry: Duration::from_secs(DEFAULT_PRESIGN_EXPIRY_SECS),
            scratch_dir: None,
            conditional_writes: false,
        }
    }
}

impl From<&TransferConfig> for GatewaySettings {
    fn from(config: &TransferConfig) -> Self {
        Self {
            presign_expiry: config.presign_expiry(),
            scratch_dir: config.scratch_dir.clone(),
            conditional_writes: config.conditional_writes,
        }
    }
}

/// A time-limited download link for one object
#[derive(Debug, Clone, Serialize)]
pub struct PresignedDownload {
    pub key: String,
    pub url: String,
    pub file_name: String,
    pub expires_at: Timestamp,
}

/// Outcome for one key of a folder operation
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-key results of a best-effort folder operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReport {
    pub items: Vec<ItemResult>,
}

impl BulkReport {
    fn record(&mut self, key: String, target: Option<String>, result: Result<()>) {
        let (success, message) = match result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        self.items.push(ItemResult {
            key,
            target,
            success,
            message,
        });
    }

    /// The aggregate flag: true only if every key succeeded
    pub fn all_succeeded(&self) -> bool {
        self.items.iter().all(|i| i.success)
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.success).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.items.iter().filter(|i| !i.success)
    }
}

/// Object and folder operations against a single bucket
#[derive(Clone)]
pub struct BucketGateway {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    region: String,
    settings: GatewaySettings,
}

impl std::fmt::Debug for BucketGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketGateway")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BucketGateway {
    /// Bind to `bucket`, failing if the backend does not know it
    pub async fn connect(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let region = region.into();

        if !store.bucket_exists(&bucket).await? {
            tracing::error!(bucket = %bucket, region = %region, "Bucket does not exist");
            return Err(Error::BucketNotFound(bucket));
        }

        tracing::debug!(bucket = %bucket, region = %region, "Gateway connected");
        Ok(Self {
            store,
            bucket,
            region,
            settings: GatewaySettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: GatewaySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.store.object_exists(&self.bucket, key).await
    }

    /// Upload a local file to `key`; never overwrites an existing object
    pub async fn upload_file(&self, key: &str, source: &Path, content_type: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey("object key cannot be empty".to_string()));
        }

        if self.exists(key).await? {
            tracing::warn!(bucket = %self.bucket, key, "Upload rejected, object exists");
            return Err(Error::AlreadyExists(format!(
                "File: '{key}' already exists. This is to prevent overriding it."
            )));
        }

        let request = PutRequest {
            source: source.to_path_buf(),
            content_type: content_type.to_string(),
            if_absent: self.settings.conditional_writes,
        };
        self.store.put_object(&self.bucket, key, request).await?;

        if self.exists(key).await? {
            tracing::info!(bucket = %self.bucket, key, content_type, "Uploaded object");
            Ok(())
        } else {
            tracing::warn!(bucket = %self.bucket, key, "Upload not visible after put");
            Err(Error::Unconfirmed(format!("File: '{key}' failed to upload")))
        }
    }

    /// Presign a GET for `key` with an attachment disposition
    pub async fn download_file(&self, key: &str) -> Result<PresignedDownload> {
        if !self.exists(key).await? {
            tracing::warn!(bucket = %self.bucket, key, "Download rejected, object missing");
            return Err(Error::NotFound(format!("File: '{key}' does not exist")));
        }

        let file_name = key::file_name(key).to_string();
        let disposition = format!("attachment; filename=\"{file_name}\"");
        let expiry = self.settings.presign_expiry;
        let url = self
            .store
            .presign_get(&self.bucket, key, expiry, &disposition)
            .await?;

        let expires_at = Timestamp::now()
            .checked_add(SignedDuration::from_secs(expiry.as_secs() as i64))
            .map_err(|e| Error::General(format!("computing URL expiry: {e}")))?;

        tracing::info!(bucket = %self.bucket, key, expires_secs = expiry.as_secs(), "Presigned download");
        Ok(PresignedDownload {
            key: key.to_string(),
            url,
            file_name,
            expires_at,
        })
    }

    /// Archive every object under `dir/`
    pub async fn download_folder(&self, dir: &str) -> Result<FolderArchive> {
        self.download_bucket(Some(dir)).await
    }

    /// Archive every object under `dir/`, or the whole bucket when `dir` is absent
    pub async fn download_bucket(&self, dir: Option<&str>) -> Result<FolderArchive> {
        let dir = dir.filter(|d| !d.is_empty());

        let source_prefix = match dir {
            Some(d) => {
                let prefix = key::folder_prefix(d);
                let probe = self
                    .store
                    .list_objects(
                        &self.bucket,
                        ListOptions {
                            prefix: Some(prefix.clone()),
                            max_keys: Some(1),
                            continuation_token: None,
                        },
                    )
                    .await?;
                if probe.items.is_empty() {
                    tracing::warn!(bucket = %self.bucket, prefix = %prefix, "Folder missing");
                    return Err(Error::FolderNotFound(format!(
                        "Folder: '{prefix}' does not exist."
                    )));
                }
                Some(prefix)
            }
            None => None,
        };

        let stem = key::archive_stem(dir, &self.bucket).to_string();
        let scratch = ScratchDir::create(self.settings.scratch_dir.as_deref())?;
        let tree = scratch.path().join("tree");
        tokio::fs::create_dir_all(&tree).await?;

        let fetched = self.transfer_tree(source_prefix.as_deref(), &tree).await?;

        let file_name = format!("{stem}.tar.gz");
        let archive_path = scratch.path().join(&file_name);
        let size = tokio::task::spawn_blocking({
            let archive_path = archive_path.clone();
            move || archive::build_tar_gz(&tree, &archive_path)
        })
        .await
        .map_err(|e| Error::Archive(format!("archive task failed: {e}")))??;

        tracing::info!(
            bucket = %self.bucket,
            prefix = source_prefix.as_deref().unwrap_or(""),
            objects = fetched,
            archive = %file_name,
            size,
            "Packaged folder"
        );
        Ok(FolderArchive::new(scratch, archive_path, file_name, size))
    }

    /// Copy every object under `prefix` into `dest`, keeping relative paths
    async fn transfer_tree(&self, prefix: Option<&str>, dest: &Path) -> Result<usize> {
        let mut continuation_token: Option<String> = None;
        let mut fetched = 0;

        loop {
            let page = self
                .store
                .list_objects(
                    &self.bucket,
                    ListOptions {
                        prefix: prefix.map(str::to_string),
                        max_keys: None,
                        continuation_token: continuation_token.take(),
                    },
                )
                .await?;

            for object in &page.items {
                let relative = match key::relative_key(&object.key, prefix.unwrap_or("")) {
                    Ok(Some(relative)) => relative,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(key = %object.key, error = %e, "Skipping object");
                        continue;
                    }
                };

                let target = dest.join(relative);
                if object.is_dir_marker() {
                    tokio::fs::create_dir_all(&target).await?;
                    continue;
                }
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }

                let bytes = self
                    .store
                    .fetch_object(&self.bucket, &object.key, &target)
                    .await?;
                tracing::debug!(key = %object.key, bytes, "Fetched object");
                fetched += 1;
            }

            if page.truncated && page.continuation_token.is_some() {
                continuation_token = page.continuation_token;
            } else {
                break;
            }
        }

        Ok(fetched)
    }

    /// Every key under `prefix`; fails when a listing page comes back empty
    async fn list_folder(&self, prefix: &str) -> Result<Vec<String>> {
        let mut continuation_token: Option<String> = None;
        let mut keys = Vec::new();

        loop {
            let page = self
                .store
                .list_objects(
                    &self.bucket,
                    ListOptions {
                        prefix: Some(prefix.to_string()),
                        max_keys: None,
                        continuation_token: continuation_token.take(),
                    },
                )
                .await?;

            if page.items.is_empty() {
                tracing::warn!(bucket = %self.bucket, prefix, "Folder missing");
                return Err(Error::FolderNotFound(format!(
                    "Folder: '{prefix}' does not exist."
                )));
            }
            keys.extend(page.items.into_iter().map(|o| o.key));

            if page.truncated && page.continuation_token.is_some() {
                continuation_token = page.continuation_token;
            } else {
                break;
            }
        }

        Ok(keys)
    }

    /// Delete `key` and confirm it is gone
    pub async fn delete_file(&self, key: &str) -> Result<()> {
        if !self.exists(key).await? {
            tracing::warn!(bucket = %self.bucket, key, "Delete rejected, object missing");
            return Err(Error::NotFound(format!("File: '{key}' does not exist")));
        }

        self.store.delete_object(&self.bucket, key).await?;

        if self.exists(key).await? {
            tracing::warn!(bucket = %self.bucket, key, "Object still present after delete");
            Err(Error::Unconfirmed(format!("Error deleting: '{key}'")))
        } else {
            tracing::info!(bucket = %self.bucket, key, "Deleted object");
            Ok(())
        }
    }

    /// Delete every object under `dir/`, continuing past individual failures
    pub async fn delete_folder(&self, dir: &str) -> Result<BulkReport> {
        let keys = self.list_folder(&key::folder_prefix(dir)).await?;

        let mut report = BulkReport::default();
        for key in keys {
            let result = self.delete_file(&key).await;
            report.record(key, None, result);
        }

        tracing::info!(
            bucket = %self.bucket,
            dir,
            deleted = report.succeeded(),
            total = report.items.len(),
            "Deleted folder"
        );
        Ok(report)
    }

    /// Server-side copy to `new` followed by deletion of `old`; not atomic
    pub async fn rename_file(&self, old: &str, new: &str) -> Result<()> {
        if !self.exists(old).await? {
            tracing::warn!(bucket = %self.bucket, old, "Rename rejected, source missing");
            return Err(Error::NotFound(format!("File: '{old}' does not exist")));
        }
        if old == new {
            return Err(Error::SameName(format!(
                "New name is same as old name on File: '{old}'"
            )));
        }
        if new.is_empty() {
            return Err(Error::InvalidKey("object key cannot be empty".to_string()));
        }
        if self.exists(new).await? {
            tracing::warn!(bucket = %self.bucket, new, "Rename rejected, target exists");
            return Err(Error::AlreadyExists(format!(
                "File: '{new}' already exists. This is to prevent overriding it."
            )));
        }

        self.store.copy_object(&self.bucket, old, new).await?;

        let renamed = if self.exists(new).await? {
            match self.delete_file(old).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(bucket = %self.bucket, old, error = %e, "Copied but source not removed");
                    false
                }
            }
        } else {
            false
        };

        if renamed {
            tracing::info!(bucket = %self.bucket, old, new, "Renamed object");
            Ok(())
        } else {
            Err(Error::Unconfirmed(format!(
                "Failed to rename File: '{old}' to '{new}'"
            )))
        }
    }

    /// Rename every object under `old/`, substituting `old` with `new` in each key
    pub async fn rename_folder(&self, old: &str, new: &str) -> Result<BulkReport> {
        if old.is_empty() {
            return Err(Error::InvalidKey("folder name cannot be empty".to_string()));
        }
        if old == new {
            return Err(Error::SameName(format!(
                "New name is same as old name on File: '{old}'"
            )));
        }

        let keys = self.list_folder(&key::folder_prefix(old)).await?;

        let mut report = BulkReport::default();
        for key in keys {
            let target = key::renamed_key(&key, old, new);
            let result = self.rename_file(&key, &target).await;
            report.record(key, Some(target), result);
        }

        tracing::info!(
            bucket = %self.bucket,
            old,
            new,
            renamed = report.succeeded(),
            total = report.items.len(),
            "Renamed folder"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::{ListResult, MockObjectStore, ObjectInfo};
    use flate2::read::GzDecoder;
    use std::collections::BTreeMap;
    use std::io::{Read, Write};
    use tempfile::{NamedTempFile, TempDir};

    const BUCKET: &str = "test-bucket";

    async fn gateway_with(store: Arc<MemoryStore>) -> BucketGateway {
        BucketGateway::connect(store, BUCKET, "us-east-1")
            .await
            .unwrap()
    }

    fn source_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn archive_contents(path: &Path) -> BTreeMap<String, String> {
        let file = std::fs::File::open(path).unwrap();
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        let mut out = BTreeMap::new();
        for entry in tar.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.header().entry_type().is_file() {
                let name = entry
                    .path()
                    .unwrap()
                    .to_string_lossy()
                    .trim_start_matches("./")
                    .to_string();
                let mut body = String::new();
                entry.read_to_string(&mut body).unwrap();
                out.insert(name, body);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_connect_missing_bucket_is_fatal() {
        let store = Arc::new(MemoryStore::with_bucket("other"));
        let err = BucketGateway::connect(store, BUCKET, "us-east-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BucketNotFound(ref b) if b == BUCKET));
    }

    #[tokio::test]
    async fn test_upload_new_key() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        let gateway = gateway_with(store.clone()).await;
        let file = source_file(b"hello");

        gateway
            .upload_file("docs/hello.txt", file.path(), "text/plain")
            .await
            .unwrap();

        let stored = store.get(BUCKET, "docs/hello.txt").unwrap();
        assert_eq!(stored.body, b"hello");
        assert_eq!(stored.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_upload_existing_key_makes_no_mutation() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_object_exists().returning(|_, _| Ok(true));
        mock.expect_put_object().never();

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();
        let file = source_file(b"new");

        let err = gateway
            .upload_file("a.txt", file.path(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(
            err.to_string(),
            "File: 'a.txt' already exists. This is to prevent overriding it."
        );
    }

    #[tokio::test]
    async fn test_upload_unconfirmed_when_post_check_fails() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_object_exists().times(2).returning(|_, _| Ok(false));
        mock.expect_put_object()
            .times(1)
            .withf(|bucket, key, req| {
                bucket == BUCKET && key == "a.txt" && req.content_type == "text/plain"
            })
            .returning(|_, _, _| Ok(()));

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();
        let file = source_file(b"x");

        let err = gateway
            .upload_file("a.txt", file.path(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unconfirmed(_)));
        assert_eq!(err.to_string(), "File: 'a.txt' failed to upload");
    }

    #[tokio::test]
    async fn test_upload_passes_conditional_flag() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_object_exists()
            .times(1)
            .returning(|_, _| Ok(false));
        mock.expect_put_object()
            .withf(|_, _, req| req.if_absent)
            .returning(|_, key, _| {
                Err(Error::AlreadyExists(format!(
                    "File: '{key}' already exists. This is to prevent overriding it."
                )))
            });

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap()
            .with_settings(GatewaySettings {
                conditional_writes: true,
                ..Default::default()
            });
        let file = source_file(b"x");

        let err = gateway
            .upload_file("race.txt", file.path(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_concurrent_conditional_uploads_have_one_winner() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        let gateway = gateway_with(store.clone()).await.with_settings(GatewaySettings {
            conditional_writes: true,
            ..Default::default()
        });
        let first = source_file(b"first");
        let second = source_file(b"second");

        let a = {
            let gateway = gateway.clone();
            let path = first.path().to_path_buf();
            tokio::spawn(async move { gateway.upload_file("same", &path, "text/plain").await })
        };
        let b = {
            let gateway = gateway.clone();
            let path = second.path().to_path_buf();
            tokio::spawn(async move { gateway.upload_file("same", &path, "text/plain").await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(Error::AlreadyExists(_))))
        );
        assert_eq!(store.put_count(), 1);
    }

    /// Holds each `put_object` until every upload in the test has reached it
    struct GatedStore {
        inner: MemoryStore,
        gate: tokio::sync::Barrier,
    }

    #[async_trait::async_trait]
    impl ObjectStore for GatedStore {
        async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
            self.inner.bucket_exists(bucket).await
        }

        async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
            self.inner.object_exists(bucket, key).await
        }

        async fn put_object(&self, bucket: &str, key: &str, request: PutRequest) -> Result<()> {
            self.gate.wait().await;
            self.inner.put_object(bucket, key, request).await
        }

        async fn presign_get(
            &self,
            bucket: &str,
            key: &str,
            expires_in: Duration,
            disposition: &str,
        ) -> Result<String> {
            self.inner
                .presign_get(bucket, key, expires_in, disposition)
                .await
        }

        async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
            self.inner.list_objects(bucket, options).await
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
            self.inner.delete_object(bucket, key).await
        }

        async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()> {
            self.inner.copy_object(bucket, src_key, dst_key).await
        }

        async fn fetch_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
            self.inner.fetch_object(bucket, key, dest).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_unconditional_uploads_last_write_wins() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::with_bucket(BUCKET),
            gate: tokio::sync::Barrier::new(2),
        });
        let gateway = BucketGateway::connect(store.clone(), BUCKET, "us-east-1")
            .await
            .unwrap();
        assert!(!gateway.settings().conditional_writes);
        let first = source_file(b"first");
        let second = source_file(b"second");

        // Both uploads pass the existence check before either one writes.
        let (a, b) = tokio::join!(
            gateway.upload_file("same", first.path(), "text/plain"),
            gateway.upload_file("same", second.path(), "text/plain"),
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(store.inner.put_count(), 2);
        let body = store.inner.get(BUCKET, "same").unwrap().body;
        assert!(body == b"first" || body == b"second");
    }

    #[tokio::test]
    async fn test_upload_empty_key_rejected() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        let gateway = gateway_with(store.clone()).await;
        let file = source_file(b"x");

        let err = gateway
            .upload_file("", file.path(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_download_missing_key_fails() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_object_exists().returning(|_, _| Ok(false));
        mock.expect_presign_get().never();

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();
        let err = gateway.download_file("nope.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "File: 'nope.txt' does not exist");
    }

    #[tokio::test]
    async fn test_download_presigns_with_file_name() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_object_exists().returning(|_, _| Ok(true));
        mock.expect_presign_get()
            .times(1)
            .withf(|bucket, key, expires, disposition| {
                bucket == BUCKET
                    && key == "reports/2024/q1.pdf"
                    && *expires == Duration::from_secs(1200)
                    && disposition == "attachment; filename=\"q1.pdf\""
            })
            .returning(|_, _, _, _| Ok("https://signed.example/q1".to_string()));

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();
        let before = Timestamp::now();
        let download = gateway.download_file("reports/2024/q1.pdf").await.unwrap();

        assert_eq!(download.url, "https://signed.example/q1");
        assert_eq!(download.file_name, "q1.pdf");
        assert!(download.expires_at >= before + SignedDuration::from_secs(1200));
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "a.txt", b"a");
        let gateway = gateway_with(store.clone()).await;

        gateway.delete_file("a.txt").await.unwrap();
        assert!(store.get(BUCKET, "a.txt").is_none());

        let err = gateway.delete_file("a.txt").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "File: 'a.txt' does not exist");
    }

    #[tokio::test]
    async fn test_delete_unconfirmed() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "sticky", b"s");
        store.fail_delete("sticky");
        let gateway = gateway_with(store).await;

        let err = gateway.delete_file("sticky").await.unwrap_err();
        assert_eq!(err.to_string(), "Error deleting: 'sticky'");
    }

    #[tokio::test]
    async fn test_rename_rejections() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "a.txt", b"a");
        store.insert(BUCKET, "b.txt", b"b");
        let gateway = gateway_with(store.clone()).await;

        let err = gateway.rename_file("missing", "x").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = gateway.rename_file("a.txt", "a.txt").await.unwrap_err();
        assert!(matches!(err, Error::SameName(_)));
        assert_eq!(
            err.to_string(),
            "New name is same as old name on File: 'a.txt'"
        );

        let err = gateway.rename_file("a.txt", "b.txt").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));

        assert_eq!(store.get(BUCKET, "a.txt").unwrap().body, b"a");
        assert_eq!(store.get(BUCKET, "b.txt").unwrap().body, b"b");
    }

    #[tokio::test]
    async fn test_rename_moves_content() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "old/name.txt", b"payload");
        let gateway = gateway_with(store.clone()).await;

        gateway
            .rename_file("old/name.txt", "new/name.txt")
            .await
            .unwrap();

        assert!(store.get(BUCKET, "old/name.txt").is_none());
        assert_eq!(store.get(BUCKET, "new/name.txt").unwrap().body, b"payload");
    }

    #[tokio::test]
    async fn test_rename_leaves_both_keys_when_delete_fails() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "src", b"1");
        store.fail_delete("src");
        let gateway = gateway_with(store.clone()).await;

        let err = gateway.rename_file("src", "dst").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to rename File: 'src' to 'dst'");
        assert!(store.get(BUCKET, "src").is_some());
        assert!(store.get(BUCKET, "dst").is_some());
    }

    #[tokio::test]
    async fn test_delete_folder_paginates_and_removes_all() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET).page_size(2));
        for key in ["logs/1", "logs/2", "logs/3", "logs/sub/4", "logsx/keep", "keep"] {
            store.insert(BUCKET, key, b"x");
        }
        let gateway = gateway_with(store.clone()).await;

        let report = gateway.delete_folder("logs").await.unwrap();

        assert!(report.all_succeeded());
        assert_eq!(report.items.len(), 4);
        assert_eq!(store.keys(BUCKET), vec!["keep", "logsx/keep"]);
    }

    #[tokio::test]
    async fn test_delete_folder_is_best_effort() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        for key in ["d/a", "d/b", "d/c"] {
            store.insert(BUCKET, key, b"x");
        }
        store.fail_delete("d/b");
        let gateway = gateway_with(store.clone()).await;

        let report = gateway.delete_folder("d").await.unwrap();

        assert!(!report.all_succeeded());
        assert_eq!(report.succeeded(), 2);
        let failed: Vec<&str> = report.failures().map(|i| i.key.as_str()).collect();
        assert_eq!(failed, vec!["d/b"]);
        assert_eq!(store.keys(BUCKET), vec!["d/b"]);
    }

    #[tokio::test]
    async fn test_empty_folder_operations_fail_without_mutation() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_list_objects()
            .withf(|_, opts| opts.prefix.as_deref() == Some("empty/"))
            .returning(|_, _| Ok(ListResult::default()));
        mock.expect_delete_object().never();
        mock.expect_copy_object().never();

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();

        let err = gateway.delete_folder("empty").await.unwrap_err();
        assert_eq!(err.to_string(), "Folder: 'empty/' does not exist.");

        let err = gateway.rename_folder("empty", "full").await.unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));
    }

    #[tokio::test]
    async fn test_rename_folder() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "a/b/x", b"x");
        store.insert(BUCKET, "a/b/y", b"y");
        let gateway = gateway_with(store.clone()).await;

        let report = gateway.rename_folder("a/b", "a/c").await.unwrap();

        assert!(report.all_succeeded());
        assert_eq!(store.keys(BUCKET), vec!["a/c/x", "a/c/y"]);
        assert_eq!(store.get(BUCKET, "a/c/y").unwrap().body, b"y");
        assert_eq!(report.items[0].target.as_deref(), Some("a/c/x"));
    }

    #[tokio::test]
    async fn test_rename_folder_substitutes_recurring_prefix() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "a/b/a/b/z", b"z");
        let gateway = gateway_with(store.clone()).await;

        let report = gateway.rename_folder("a/b", "a/c").await.unwrap();

        assert!(report.all_succeeded());
        assert_eq!(store.keys(BUCKET), vec!["a/c/a/c/z"]);
    }

    #[tokio::test]
    async fn test_rename_folder_same_name() {
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_list_objects().never();

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap();
        let err = gateway.rename_folder("a", "a").await.unwrap_err();
        assert!(matches!(err, Error::SameName(_)));
    }

    #[tokio::test]
    async fn test_rename_folder_empty_name_makes_no_mutation() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "/foo", b"foo");
        store.insert(BUCKET, "docs/a.txt", b"a");
        let gateway = gateway_with(store.clone()).await;

        let err = gateway.rename_folder("", "x").await.unwrap_err();

        assert!(matches!(err, Error::InvalidKey(_)));
        assert_eq!(store.keys(BUCKET), vec!["/foo", "docs/a.txt"]);
    }

    #[tokio::test]
    async fn test_rename_folder_partial_failure() {
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "p/1", b"1");
        store.insert(BUCKET, "p/2", b"2");
        store.insert(BUCKET, "q/2", b"taken");
        store.fail_copy("p/1");
        let gateway = gateway_with(store.clone()).await;

        let report = gateway.rename_folder("p", "q").await.unwrap();

        assert!(!report.all_succeeded());
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(store.keys(BUCKET), vec!["p/1", "p/2", "q/2"]);
    }

    #[tokio::test]
    async fn test_download_folder_archive() {
        let scratch_root = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::with_bucket(BUCKET).page_size(1));
        store.insert(BUCKET, "projects/site/index.html", b"<html>");
        store.insert(BUCKET, "projects/site/css/main.css", b"body{}");
        store.insert(BUCKET, "projects/site/empty/", b"");
        store.insert(BUCKET, "projects/other.txt", b"other");
        let gateway = gateway_with(store).await.with_settings(GatewaySettings {
            scratch_dir: Some(scratch_root.path().to_path_buf()),
            ..Default::default()
        });

        let archive = gateway.download_folder("projects/site").await.unwrap();
        assert_eq!(archive.file_name(), "site.tar.gz");
        assert_eq!(
            archive.size(),
            std::fs::metadata(archive.path()).unwrap().len()
        );

        let contents = archive_contents(archive.path());
        assert_eq!(contents.len(), 2);
        assert_eq!(contents["index.html"], "<html>");
        assert_eq!(contents["css/main.css"], "body{}");

        archive.close().unwrap();
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_whole_bucket() {
        let scratch_root = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "a.txt", b"a");
        store.insert(BUCKET, "dir/b.txt", b"b");
        let gateway = gateway_with(store).await.with_settings(GatewaySettings {
            scratch_dir: Some(scratch_root.path().to_path_buf()),
            ..Default::default()
        });

        let archive = gateway.download_bucket(None).await.unwrap();
        assert_eq!(archive.file_name(), "test-bucket.tar.gz");

        let contents = archive_contents(archive.path());
        assert_eq!(contents["a.txt"], "a");
        assert_eq!(contents["dir/b.txt"], "b");

        drop(archive);
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_missing_folder_creates_nothing() {
        let scratch_root = TempDir::new().unwrap();
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_list_objects()
            .times(1)
            .withf(|_, opts| opts.prefix.as_deref() == Some("ghost/") && opts.max_keys == Some(1))
            .returning(|_, _| Ok(ListResult::default()));
        mock.expect_fetch_object().never();

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap()
            .with_settings(GatewaySettings {
                scratch_dir: Some(scratch_root.path().to_path_buf()),
                ..Default::default()
            });

        let err = gateway.download_folder("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "Folder: 'ghost/' does not exist.");
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_download_cleans_scratch_on_fetch_error() {
        let scratch_root = TempDir::new().unwrap();
        let mut mock = MockObjectStore::new();
        mock.expect_bucket_exists().returning(|_| Ok(true));
        mock.expect_list_objects().returning(|_, _| {
            Ok(ListResult {
                items: vec![ObjectInfo::new("f/a")],
                truncated: false,
                continuation_token: None,
            })
        });
        mock.expect_fetch_object()
            .returning(|_, _, _| Err(Error::Network("connection reset".to_string())));

        let gateway = BucketGateway::connect(Arc::new(mock), BUCKET, "us-east-1")
            .await
            .unwrap()
            .with_settings(GatewaySettings {
                scratch_dir: Some(scratch_root.path().to_path_buf()),
                ..Default::default()
            });

        let err = gateway.download_folder("f").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(std::fs::read_dir(scratch_root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_folder_downloads_do_not_collide() {
        let scratch_root = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        store.insert(BUCKET, "shared/one.txt", b"1");
        let gateway = gateway_with(store).await.with_settings(GatewaySettings {
            scratch_dir: Some(scratch_root.path().to_path_buf()),
            ..Default::default()
        });

        let (a, b) = tokio::join!(
            gateway.download_folder("shared"),
            gateway.download_folder("shared")
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.path(), b.path());
        assert_eq!(archive_contents(a.path())["one.txt"], "1");
        assert_eq!(archive_contents(b.path())["one.txt"], "1");
    }
}
