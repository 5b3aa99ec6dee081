//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from bgw-core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use bgw_core::{
    BucketConfig, Error, ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest, Result,
};
use tokio::io::AsyncWriteExt;

/// S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from the bucket configuration
    pub async fn new(bucket: &BucketConfig) -> Result<Self> {
        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            bucket.access_key.clone(),
            bucket.secret_key.clone(),
            None, // session token
            None, // expiry
            "bgw-static-credentials",
        );

        // Build SDK config
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(bucket.region.clone()));
        if let Some(endpoint) = &bucket.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;

        // Path-style addressing for S3-compatible services
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(bucket.path_style)
            .build();

        tracing::debug!(
            region = %bucket.region,
            endpoint = bucket.endpoint.as_deref().unwrap_or("aws"),
            path_style = bucket.path_style,
            "Built S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E>) -> String {
        match error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {}", err);
                // Try to extract additional error information from headers
                if let Some(code) = meta.headers().get("x-amz-error-code") {
                    msg.push_str(&format!(" (code: {})", code));
                }
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {:?}", err)
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {:?}", err)
            }
            SdkError::ResponseError(err) => {
                format!("Response error: {:?}", err)
            }
            _ => error.to_string(),
        }
    }

    fn status_of<E>(error: &SdkError<E>) -> Option<u16> {
        error.raw_response().map(|r| r.status().as_u16())
    }

    fn code_of<E: ProvideErrorMetadata>(error: &SdkError<E>) -> Option<&str> {
        error.as_service_error().and_then(|e| e.code())
    }

    fn is_not_found<E: ProvideErrorMetadata>(error: &SdkError<E>) -> bool {
        Self::status_of(error) == Some(404)
            || matches!(
                Self::code_of(error),
                Some("NotFound" | "NoSuchKey" | "NoSuchBucket")
            )
    }

    /// Map an SDK failure to a gateway error, prefixed with the operation
    fn map_sdk_error<E: std::fmt::Display>(op: &str, error: SdkError<E>) -> Error {
        let msg = format!("{op}: {}", Self::format_sdk_error(&error));
        match Self::status_of(&error) {
            Some(401) | Some(403) => Error::Auth(msg),
            _ => Error::Network(msg),
        }
    }
}

/// Encode a key for the `x-amz-copy-source` header, keeping `/` separators
fn encode_copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{bucket}/{}", encoded.join("/"))
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(Self::map_sdk_error("head_bucket", e)),
        }
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.inner.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(Self::map_sdk_error("head_object", e)),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, request: PutRequest) -> Result<()> {
        let body = ByteStream::from_path(&request.source).await.map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "reading '{}': {e}",
                request.source.display()
            )))
        })?;

        let mut builder = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(&request.content_type)
            .body(body);

        if request.if_absent {
            builder = builder.if_none_match("*");
        }

        builder.send().await.map_err(|e| {
            let lost_race = Self::status_of(&e) == Some(412)
                || matches!(
                    Self::code_of(&e),
                    Some("PreconditionFailed" | "ConditionalRequestConflict")
                );
            if request.if_absent && lost_race {
                Error::AlreadyExists(format!(
                    "File: '{key}' already exists. This is to prevent overriding it."
                ))
            } else {
                Self::map_sdk_error("put_object", e)
            }
        })?;

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        disposition: &str,
    ) -> Result<String> {
        let config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| Error::General(format!("presign_get config: {e}")))?;

        let request = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .response_content_disposition(disposition)
            .presigned(config)
            .await
            .map_err(|e| Error::General(format!("presign_get: {e}")))?;

        Ok(request.uri().to_string())
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);

        if let Some(prefix) = &options.prefix {
            request = request.prefix(prefix);
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| {
            if Self::is_not_found(&e) {
                Error::NotFound(format!("Bucket not found: {bucket}"))
            } else {
                Self::map_sdk_error("list_objects_v2", e)
            }
        })?;

        let items = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(ObjectInfo::new))
            .collect();

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error("delete_object", e))?;

        Ok(())
    }

    async fn copy_object(&self, bucket: &str, src_key: &str, dst_key: &str) -> Result<()> {
        self.inner
            .copy_object()
            .copy_source(encode_copy_source(bucket, src_key))
            .bucket(bucket)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    Error::NotFound(format!("{bucket}/{src_key}"))
                } else {
                    Self::map_sdk_error("copy_object", e)
                }
            })?;

        Ok(())
    }

    async fn fetch_object(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    Error::NotFound(format!("{bucket}/{key}"))
                } else {
                    Self::map_sdk_error("get_object", e)
                }
            })?;

        let mut body = response.body;
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Network(format!("get_object body: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
