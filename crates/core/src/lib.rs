//! bgw-core: Core library for the bucket-gateway object storage wrapper
//!
//! This crate provides:
//! - `BucketGateway`: upload, download, delete and rename for objects and folders
//! - `ObjectStore` trait for the storage backend
//! - Key helpers and folder archive packaging
//! - Configuration management
//!
//! This crate is independent of any specific S3 SDK; `bgw-s3` supplies the
//! aws-sdk-s3 backend.

pub mod archive;
pub mod config;
pub mod error;
pub mod gateway;
pub mod key;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod traits;

pub use archive::{ArchiveStream, FolderArchive, ScratchDir};
pub use config::{BucketConfig, Config, ConfigManager, ServerConfig, TransferConfig};
pub use error::{Error, Result};
pub use gateway::{BucketGateway, BulkReport, GatewaySettings, ItemResult, PresignedDownload};
pub use traits::{ListOptions, ListResult, ObjectInfo, ObjectStore, PutRequest};
