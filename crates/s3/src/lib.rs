//! bgw-s3: aws-sdk-s3 backend for bucket-gateway
//!
//! Implements the `ObjectStore` trait from bgw-core on top of the AWS SDK.

mod client;

pub use client::S3Client;
