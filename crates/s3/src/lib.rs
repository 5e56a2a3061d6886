//! xfer-s3: S3 adapter for the xfer transfer engine
//!
//! This crate implements the ObjectStore trait from xfer-core on top of
//! aws-sdk-s3. It works with AWS S3 and S3-compatible endpoints.

mod client;

pub use client::S3Client;
