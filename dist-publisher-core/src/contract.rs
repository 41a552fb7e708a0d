//! # contract: storage interface used by the deploy pipeline
//!
//! This module defines the single trait ([`ObjectStorage`]) the pipeline uses to
//! talk to a bucket, and the plain data type describing one upload ([`PutObject`]).
//!
//! ## Interface & Extensibility
//! - Implement [`ObjectStorage`] for a new backend (S3, an in-memory fake, ...).
//! - All methods are async and return [`StorageError`], which tells the retry
//!   helper whether a failure is worth another attempt.
//! - The handle is constructed by the caller and passed down explicitly; nothing
//!   in the core reads credentials or global client configuration.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so `MockObjectStorage` is available in
//!   unit tests and, through the default `test-export-mocks` feature, to
//!   integration tests and dependent crates.

use async_trait::async_trait;
use bytes::Bytes;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

pub use crate::error::StorageError;

/// One object to write into a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    /// Object key, relative to the bucket root and `/`-separated.
    pub key: String,
    /// Full file contents.
    pub body: Bytes,
    /// `None` leaves the content type unset so the storage default applies.
    pub content_type: Option<String>,
    pub cache_control: String,
}

/// Trait for listing, deleting and writing objects in a named bucket.
///
/// Implementors own transport, authentication and pagination. The trait is
/// `Send + Sync` and meant to be shared by reference across concurrent uploads.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// List the keys of every object currently in the bucket.
    ///
    /// Implementations must return the complete listing, following pagination
    /// when the backend splits results into pages.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError>;

    /// Delete all of the given keys from the bucket in one bulk operation.
    ///
    /// Callers never pass an empty key set.
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StorageError>;

    /// Write one object, replacing any existing object with the same key.
    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StorageError>;
}
