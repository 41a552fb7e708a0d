#![doc = "S3 storage integration: bridges the core ObjectStorage trait to a real bucket client."]
//
//! # S3 Storage (CLI <-> Core)
//!
//! This module wires the [`ObjectStorage`] trait from `dist-publisher-core` to
//! Amazon S3 (or any S3-compatible endpoint) through the `object_store` crate.
//!
//! - Credentials come from the standard `AWS_*` environment variables, read by
//!   [`AmazonS3Builder::from_env`]. Region and endpoint overrides are passed in
//!   through [`StorageConfig`].
//! - One client is built lazily per bucket and cached for the rest of the run.
//! - Listings follow pagination; bulk deletes are chunked by the client.
//! - Object keys are used verbatim: `icon[1].png` is stored as `icon[1].png`.
//! - Errors are classified as transient (network, 5xx) or permanent (any 4xx,
//!   missing bucket, denied, unauthenticated) for the core retry policy.
//! - The client's own request retries are switched off; the deploy pipeline's
//!   retry settings are the only retry layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig};

use dist_publisher_core::contract::{ObjectStorage, PutObject, StorageError};

/// Connection overrides on top of the `AWS_*` environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub region: Option<String>,
    /// S3-compatible endpoint, e.g. a local MinIO. `http://` endpoints are allowed.
    pub endpoint: Option<String>,
}

pub struct S3Storage {
    config: StorageConfig,
    clients: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Storage {
    pub fn new(config: StorageConfig) -> Self {
        tracing::info!(
            region = config.region.as_deref().unwrap_or("from env"),
            endpoint = config.endpoint.as_deref().unwrap_or("default"),
            "Initialised S3 storage"
        );
        S3Storage {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| StorageError::Permanent("S3 client cache poisoned".to_string()))?;
        if let Some(client) = clients.get(bucket) {
            return Ok(client.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_retry(RetryConfig {
                max_retries: 0,
                ..Default::default()
            });
        if let Some(region) = &self.config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.config.endpoint {
            builder = builder.with_endpoint(endpoint);
            if endpoint.starts_with("http://") {
                builder = builder.with_allow_http(true);
            }
        }
        let client: Arc<dyn ObjectStore> = Arc::new(builder.build().map_err(|e| {
            tracing::error!(bucket, error = %e, "Failed to build S3 client");
            classify(e)
        })?);
        clients.insert(bucket.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        tracing::info!(bucket, "Listing bucket");
        let client = self.client(bucket)?;
        let keys: Vec<String> = client
            .list(None)
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(bucket, error = %e, "Error in bucket listing");
                classify(e)
            })?;
        tracing::info!(bucket, count = keys.len(), "Listed bucket");
        Ok(keys)
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StorageError> {
        tracing::info!(bucket, count = keys.len(), "Deleting objects");
        let client = self.client(bucket)?;
        let locations = keys
            .iter()
            .map(String::as_str)
            .map(location)
            .collect::<Result<Vec<_>, _>>()?;
        let locations = stream::iter(locations.into_iter().map(Ok::<_, object_store::Error>)).boxed();
        let deleted: Vec<ObjectPath> = client
            .delete_stream(locations)
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(bucket, error = %e, "Error in bucket removing");
                classify(e)
            })?;
        tracing::info!(bucket, count = deleted.len(), "Deleted objects");
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StorageError> {
        let client = self.client(bucket)?;

        let mut attributes = Attributes::new();
        if let Some(content_type) = object.content_type {
            attributes.insert(Attribute::ContentType, content_type.into());
        }
        attributes.insert(Attribute::CacheControl, object.cache_control.into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let location = location(&object.key)?;
        client
            .put_opts(&location, PutPayload::from(object.body), options)
            .await
            .map_err(|e| {
                tracing::error!(bucket, key = %object.key, error = %e, "Upload error");
                classify(e)
            })?;
        Ok(())
    }
}

/// The object location for `key`, taken verbatim.
///
/// `Path::from` would percent-encode characters such as `[` or `%` into the key.
fn location(key: &str) -> Result<ObjectPath, StorageError> {
    ObjectPath::parse(key).map_err(|e| {
        tracing::error!(key, error = %e, "Invalid object key");
        StorageError::Permanent(format!("invalid object key {key:?}: {e}"))
    })
}

/// Transport-level failures are worth retrying; everything that describes the
/// request itself (missing bucket, denied, bad path) is not.
///
/// S3 list and bulk-delete failures arrive as `Generic`, so those are checked
/// for a 4xx response status before being treated as transient.
fn classify(error: object_store::Error) -> StorageError {
    match error {
        object_store::Error::Generic { .. } if has_client_error_status(&error) => {
            StorageError::Permanent(error.to_string())
        }
        object_store::Error::Generic { .. } | object_store::Error::JoinError { .. } => {
            StorageError::Transient(error.to_string())
        }
        other => StorageError::Permanent(other.to_string()),
    }
}

const STATUS_MARKER: &str = "non-2xx status code: ";

/// True when a request in the error chain was answered with a 4xx status that
/// will not change on retry. Throttling (429) and request timeouts (408) will.
fn has_client_error_status(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(status) = response_status(&err.to_string()) {
            return (400..500).contains(&status) && status != 408 && status != 429;
        }
        current = err.source();
    }
    false
}

fn response_status(message: &str) -> Option<u16> {
    let (_, rest) = message.split_once(STATUS_MARKER)?;
    rest.get(..3)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_denied_are_permanent() {
        let not_found = object_store::Error::NotFound {
            path: "index.html".into(),
            source: "NoSuchBucket".into(),
        };
        assert!(!classify(not_found).is_transient());

        let denied = object_store::Error::PermissionDenied {
            path: "index.html".into(),
            source: "AccessDenied".into(),
        };
        assert!(!classify(denied).is_transient());
    }

    /// Error with a source, the shape object_store uses for failed requests.
    #[derive(Debug)]
    struct RequestFailed {
        operation: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    }

    impl std::fmt::Display for RequestFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Error performing {} request", self.operation)
        }
    }

    impl std::error::Error for RequestFailed {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(self.source.as_ref())
        }
    }

    fn generic_with_status(operation: &'static str, status: &str, body: &str) -> object_store::Error {
        object_store::Error::Generic {
            store: "S3",
            source: Box::new(RequestFailed {
                operation,
                source: format!("Server returned non-2xx status code: {status}: {body}").into(),
            }),
        }
    }

    #[test]
    fn generic_client_errors_are_permanent() {
        let missing = generic_with_status(
            "list",
            "404 Not Found",
            "<Error><Code>NoSuchBucket</Code></Error>",
        );
        assert!(!classify(missing).is_transient());

        let denied = generic_with_status(
            "bulk delete",
            "403 Forbidden",
            "<Error><Code>AccessDenied</Code></Error>",
        );
        assert!(!classify(denied).is_transient());
    }

    #[test]
    fn generic_server_errors_are_transient() {
        let unavailable = generic_with_status("list", "503 Service Unavailable", "SlowDown");
        assert!(classify(unavailable).is_transient());

        let throttled = generic_with_status("list", "429 Too Many Requests", "");
        assert!(classify(throttled).is_transient());
    }

    #[test]
    fn keys_with_reserved_characters_are_kept_verbatim() {
        for key in ["assets/icon[1].png", "fonts/a%20b.woff", "docs/a~b.txt", "x/{a}^b|c#d.js"] {
            assert_eq!(location(key).unwrap().to_string(), key);
        }
    }

    #[test]
    fn invalid_keys_are_permanent_errors() {
        for key in ["assets//app.js", "assets/../app.js", "bad\u{7}key.js"] {
            assert!(!location(key).unwrap_err().is_transient());
        }
    }

    #[test]
    fn generic_transport_errors_are_transient() {
        let err = object_store::Error::Generic {
            store: "S3",
            source: "connection reset by peer".into(),
        };
        assert!(classify(err).is_transient());
    }

    #[test]
    fn clients_are_cached_per_bucket() {
        let storage = S3Storage::new(StorageConfig {
            region: Some("eu-west-1".into()),
            endpoint: Some("http://localhost:9000".into()),
        });
        let a = storage.client("p-widgets").unwrap();
        let b = storage.client("p-widgets").unwrap();
        let c = storage.client("d-widgets").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
