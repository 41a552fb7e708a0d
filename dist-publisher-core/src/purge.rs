//! Bucket purge: remove every object before a fresh upload.

use tracing::{error, info};

use crate::config::RetrySettings;
use crate::contract::ObjectStorage;
use crate::error::{DeployError, DeployResult};
use crate::retry::with_retry;

/// Removes all objects in `bucket` and returns the keys that were deleted.
///
/// An empty listing skips the bulk delete entirely. Listing or delete failures
/// are [`DeployError::PurgeFailed`].
pub async fn empty_bucket<S>(
    storage: &S,
    bucket: &str,
    retry: &RetrySettings,
) -> DeployResult<Vec<String>>
where
    S: ObjectStorage + ?Sized,
{
    let purge_failed = |source| DeployError::PurgeFailed {
        bucket: bucket.to_string(),
        source,
    };

    let keys = with_retry(retry, "list_objects", || storage.list_objects(bucket))
        .await
        .map_err(|e| {
            error!(bucket, error = %e, "[PURGE][ERROR] Bucket listing failed");
            purge_failed(e)
        })?;

    if keys.is_empty() {
        info!(bucket, "[PURGE] Bucket already empty, nothing to delete");
        return Ok(keys);
    }

    info!(bucket, count = keys.len(), "[PURGE] Deleting objects");
    for key in &keys {
        info!(bucket, key = %key, "[PURGE] *");
    }

    with_retry(retry, "delete_objects", || {
        storage.delete_objects(bucket, keys.clone())
    })
    .await
    .map_err(|e| {
        error!(bucket, error = %e, "[PURGE][ERROR] Bulk delete failed");
        purge_failed(e)
    })?;

    info!(bucket, count = keys.len(), "[PURGE] Bucket emptied");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockObjectStorage;
    use crate::error::StorageError;

    fn retry() -> RetrySettings {
        RetrySettings {
            max_attempts: 2,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn empty_listing_issues_no_delete() {
        let mut storage = MockObjectStorage::new();
        storage.expect_list_objects().times(1).returning(|_| Ok(vec![]));
        storage.expect_delete_objects().never();

        let purged = empty_bucket(&storage, "d-widgets", &retry()).await.unwrap();
        assert!(purged.is_empty());
    }

    #[tokio::test]
    async fn deletes_every_listed_key_in_one_call() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_list_objects()
            .returning(|_| Ok(vec!["index.html".into(), "assets/app.js".into()]));
        storage
            .expect_delete_objects()
            .times(1)
            .withf(|bucket, keys| {
                bucket == "d-widgets" && keys == &["index.html".to_string(), "assets/app.js".to_string()]
            })
            .returning(|_, _| Ok(()));

        let purged = empty_bucket(&storage, "d-widgets", &retry()).await.unwrap();
        assert_eq!(purged.len(), 2);
    }

    #[tokio::test]
    async fn listing_failure_is_purge_failed() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_list_objects()
            .returning(|_| Err(StorageError::Permanent("NoSuchBucket".into())));
        storage.expect_delete_objects().never();

        let err = empty_bucket(&storage, "d-widgets", &retry()).await.unwrap_err();
        assert!(matches!(err, DeployError::PurgeFailed { ref bucket, .. } if bucket == "d-widgets"));
    }

    #[tokio::test]
    async fn transient_delete_failure_is_retried() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_list_objects()
            .returning(|_| Ok(vec!["index.html".into()]));
        let mut seq = mockall::Sequence::new();
        storage
            .expect_delete_objects()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StorageError::Transient("SlowDown".into())));
        storage
            .expect_delete_objects()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        empty_bucket(&storage, "d-widgets", &retry()).await.unwrap();
    }
}
