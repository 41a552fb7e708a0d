//! Tree uploader: mirrors a local build-output directory into a bucket.
//!
//! Each directory is listed first, then its files are uploaded concurrently
//! while its subdirectories recurse concurrently. All uploads of one tree share
//! a semaphore so a large directory never opens more than
//! `max_concurrent_uploads` simultaneous requests.
//!
//! Failures are collected per file. A failed file never cancels its siblings;
//! the tree result is an error if any file failed.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::config::RetrySettings;
use crate::content_policy::{cache_control, content_type, extension_of};
use crate::contract::{ObjectStorage, PutObject};
use crate::error::{DeployError, DeployResult, FileUploadError, UploadCause};
use crate::retry::with_retry;

/// Upload every file under `root` to `bucket` and return the uploaded keys, sorted.
pub async fn upload_tree<S>(
    storage: &S,
    bucket: &str,
    root: &Path,
    max_concurrent_uploads: usize,
    retry: &RetrySettings,
) -> DeployResult<Vec<String>>
where
    S: ObjectStorage + ?Sized,
{
    let uploader = TreeUploader {
        storage,
        bucket,
        root,
        retry,
        permits: Semaphore::new(max_concurrent_uploads.max(1)),
    };

    let results = uploader.upload_dir(root.to_path_buf()).await;

    let mut uploaded = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(key) => uploaded.push(key),
            Err(failure) => failures.push(failure),
        }
    }

    if !failures.is_empty() {
        error!(
            bucket,
            failed = failures.len(),
            uploaded = uploaded.len(),
            "[UPLOAD][ERROR] Some files failed to upload"
        );
        return Err(DeployError::UploadFailed {
            bucket: bucket.to_string(),
            failures,
        });
    }

    uploaded.sort();
    info!(bucket, uploaded = uploaded.len(), "[UPLOAD] Tree uploaded");
    Ok(uploaded)
}

/// Object key for `file`: its path relative to `root`, `/`-separated.
///
/// The root directory's own name is not part of the key.
pub fn remote_key(root: &Path, file: &Path) -> Result<String, String> {
    let relative = file
        .strip_prefix(root)
        .map_err(|_| format!("{} is not under {}", file.display(), root.display()))?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| format!("non UTF-8 path component in {}", file.display()))?,
            ),
            Component::CurDir => {}
            other => return Err(format!("unexpected path component {other:?} in {}", file.display())),
        }
    }

    if parts.is_empty() {
        return Err(format!("{} is the build root itself", file.display()));
    }
    Ok(parts.join("/"))
}

struct TreeUploader<'a, S: ?Sized> {
    storage: &'a S,
    bucket: &'a str,
    root: &'a Path,
    retry: &'a RetrySettings,
    permits: Semaphore,
}

impl<'a, S> TreeUploader<'a, S>
where
    S: ObjectStorage + ?Sized,
{
    fn upload_dir(&self, dir: PathBuf) -> BoxFuture<'_, Vec<Result<String, FileUploadError>>> {
        async move {
            let (files, subdirs) = match read_listing(&dir).await {
                Ok(listing) => listing,
                Err(e) => {
                    error!(dir = %dir.display(), error = %e, "[UPLOAD][ERROR] Failed to list directory");
                    return vec![Err(FileUploadError {
                        path: dir,
                        cause: UploadCause::Read(e),
                    })];
                }
            };

            info!(
                bucket = self.bucket,
                dir = %dir.display(),
                files = ?files.iter().filter_map(|f| f.file_name()).collect::<Vec<_>>(),
                subdirs = subdirs.len(),
                "[UPLOAD] Attempting to upload directory"
            );

            let file_uploads = join_all(files.into_iter().map(|file| self.upload_file(file)));
            let nested = join_all(subdirs.into_iter().map(|sub| self.upload_dir(sub)));
            let (mut results, nested) = futures::join!(file_uploads, nested);
            results.extend(nested.into_iter().flatten());
            results
        }
        .boxed()
    }

    async fn upload_file(&self, path: PathBuf) -> Result<String, FileUploadError> {
        let key = match remote_key(self.root, &path) {
            Ok(key) => key,
            Err(reason) => {
                return Err(self.failed(path, UploadCause::Key(reason)));
            }
        };
        let extension = extension_of(&path);

        // The semaphore is owned by this uploader and never closed.
        let _permit = self.permits.acquire().await.ok();

        let body = match tokio::fs::read(&path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => return Err(self.failed(path, UploadCause::Read(e))),
        };

        let object = PutObject {
            key: key.clone(),
            body,
            content_type: content_type(&extension).map(String::from),
            cache_control: cache_control(&extension).to_string(),
        };
        debug!(
            bucket = self.bucket,
            key = %object.key,
            size = object.body.len(),
            content_type = object.content_type.as_deref().unwrap_or("unset"),
            cache_control = %object.cache_control,
            "[UPLOAD] Uploading file"
        );

        match with_retry(self.retry, "put_object", || {
            self.storage.put_object(self.bucket, object.clone())
        })
        .await
        {
            Ok(()) => {
                info!(bucket = self.bucket, key = %key, "[UPLOAD] Upload success");
                Ok(key)
            }
            Err(e) => Err(self.failed(path, UploadCause::Storage(e))),
        }
    }

    fn failed(&self, path: PathBuf, cause: UploadCause) -> FileUploadError {
        error!(
            bucket = self.bucket,
            file = %path.display(),
            error = %cause,
            "[UPLOAD][ERROR] File upload failed"
        );
        FileUploadError { path, cause }
    }
}

/// Files and subdirectories directly under `dir`, each sorted by path.
async fn read_listing(dir: &Path) -> std::io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            subdirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    subdirs.sort();
    Ok((files, subdirs))
}
