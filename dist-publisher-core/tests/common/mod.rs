#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dist_publisher_core::contract::{ObjectStorage, PutObject, StorageError};

/// In-memory buckets keyed by name. Listing an unknown bucket fails like S3's NoSuchBucket.
#[derive(Default)]
pub struct MemoryStorage {
    buckets: Mutex<HashMap<String, BTreeMap<String, PutObject>>>,
    failing_keys: HashSet<String>,
    pub delete_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
}

impl MemoryStorage {
    pub fn with_buckets(names: &[&str]) -> Self {
        let storage = MemoryStorage::default();
        {
            let mut buckets = storage.buckets.lock().unwrap();
            for name in names {
                buckets.insert(name.to_string(), BTreeMap::new());
            }
        }
        storage
    }

    /// Puts of these keys fail permanently.
    pub fn failing_on(mut self, keys: &[&str]) -> Self {
        self.failing_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn seed(&self, bucket: &str, key: &str) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                PutObject {
                    key: key.to_string(),
                    body: bytes::Bytes::from_static(b"stale"),
                    content_type: None,
                    cache_control: String::new(),
                },
            );
    }

    pub fn snapshot(&self, bucket: &str) -> BTreeMap<String, PutObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .unwrap_or_default()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.snapshot(bucket).into_keys().collect()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.lock().unwrap();
        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .ok_or_else(|| StorageError::Permanent(format!("NoSuchBucket: {bucket}")))
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::Permanent(format!("NoSuchBucket: {bucket}")))?;
        for key in keys {
            objects.remove(&key);
        }
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> Result<(), StorageError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.contains(&object.key) {
            return Err(StorageError::Permanent(format!("AccessDenied: {}", object.key)));
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::Permanent(format!("NoSuchBucket: {bucket}")))?;
        objects.insert(object.key.clone(), object);
        Ok(())
    }
}

pub const WIDGETS_DESCRIPTOR: &str =
    r#"{"name":"widgets","meta":{"deploy":{"prefix":{"prod":"p-","dev":"d-"}}}}"#;

pub fn write_file(path: &Path, content: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Lay out a project with a marker, a descriptor and the given `dist/` files.
pub fn create_project(dir: &Path, descriptor: &str, dist_files: &[(&str, &[u8])]) -> PathBuf {
    write_file(&dir.join("gulpfile.js"), b"// build");
    write_file(&dir.join("package.json"), descriptor.as_bytes());
    for (rel, content) in dist_files {
        write_file(&dir.join("dist").join(rel), content);
    }
    dir.to_path_buf()
}

pub fn descriptor_for(name: &str) -> String {
    format!(r#"{{"name":"{name}","meta":{{"deploy":{{"prefix":{{"prod":"p-","dev":"d-"}}}}}}}}"#)
}
