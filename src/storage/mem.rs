//! In-memory bucket.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::storage::{ObjectInfo, ReadBucket, StorageError, WalkFn, WriteBucket};
use crate::util::normalpath;

/// A bucket backed by an in-memory map.
///
/// Used for remote module contents and throughout the tests.
#[derive(Debug, Default)]
pub struct MemBucket {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemBucket {
    /// Create a new empty bucket.
    pub fn new() -> Self {
        MemBucket::default()
    }

    /// Create a bucket holding the given files.
    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<Vec<u8>>,
    {
        let bucket = MemBucket::new();
        for (path, content) in files {
            bucket.add_file(path.as_ref(), content);
        }
        bucket
    }

    /// Add a file with the given content.
    pub fn add_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        let path = normalpath::normalize(path);
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path, content.into());
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl ReadBucket for MemBucket {
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        if files.contains_key(&path) {
            Ok(ObjectInfo::new(path.clone(), path))
        } else {
            Err(StorageError::not_found(path))
        }
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files
            .get(&path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(path))
    }

    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let prefix = normalpath::normalize_and_validate(prefix)?;
        // Snapshot so the visitor may read this bucket without deadlocking.
        let paths: Vec<String> = {
            let files = self.files.read().unwrap_or_else(|e| e.into_inner());
            files
                .keys()
                .filter(|path| normalpath::equals_or_contains_path(&prefix, path))
                .cloned()
                .collect()
        };
        for path in paths {
            f(&ObjectInfo::new(path.clone(), path))?;
        }
        Ok(())
    }
}

impl WriteBucket for MemBucket {
    fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path, data.to_vec());
        Ok(())
    }
}
