//! Buckets - virtual, hierarchical file stores keyed by normalized paths.
//!
//! Everything that reads configuration or proto files goes through a
//! [`ReadBucket`]. Concrete buckets (in-memory, OS) are wrapped in views
//! ([`MappedBucket`], [`MultiBucket`], [`FallbackFileBucket`]) that are
//! cheap to construct; I/O only happens when a view is read.

pub mod fallback;
pub mod mapped;
pub mod mem;
pub mod multi;
pub mod os;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::util::normalpath::{self, NormalPathError};

pub use fallback::FallbackFileBucket;
pub use mapped::{MappedBucket, Mapper};
pub use mem::MemBucket;
pub use multi::MultiBucket;
pub use os::OsBucket;

/// Metadata for a single file in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Normalized path relative to the bucket root
    path: String,
    /// Human-readable location of the underlying file
    external_path: String,
}

impl ObjectInfo {
    pub fn new(path: impl Into<String>, external_path: impl Into<String>) -> Self {
        ObjectInfo {
            path: path.into(),
            external_path: external_path.into(),
        }
    }

    /// Path relative to the bucket root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Location of the underlying file, for messages.
    pub fn external_path(&self) -> &str {
        &self.external_path
    }

    /// The same object seen under another path.
    pub(crate) fn with_path(&self, path: impl Into<String>) -> Self {
        ObjectInfo {
            path: path.into(),
            external_path: self.external_path.clone(),
        }
    }
}

/// Errors from bucket operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: does not exist")]
    NotFound { path: String },

    #[error("{path} exists in multiple locations: {}", normalpath::quoted_list(.external_paths))]
    Duplicate {
        path: String,
        external_paths: Vec<String>,
    },

    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Path(#[from] NormalPathError),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        StorageError::NotFound { path: path.into() }
    }
}

/// Visitor passed to [`ReadBucket::walk`].
pub type WalkFn<'a> = dyn FnMut(&ObjectInfo) -> Result<(), StorageError> + 'a;

/// A read-only bucket.
pub trait ReadBucket: Send + Sync + fmt::Debug {
    /// Stat a file. Directories are not objects and report `NotFound`.
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError>;

    /// Read a file.
    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Visit every file at or below `prefix`.
    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError>;
}

/// A bucket that can also be written.
pub trait WriteBucket: ReadBucket {
    /// Write a file, replacing any existing content.
    fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError>;
}

/// Shared handle to a read bucket.
pub type ReadBucketRef = Arc<dyn ReadBucket>;

/// Whether a file exists.
pub fn exists(bucket: &dyn ReadBucket, path: &str) -> Result<bool, StorageError> {
    match bucket.stat(path) {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read a file, mapping `NotFound` to `None`.
pub fn get_if_exists(bucket: &dyn ReadBucket, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
    match bucket.get(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Collect every object at or below `prefix`, sorted by path.
pub fn all_object_infos(
    bucket: &dyn ReadBucket,
    prefix: &str,
) -> Result<Vec<ObjectInfo>, StorageError> {
    let mut infos = Vec::new();
    bucket.walk(prefix, &mut |info| {
        infos.push(info.clone());
        Ok(())
    })?;
    infos.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(infos)
}

/// Collect every path at or below `prefix`, sorted.
pub fn all_paths(bucket: &dyn ReadBucket, prefix: &str) -> Result<Vec<String>, StorageError> {
    Ok(all_object_infos(bucket, prefix)?
        .into_iter()
        .map(|info| info.path)
        .collect())
}
