//! Prefix-mapped and filtered bucket views.

use crate::storage::{ObjectInfo, ReadBucket, ReadBucketRef, StorageError, WalkFn};
use crate::util::normalpath;

/// How a [`MappedBucket`] sees its inner bucket.
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    /// Subtree of the inner bucket that becomes the root
    prefix: String,
    /// Only paths with this extension are visible
    ext: Option<String>,
    /// Paths equal to or below any of these are hidden
    excludes: Vec<String>,
}

impl Mapper {
    /// View the subtree at `prefix` as the root.
    pub fn on_prefix(prefix: &str) -> Self {
        Mapper {
            prefix: normalpath::normalize(prefix),
            ext: None,
            excludes: Vec::new(),
        }
    }

    /// Only expose files with the given extension (including the dot).
    pub fn with_ext(mut self, ext: &str) -> Self {
        self.ext = Some(ext.to_string());
        self
    }

    /// Hide files equal to or contained in the given paths. Paths are
    /// relative to the mapped root.
    pub fn with_excludes<S: AsRef<str>>(mut self, excludes: &[S]) -> Self {
        self.excludes = excludes
            .iter()
            .map(|e| normalpath::normalize(e.as_ref()))
            .collect();
        self
    }

    fn matches(&self, path: &str) -> bool {
        if let Some(ext) = &self.ext {
            if normalpath::ext(path) != *ext {
                return false;
            }
        }
        !self
            .excludes
            .iter()
            .any(|exclude| normalpath::equals_or_contains_path(exclude, path))
    }
}

/// A view of another bucket through a [`Mapper`].
#[derive(Debug, Clone)]
pub struct MappedBucket {
    inner: ReadBucketRef,
    mapper: Mapper,
}

impl MappedBucket {
    pub fn new(inner: ReadBucketRef, mapper: Mapper) -> Self {
        MappedBucket { inner, mapper }
    }

    /// Shorthand for a plain prefix view.
    pub fn on_prefix(inner: ReadBucketRef, prefix: &str) -> Self {
        MappedBucket::new(inner, Mapper::on_prefix(prefix))
    }

    fn inner_path(&self, path: &str) -> Result<Option<String>, StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        if !self.mapper.matches(&path) {
            return Ok(None);
        }
        Ok(Some(normalpath::join(&[self.mapper.prefix.as_str(), path.as_str()])))
    }
}

impl ReadBucket for MappedBucket {
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError> {
        let Some(inner_path) = self.inner_path(path)? else {
            return Err(StorageError::not_found(path));
        };
        let info = self.inner.stat(&inner_path)?;
        Ok(info.with_path(normalpath::normalize(path)))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        match self.inner_path(path)? {
            Some(inner_path) => self.inner.get(&inner_path),
            None => Err(StorageError::not_found(path)),
        }
    }

    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let prefix = normalpath::normalize_and_validate(prefix)?;
        let inner_prefix = normalpath::join(&[self.mapper.prefix.as_str(), prefix.as_str()]);
        self.inner.walk(&inner_prefix, &mut |info| {
            let Ok(path) = normalpath::relativize(&self.mapper.prefix, info.path()) else {
                return Ok(());
            };
            if self.mapper.matches(&path) {
                f(&info.with_path(path))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{all_paths, MemBucket};
    use std::sync::Arc;

    fn module_bucket() -> ReadBucketRef {
        Arc::new(MemBucket::from_files([
            ("mod/buf.yaml", "version: v1"),
            ("mod/src/a.proto", "a"),
            ("mod/src/vendor/v.proto", "v"),
            ("mod/src/notes.txt", "n"),
            ("other/b.proto", "b"),
        ]))
    }

    #[test]
    fn test_prefix_view() {
        let bucket = MappedBucket::on_prefix(module_bucket(), "mod");
        assert_eq!(
            all_paths(&bucket, ".").unwrap(),
            vec!["buf.yaml", "src/a.proto", "src/notes.txt", "src/vendor/v.proto"]
        );
        assert_eq!(bucket.get("buf.yaml").unwrap(), b"version: v1");
        assert_eq!(bucket.stat("src/a.proto").unwrap().path(), "src/a.proto");
    }

    #[test]
    fn test_ext_and_excludes() {
        let bucket = MappedBucket::new(
            module_bucket(),
            Mapper::on_prefix("mod/src")
                .with_ext(".proto")
                .with_excludes(&["vendor"]),
        );
        assert_eq!(all_paths(&bucket, ".").unwrap(), vec!["a.proto"]);
        assert!(bucket.stat("notes.txt").unwrap_err().is_not_found());
        assert!(bucket.get("vendor/v.proto").unwrap_err().is_not_found());
    }
}
