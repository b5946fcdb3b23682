//! Single-file bucket resolved from an ordered candidate list.

use crate::storage::{ObjectInfo, ReadBucket, ReadBucketRef, StorageError, WalkFn};
use crate::util::normalpath;

/// Exposes at most one file: the first candidate that exists, under its
/// base name.
///
/// Doc and license overlays use this to prefer a module's own file and fall
/// back to the workspace-level one. Candidates are checked on every read.
#[derive(Debug, Clone, Default)]
pub struct FallbackFileBucket {
    candidates: Vec<(ReadBucketRef, String)>,
}

impl FallbackFileBucket {
    pub fn new() -> Self {
        FallbackFileBucket::default()
    }

    /// Append a candidate file in `bucket`.
    pub fn with_candidate(mut self, bucket: ReadBucketRef, path: &str) -> Self {
        self.candidates.push((bucket, normalpath::normalize(path)));
        self
    }

    fn resolve(&self) -> Result<Option<(usize, ObjectInfo)>, StorageError> {
        for (idx, (bucket, path)) in self.candidates.iter().enumerate() {
            match bucket.stat(path) {
                Ok(info) => return Ok(Some((idx, info.with_path(normalpath::base(path))))),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

impl ReadBucket for FallbackFileBucket {
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        match self.resolve()? {
            Some((_, info)) if info.path() == path => Ok(info),
            _ => Err(StorageError::not_found(path)),
        }
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        match self.resolve()? {
            Some((idx, info)) if info.path() == path => {
                let (bucket, candidate_path) = &self.candidates[idx];
                bucket.get(candidate_path)
            }
            _ => Err(StorageError::not_found(path)),
        }
    }

    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let prefix = normalpath::normalize_and_validate(prefix)?;
        if let Some((_, info)) = self.resolve()? {
            if normalpath::equals_or_contains_path(&prefix, info.path()) {
                f(&info)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{all_paths, MemBucket};
    use std::sync::Arc;

    #[test]
    fn test_prefers_first_existing_candidate() {
        let module: ReadBucketRef = Arc::new(MemBucket::from_files([("README.md", "module")]));
        let workspace: ReadBucketRef = Arc::new(MemBucket::from_files([("buf.md", "workspace")]));

        let bucket = FallbackFileBucket::new()
            .with_candidate(module.clone(), "buf.md")
            .with_candidate(module, "README.md")
            .with_candidate(workspace, "buf.md");

        assert_eq!(all_paths(&bucket, ".").unwrap(), vec!["README.md"]);
        assert_eq!(bucket.get("README.md").unwrap(), b"module");
        assert!(bucket.stat("buf.md").unwrap_err().is_not_found());
    }

    #[test]
    fn test_falls_back() {
        let module: ReadBucketRef = Arc::new(MemBucket::new());
        let workspace: ReadBucketRef = Arc::new(MemBucket::from_files([("LICENSE", "MIT")]));

        let bucket = FallbackFileBucket::new()
            .with_candidate(module, "LICENSE")
            .with_candidate(workspace, "LICENSE");

        assert_eq!(bucket.get("LICENSE").unwrap(), b"MIT");
    }

    #[test]
    fn test_empty() {
        let bucket = FallbackFileBucket::new();
        assert!(all_paths(&bucket, ".").unwrap().is_empty());
    }
}
