//! Union of several buckets.

use std::collections::BTreeMap;

use crate::storage::{ObjectInfo, ReadBucket, ReadBucketRef, StorageError, WalkFn};

/// A union view over several buckets.
///
/// A path may live in at most one member; a path found in two members is a
/// [`StorageError::Duplicate`], which is how two module roots providing the
/// same proto path surface.
#[derive(Debug, Clone, Default)]
pub struct MultiBucket {
    buckets: Vec<ReadBucketRef>,
}

impl MultiBucket {
    pub fn new(buckets: Vec<ReadBucketRef>) -> Self {
        MultiBucket { buckets }
    }

    /// Index of the single member holding `path`.
    fn locate(&self, path: &str) -> Result<(usize, ObjectInfo), StorageError> {
        let mut found: Vec<(usize, ObjectInfo)> = Vec::new();
        for (idx, bucket) in self.buckets.iter().enumerate() {
            match bucket.stat(path) {
                Ok(info) => found.push((idx, info)),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        match found.len() {
            0 => Err(StorageError::not_found(path)),
            1 => Ok(found.remove(0)),
            _ => Err(StorageError::Duplicate {
                path: path.to_string(),
                external_paths: found
                    .into_iter()
                    .map(|(_, info)| info.external_path().to_string())
                    .collect(),
            }),
        }
    }
}

impl ReadBucket for MultiBucket {
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError> {
        self.locate(path).map(|(_, info)| info)
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let (idx, _) = self.locate(path)?;
        self.buckets[idx].get(path)
    }

    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let mut seen: BTreeMap<String, ObjectInfo> = BTreeMap::new();
        for bucket in &self.buckets {
            let mut duplicate: Option<StorageError> = None;
            bucket.walk(prefix, &mut |info| {
                if let Some(existing) = seen.get(info.path()) {
                    duplicate = Some(StorageError::Duplicate {
                        path: info.path().to_string(),
                        external_paths: vec![
                            existing.external_path().to_string(),
                            info.external_path().to_string(),
                        ],
                    });
                    return Ok(());
                }
                seen.insert(info.path().to_string(), info.clone());
                Ok(())
            })?;
            if let Some(err) = duplicate {
                return Err(err);
            }
        }
        for info in seen.values() {
            f(info)?;
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
    fn test_union() {
        let bucket = MultiBucket::new(vec![
            Arc::new(MemBucket::from_files([("a.proto", "a")])),
            Arc::new(MemBucket::from_files([("b/b.proto", "b")])),
        ]);
        assert_eq!(all_paths(&bucket, ".").unwrap(), vec!["a.proto", "b/b.proto"]);
        assert_eq!(bucket.get("b/b.proto").unwrap(), b"b");
    }

    #[test]
    fn test_duplicate_paths() {
        let bucket = MultiBucket::new(vec![
            Arc::new(MemBucket::from_files([("a.proto", "one")])),
            Arc::new(MemBucket::from_files([("a.proto", "two")])),
        ]);
        assert!(matches!(bucket.stat("a.proto"), Err(StorageError::Duplicate { .. })));
        assert!(matches!(all_paths(&bucket, "."), Err(StorageError::Duplicate { .. })));
    }
}
