//! Filesystem-backed bucket.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::storage::{ObjectInfo, ReadBucket, StorageError, WalkFn, WriteBucket};
use crate::util::normalpath;

/// A bucket rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct OsBucket {
    root: PathBuf,
}

impl OsBucket {
    /// Create a bucket rooted at `root`. The directory is not touched until
    /// the bucket is read.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OsBucket { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<(String, PathBuf), StorageError> {
        let path = normalpath::normalize_and_validate(path)?;
        let full = if path == "." {
            self.root.clone()
        } else {
            self.root.join(&path)
        };
        Ok((path, full))
    }

    fn io_error(operation: &'static str, path: &Path, source: io::Error) -> StorageError {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::not_found(path.display().to_string())
        } else {
            StorageError::Io {
                operation,
                path: path.display().to_string(),
                source,
            }
        }
    }
}

impl ReadBucket for OsBucket {
    fn stat(&self, path: &str) -> Result<ObjectInfo, StorageError> {
        let (path, full) = self.full_path(path)?;
        let metadata = fs::metadata(&full).map_err(|e| Self::io_error("stat", &full, e))?;
        if !metadata.is_file() {
            return Err(StorageError::not_found(path));
        }
        Ok(ObjectInfo::new(path, full.display().to_string()))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let (path, full) = self.full_path(path)?;
        match fs::metadata(&full) {
            Ok(metadata) if !metadata.is_file() => return Err(StorageError::not_found(path)),
            Ok(_) => {}
            Err(e) => return Err(Self::io_error("stat", &full, e)),
        }
        fs::read(&full).map_err(|e| Self::io_error("read", &full, e))
    }

    fn walk(&self, prefix: &str, f: &mut WalkFn<'_>) -> Result<(), StorageError> {
        let (_, start) = self.full_path(prefix)?;
        if !start.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(&start).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| start.clone());
                    match e.into_io_error() {
                        Some(source) if source.kind() == io::ErrorKind::NotFound => continue,
                        Some(source) => return Err(Self::io_error("walk", &path, source)),
                        None => {
                            tracing::warn!("skipping symlink loop at {}", path.display());
                            continue;
                        }
                    }
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let path = normalpath::normalize(&relative.to_string_lossy());
            f(&ObjectInfo::new(path, entry.path().display().to_string()))?;
        }
        Ok(())
    }
}

impl WriteBucket for OsBucket {
    fn put(&self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let (_, full) = self.full_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error("create directory", parent, e))?;
        }
        fs::write(&full, data).map_err(|e| Self::io_error("write", &full, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::all_paths;
    use tempfile::TempDir;

    #[test]
    fn test_os_bucket_walk_and_read() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("proto/acme")).unwrap();
        fs::write(tmp.path().join("proto/acme/a.proto"), "syntax = \"proto3\";").unwrap();
        fs::write(tmp.path().join("buf.yaml"), "version: v1\n").unwrap();

        let bucket = OsBucket::new(tmp.path());
        assert_eq!(
            all_paths(&bucket, ".").unwrap(),
            vec!["buf.yaml", "proto/acme/a.proto"]
        );
        assert_eq!(all_paths(&bucket, "proto").unwrap(), vec!["proto/acme/a.proto"]);
        assert_eq!(bucket.get("buf.yaml").unwrap(), b"version: v1\n");
        assert!(bucket.stat("proto").unwrap_err().is_not_found());
        assert!(bucket.stat("nope.proto").unwrap_err().is_not_found());
    }

    #[test]
    fn test_os_bucket_put_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let bucket = OsBucket::new(tmp.path());
        bucket.put("a/b/buf.lock", b"version: v2\n").unwrap();
        assert!(tmp.path().join("a/b/buf.lock").exists());
    }

    #[test]
    fn test_os_bucket_walk_missing_prefix() {
        let tmp = TempDir::new().unwrap();
        let bucket = OsBucket::new(tmp.path());
        assert!(all_paths(&bucket, "missing").unwrap().is_empty());
    }
}
