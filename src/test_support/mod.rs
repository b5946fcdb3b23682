//! Test utilities for protomod unit tests.
//!
//! Workspace layouts live in [`fixtures`]; the helpers here turn them into
//! buckets, write them to disk, and summarize resolved modules.
//!
//! # Example
//!
//! ```rust,ignore
//! use protomod::test_support::{bucket_of, v2_workspace, remote_provider};
//!
//! #[test]
//! fn test_example() {
//!     let bucket = bucket_of(v2_workspace());
//!     let provider = remote_provider();
//!     // Resolve against the bucket...
//! }
//! ```

pub mod fixtures;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::core::module::Module;
use crate::storage::{MemBucket, ReadBucketRef};

pub use fixtures::*;

/// An in-memory bucket holding `files`.
pub fn bucket_of(files: Vec<(&'static str, String)>) -> ReadBucketRef {
    Arc::new(MemBucket::from_files(files))
}

/// A writable in-memory bucket holding `files`.
pub fn mem_bucket_of(files: Vec<(&'static str, String)>) -> Arc<MemBucket> {
    Arc::new(MemBucket::from_files(files))
}

/// Write `files` below `root`, creating directories as needed.
pub fn write_tree(root: &Path, files: &[(&str, String)]) -> Result<()> {
    for (path, content) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

/// Sorted paths of a module's target files.
pub fn target_paths_of(module: &Module) -> Vec<String> {
    let mut paths: Vec<String> = module
        .target_files()
        .unwrap()
        .iter()
        .map(|info| info.path().to_string())
        .collect();
    paths.sort();
    paths
}

/// Sorted paths of every file of a module.
pub fn file_paths_of(module: &Module) -> Vec<String> {
    let mut paths: Vec<String> = module
        .files()
        .unwrap()
        .iter()
        .map(|info| info.path().to_string())
        .collect();
    paths.sort();
    paths
}
