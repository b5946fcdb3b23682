//! protoc-style resolution from include directories and file paths.
//!
//! The include directories become the roots of a single local module and
//! the listed files its targets. Every other `.proto` file under the
//! include directories stays in the module as a non-target file.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use crate::core::config::{BreakingConfig, LintConfig};
use crate::core::module::{LocalModuleSpec, ModuleSetBuilder};
use crate::core::workspace::Workspace;
use crate::errors::WorkspaceError;
use crate::sources::MemProvider;
use crate::storage::{MappedBucket, Mapper, MultiBucket, ReadBucketRef};
use crate::util::normalpath;

/// Include directories and files, relative to the bucket root.
#[derive(Debug, Clone, Default)]
pub struct ProtocOptions {
    pub include_dirs: Vec<String>,
    pub file_paths: Vec<String>,
}

/// Build a one-module workspace from protoc-style arguments.
///
/// No include directories means the bucket root.
pub fn read_protoc(bucket: ReadBucketRef, options: &ProtocOptions) -> Result<Workspace, WorkspaceError> {
    let include_dirs = if options.include_dirs.is_empty() {
        vec![".".to_string()]
    } else {
        validate_unique("include directory", &options.include_dirs)?
    };
    if let Some((first, second)) = normalpath::first_overlap(include_dirs.as_slice()) {
        return Err(invalid(format!(
            "include directories \"{}\" and \"{}\" overlap",
            first, second
        )));
    }
    if options.file_paths.is_empty() {
        return Err(invalid("no input files"));
    }
    let file_paths = validate_unique("input file", &options.file_paths)?;

    let target_paths = file_paths
        .iter()
        .map(|path| normalpath::apply_roots(&include_dirs, path).map_err(WorkspaceError::from_roots))
        .collect::<Result<Vec<_>, _>>()?;

    let members: Vec<ReadBucketRef> = include_dirs
        .iter()
        .map(|dir| {
            Arc::new(MappedBucket::new(bucket.clone(), Mapper::on_prefix(dir).with_ext(".proto"))) as ReadBucketRef
        })
        .collect();
    let module_bucket: ReadBucketRef = Arc::new(MultiBucket::new(members));

    let provider = MemProvider::new();
    let mut builder = ModuleSetBuilder::new(&provider);
    builder.add_local(LocalModuleSpec::new(".", module_bucket, true).with_target_paths(target_paths, Vec::new()))?;
    let module_set = builder.build()?;
    info!(
        "read {} files from {} include directories",
        file_paths.len(),
        include_dirs.len()
    );

    Ok(Workspace::new(
        module_set,
        HashMap::from([(".".to_string(), LintConfig::default())]),
        HashMap::from([(".".to_string(), BreakingConfig::default())]),
        Vec::new(),
        false,
    ))
}

fn invalid(message: impl Into<String>) -> WorkspaceError {
    WorkspaceError::InvalidOptions {
        message: message.into(),
    }
}

fn validate_unique(what: &str, paths: &[String]) -> Result<Vec<String>, WorkspaceError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(paths.len());
    for path in paths {
        if path.trim().is_empty() {
            return Err(invalid(format!("empty {}", what)));
        }
        let path = normalpath::normalize_and_validate(path)
            .map_err(|e| invalid(format!("{} \"{}\": {}", what, path, e)))?;
        if !seen.insert(path.clone()) {
            return Err(invalid(format!("duplicate {} \"{}\"", what, path)));
        }
        normalized.push(path);
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn options(include_dirs: &[&str], file_paths: &[&str]) -> ProtocOptions {
        ProtocOptions {
            include_dirs: include_dirs.iter().map(|s| s.to_string()).collect(),
            file_paths: file_paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_one_target_among_include_dirs() {
        let workspace = read_protoc(
            bucket_of(protoc_layout()),
            &options(&["include1", "include2"], &["include2/b/b.proto"]),
        )
        .unwrap();
        assert_eq!(workspace.modules().len(), 1);
        let module = &workspace.modules()[0];
        assert!(module.is_target());
        assert_eq!(target_paths_of(module), ["b/b.proto"]);
        assert_eq!(file_paths_of(module), ["a/a.proto", "b/b.proto", "b/c.proto"]);
    }

    #[test]
    fn test_default_include_dir() {
        let workspace = read_protoc(bucket_of(protoc_layout()), &options(&[], &["include1/a/a.proto"])).unwrap();
        assert_eq!(target_paths_of(&workspace.modules()[0]), ["include1/a/a.proto"]);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let bucket = bucket_of(protoc_layout());
        for (includes, files) in [
            (vec!["include1", "include1"], vec!["include1/a/a.proto"]),
            (vec!["include1", ""], vec!["include1/a/a.proto"]),
            (vec!["include1"], vec![]),
            (vec!["include1"], vec!["include1/a/a.proto", "include1/a/a.proto"]),
            (vec!["include1", "include1/a"], vec!["include1/a/a.proto"]),
        ] {
            let err = read_protoc(bucket.clone(), &options(&includes, &files)).unwrap_err();
            assert!(matches!(err, WorkspaceError::InvalidOptions { .. }), "{err}");
        }
    }

    #[test]
    fn test_file_outside_include_dirs() {
        let err = read_protoc(
            bucket_of(protoc_layout()),
            &options(&["include1"], &["include2/b/b.proto"]),
        )
        .unwrap_err();
        assert!(matches!(err, WorkspaceError::PathNotInRoots(_)));
    }
}
