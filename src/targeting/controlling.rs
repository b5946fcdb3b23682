//! Controlling-workspace discovery.
//!
//! Starting at the input directory, walk toward the bucket root and ask a
//! terminate function at every directory whether the configuration found
//! there governs the input. The first directory that does becomes the
//! controlling workspace, and every user-supplied path is re-expressed
//! relative to it.

use crate::core::config::{self, BufWorkYamlFile, BufYamlFile, FileVersion, BUF_WORK_YAML, BUF_YAML};
use crate::errors::WorkspaceError;
use crate::storage::ReadBucket;
use crate::util::cancel::CancellationToken;
use crate::util::normalpath;

/// The configuration that governs a controlling workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllingConfig {
    /// A `v1beta1`/`v1` `buf.yaml` describing a single module
    LegacyModule(BufYamlFile),
    /// A `buf.work.yaml` listing legacy module directories
    LegacyWorkspace(BufWorkYamlFile),
    /// A `v2` `buf.yaml`
    Unified(BufYamlFile),
}

impl ControllingConfig {
    /// Name of the file this configuration was read from.
    pub fn file_name(&self) -> &'static str {
        match self {
            ControllingConfig::LegacyWorkspace(_) => BUF_WORK_YAML,
            ControllingConfig::LegacyModule(_) | ControllingConfig::Unified(_) => BUF_YAML,
        }
    }
}

/// Where and how an input is governed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllingWorkspace {
    /// Directory relative to the bucket root
    path: String,
    config: ControllingConfig,
}

impl ControllingWorkspace {
    pub fn new(path: impl Into<String>, config: ControllingConfig) -> Self {
        ControllingWorkspace {
            path: normalpath::normalize(&path.into()),
            config,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &ControllingConfig {
        &self.config
    }
}

/// Decides whether the configuration at `prefix` governs `input_path`.
///
/// Arguments are the bucket, the candidate directory, and the original input
/// path, both relative to the bucket root.
pub type TerminateFn =
    dyn Fn(&dyn ReadBucket, &str, &str) -> Result<Option<ControllingWorkspace>, WorkspaceError> + Send + Sync;

fn governs(prefix: &str, input_path: &str, dirs: &[String]) -> bool {
    if prefix == input_path {
        return true;
    }
    match normalpath::relativize(prefix, input_path) {
        Ok(relative) => dirs
            .iter()
            .any(|dir| normalpath::equals_or_contains_path(dir, &relative)),
        Err(_) => false,
    }
}

/// Stop at a `buf.work.yaml` or `v2` `buf.yaml` that governs the input.
///
/// Finding both `buf.work.yaml` and `buf.yaml` in one directory is an error
/// whatever the target.
pub fn terminate_at_controlling_workspace(
    bucket: &dyn ReadBucket,
    prefix: &str,
    input_path: &str,
) -> Result<Option<ControllingWorkspace>, WorkspaceError> {
    let buf_work_yaml = config::read_buf_work_yaml(bucket, prefix)?;
    let buf_yaml = config::read_buf_yaml(bucket, prefix)?;

    match (buf_work_yaml, buf_yaml) {
        (Some(_), Some(_)) => Err(WorkspaceError::AmbiguousConfig {
            dir: prefix.to_string(),
        }),
        (Some(work), None) => {
            if governs(prefix, input_path, work.directories()) {
                Ok(Some(ControllingWorkspace::new(
                    prefix,
                    ControllingConfig::LegacyWorkspace(work),
                )))
            } else {
                Ok(None)
            }
        }
        (None, Some(yaml)) if yaml.version() == FileVersion::V2 => {
            if governs(prefix, input_path, &yaml.module_dir_paths()) {
                Ok(Some(ControllingWorkspace::new(prefix, ControllingConfig::Unified(yaml))))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

/// Stop at the nearest `v1beta1`/`v1` `buf.yaml`.
///
/// A `buf.work.yaml` or `v2` `buf.yaml` met first means the input belongs
/// to a workspace and cannot be read as a lone module.
pub fn terminate_at_v1_module(
    bucket: &dyn ReadBucket,
    prefix: &str,
    _input_path: &str,
) -> Result<Option<ControllingWorkspace>, WorkspaceError> {
    if config::read_buf_work_yaml(bucket, prefix)?.is_some() {
        return Err(WorkspaceError::RequiresWorkspace {
            file: normalpath::join(&[prefix, BUF_WORK_YAML]),
        });
    }
    match config::read_buf_yaml(bucket, prefix)? {
        Some(yaml) if yaml.version() == FileVersion::V2 => Err(WorkspaceError::RequiresWorkspace {
            file: normalpath::join(&[prefix, BUF_YAML]),
        }),
        Some(yaml) => Ok(Some(ControllingWorkspace::new(
            prefix,
            ControllingConfig::LegacyModule(yaml),
        ))),
        None => Ok(None),
    }
}

/// An input located within its controlling workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTargeting {
    controlling_workspace: Option<ControllingWorkspace>,
    /// Input directory relative to the controlling workspace, or to the
    /// bucket root when there is none
    input_path: String,
    target_paths: Vec<String>,
    target_exclude_paths: Vec<String>,
    proto_file_target_path: Option<String>,
}

impl BucketTargeting {
    /// Locate the controlling workspace of `input_path` and re-express the
    /// target, exclude, and proto-file paths relative to it.
    ///
    /// All paths are relative to the bucket root.
    pub fn new(
        bucket: &dyn ReadBucket,
        input_path: &str,
        target_paths: &[String],
        target_exclude_paths: &[String],
        proto_file_target_path: Option<&str>,
        terminate: &TerminateFn,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        let input_path = normalpath::normalize_and_validate(input_path).map_err(|e| {
            WorkspaceError::InvalidOptions {
                message: e.to_string(),
            }
        })?;

        let mut current = input_path.clone();
        let controlling_workspace = loop {
            if cancel.is_cancelled() {
                return Err(WorkspaceError::Cancelled);
            }
            if let Some(workspace) = terminate(bucket, &current, &input_path)? {
                tracing::debug!(
                    "{} at \"{}\" controls \"{}\"",
                    workspace.config().file_name(),
                    workspace.path(),
                    input_path
                );
                break Some(workspace);
            }
            if current == "." {
                break None;
            }
            current = normalpath::dir(&current);
        };

        let Some(workspace) = controlling_workspace else {
            tracing::debug!("no controlling workspace for \"{}\"", input_path);
            return Ok(BucketTargeting {
                controlling_workspace: None,
                input_path,
                target_paths: target_paths.to_vec(),
                target_exclude_paths: target_exclude_paths.to_vec(),
                proto_file_target_path: proto_file_target_path.map(str::to_string),
            });
        };

        let root = workspace.path().to_string();
        let map = |path: &str| -> Result<String, WorkspaceError> {
            normalpath::relativize(&root, path).map_err(|_| WorkspaceError::PathOutsideWorkspace {
                path: path.to_string(),
                workspace: root.clone(),
            })
        };
        Ok(BucketTargeting {
            input_path: map(&input_path)?,
            target_paths: target_paths.iter().map(|p| map(p.as_str())).collect::<Result<_, _>>()?,
            target_exclude_paths: target_exclude_paths
                .iter()
                .map(|p| map(p.as_str()))
                .collect::<Result<_, _>>()?,
            proto_file_target_path: proto_file_target_path.map(map).transpose()?,
            controlling_workspace: Some(workspace),
        })
    }

    pub fn controlling_workspace(&self) -> Option<&ControllingWorkspace> {
        self.controlling_workspace.as_ref()
    }

    /// Input directory relative to the controlling workspace.
    pub fn input_path(&self) -> &str {
        &self.input_path
    }

    pub fn target_paths(&self) -> &[String] {
        &self.target_paths
    }

    pub fn target_exclude_paths(&self) -> &[String] {
        &self.target_exclude_paths
    }

    pub fn proto_file_target_path(&self) -> Option<&str> {
        self.proto_file_target_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemBucket;

    fn locate(bucket: &MemBucket, input: &str, targets: &[&str]) -> Result<BucketTargeting, WorkspaceError> {
        let targets: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
        BucketTargeting::new(
            bucket,
            input,
            &targets,
            &[],
            None,
            &terminate_at_controlling_workspace,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn test_finds_buf_work_yaml_above_input() {
        let bucket = MemBucket::from_files([
            ("ws/buf.work.yaml", "version: v1\ndirectories: [proto, enterprise/proto]\n"),
            ("ws/proto/buf.yaml", "version: v1\n"),
        ]);
        let targeting = locate(&bucket, "ws/proto/acme", &["ws/proto/acme/a.proto"]).unwrap();
        let workspace = targeting.controlling_workspace().unwrap();
        assert_eq!(workspace.path(), "ws");
        assert!(matches!(workspace.config(), ControllingConfig::LegacyWorkspace(_)));
        assert_eq!(targeting.input_path(), "proto/acme");
        assert_eq!(targeting.target_paths(), ["proto/acme/a.proto"]);
    }

    #[test]
    fn test_buf_work_yaml_not_listing_input_is_skipped() {
        let bucket = MemBucket::from_files([
            ("buf.work.yaml", "version: v1\ndirectories: [proto]\n"),
            ("other/buf.yaml", "version: v1\n"),
        ]);
        let targeting = locate(&bucket, "other", &[]).unwrap();
        assert!(targeting.controlling_workspace().is_none());
        assert_eq!(targeting.input_path(), "other");
    }

    #[test]
    fn test_input_equal_to_workspace_dir() {
        let bucket = MemBucket::from_files([("buf.work.yaml", "version: v1\ndirectories: [proto]\n")]);
        let targeting = locate(&bucket, ".", &[]).unwrap();
        assert_eq!(targeting.controlling_workspace().unwrap().path(), ".");
        assert_eq!(targeting.input_path(), ".");
    }

    #[test]
    fn test_v2_buf_yaml_controls_module_subdir() {
        let bucket = MemBucket::from_files([(
            "buf.yaml",
            "version: v2\nmodules:\n  - path: a\n  - path: b\n",
        )]);
        let targeting = locate(&bucket, "b/acme", &[]).unwrap();
        assert!(matches!(
            targeting.controlling_workspace().unwrap().config(),
            ControllingConfig::Unified(_)
        ));
        assert_eq!(targeting.input_path(), "b/acme");

        let targeting = locate(&bucket, "c", &[]).unwrap();
        assert!(targeting.controlling_workspace().is_none());
    }

    #[test]
    fn test_v1_buf_yaml_is_not_controlling() {
        let bucket = MemBucket::from_files([("proto/buf.yaml", "version: v1\n")]);
        let targeting = locate(&bucket, "proto", &[]).unwrap();
        assert!(targeting.controlling_workspace().is_none());
    }

    #[test]
    fn test_both_files_in_one_dir_always_fail() {
        let bucket = MemBucket::from_files([
            ("buf.work.yaml", "version: v1\ndirectories: [proto]\n"),
            ("buf.yaml", "version: v2\n"),
        ]);
        for input in [".", "proto", "unrelated/dir"] {
            assert!(matches!(
                locate(&bucket, input, &[]),
                Err(WorkspaceError::AmbiguousConfig { .. })
            ));
        }
    }

    #[test]
    fn test_target_outside_workspace() {
        let bucket = MemBucket::from_files([("ws/buf.work.yaml", "version: v1\ndirectories: [proto]\n")]);
        assert!(matches!(
            locate(&bucket, "ws/proto", &["elsewhere/a.proto"]),
            Err(WorkspaceError::PathOutsideWorkspace { .. })
        ));
    }

    #[test]
    fn test_cancelled() {
        let bucket = MemBucket::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = BucketTargeting::new(
            &bucket,
            "a/b",
            &[],
            &[],
            None,
            &terminate_at_controlling_workspace,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, WorkspaceError::Cancelled));
    }

    #[test]
    fn test_terminate_at_v1_module() {
        let bucket = MemBucket::from_files([("proto/buf.yaml", "version: v1beta1\n")]);
        let targeting = BucketTargeting::new(
            &bucket,
            "proto/acme",
            &[],
            &[],
            None,
            &terminate_at_v1_module,
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(matches!(
            targeting.controlling_workspace().unwrap().config(),
            ControllingConfig::LegacyModule(_)
        ));

        let bucket = MemBucket::from_files([("buf.yaml", "version: v2\n")]);
        let err = BucketTargeting::new(
            &bucket,
            "proto",
            &[],
            &[],
            None,
            &terminate_at_v1_module,
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, WorkspaceError::RequiresWorkspace { .. }));
    }
}
