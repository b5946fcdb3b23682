//! Reading a lone legacy module.
//!
//! The module is the nearest directory at or above the input that holds a
//! `v1beta1` or `v1` `buf.yaml`. Inputs that belong to a `buf.work.yaml` or
//! a `v2` `buf.yaml` must go through
//! [`WorkspaceProvider`](crate::ops::WorkspaceProvider) instead.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::config::{BufYamlFile, BUF_LOCK};
use crate::core::lockfile;
use crate::core::module::{LocalModuleSpec, ModuleSetBuilder};
use crate::core::workspace::Workspace;
use crate::errors::WorkspaceError;
use crate::ops::options::ResolveOptions;
use crate::ops::workspace_provider::module_bucket;
use crate::sources::ModuleDataProvider;
use crate::storage::ReadBucketRef;
use crate::targeting::{terminate_at_v1_module, BucketTargeting, ControllingConfig, ModuleTargeting};
use crate::util::normalpath;

/// Reads single legacy modules, fetching locked dependencies from a
/// provider.
pub struct ModuleReader<'a> {
    provider: &'a dyn ModuleDataProvider,
}

impl<'a> ModuleReader<'a> {
    pub fn new(provider: &'a dyn ModuleDataProvider) -> Self {
        ModuleReader { provider }
    }

    /// Read the module enclosing `options.discovery_path()` as a one-module
    /// workspace.
    pub fn read_module(&self, bucket: ReadBucketRef, options: &ResolveOptions) -> Result<Workspace, WorkspaceError> {
        options.check_cancelled()?;
        if options.config_override().is_some() {
            return Err(WorkspaceError::InvalidOptions {
                message: "a config override needs workspace resolution".to_string(),
            });
        }

        let discovery_path = options.discovery_path();
        let input_path = discovery_path.as_str();
        let bucket_targeting = BucketTargeting::new(
            bucket.as_ref(),
            input_path,
            &[],
            &[],
            None,
            &terminate_at_v1_module,
            options.cancel(),
        )?;
        let (module_dir, buf_yaml) = match bucket_targeting.controlling_workspace() {
            Some(controlling) => match controlling.config() {
                ControllingConfig::LegacyModule(buf_yaml) => (controlling.path().to_string(), buf_yaml.clone()),
                other => {
                    return Err(WorkspaceError::RequiresWorkspace {
                        file: normalpath::join(&[controlling.path(), other.file_name()]),
                    })
                }
            },
            None => {
                debug!("no buf.yaml above \"{}\", using defaults", input_path);
                (input_path.to_string(), BufYamlFile::default_v1())
            }
        };
        let module_config = match buf_yaml.module_configs() {
            [module_config] => module_config.clone(),
            other => {
                return Err(WorkspaceError::internal(format!(
                    "legacy buf.yaml for \"{}\" has {} modules",
                    module_dir,
                    other.len()
                )))
            }
        };

        let mut target_paths = options.target_paths().to_vec();
        if normalpath::contains_path(&module_dir, input_path)
            && target_paths.is_empty()
            && options.proto_file_target().is_none()
        {
            target_paths.push(input_path.to_string());
        }
        let targeting = ModuleTargeting::new(
            &module_dir,
            &module_config.roots(),
            &target_paths,
            options.target_exclude_paths(),
            options.proto_file_target(),
            true,
        )?;
        if !targeting.is_target() {
            return Err(WorkspaceError::NoTargetFiles);
        }

        let mut builder = ModuleSetBuilder::new(self.provider);
        let module_view = module_bucket(&bucket, &module_dir, &module_dir, &module_config);
        let (is_target, paths, exclude_paths, proto_file_target) = targeting.into_parts();
        builder.add_local(
            LocalModuleSpec::new(module_dir.clone(), module_view, is_target)
                .with_full_name(module_config.full_name().cloned())
                .with_target_paths(paths, exclude_paths)
                .with_proto_file_target(proto_file_target),
        )?;

        if let Some(lock) = lockfile::read_buf_lock(bucket.as_ref(), &module_dir)? {
            if !lock.version().is_legacy() {
                return Err(WorkspaceError::LockVersionMismatch {
                    file: normalpath::join(&[module_dir.as_str(), BUF_LOCK]),
                    lock_version: lock.version().to_string(),
                    config_version: buf_yaml.version().to_string(),
                });
            }
            for key in lock.deps() {
                builder.add_remote(key.clone(), false);
            }
        }

        options.check_cancelled()?;
        let module_set = builder.build()?;
        info!(
            "read module at \"{}\" with {} remote dependencies",
            module_dir,
            module_set.remote_modules().count()
        );

        let opaque_id = module_config
            .full_name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| module_dir.clone());
        Ok(Workspace::new(
            module_set,
            HashMap::from([(opaque_id.clone(), module_config.lint().clone())]),
            HashMap::from([(opaque_id, module_config.breaking().clone())]),
            buf_yaml.dep_refs().to_vec(),
            false,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn read(files: Vec<(&'static str, String)>, options: ResolveOptions) -> Result<Workspace, WorkspaceError> {
        let provider = remote_provider();
        ModuleReader::new(&provider).read_module(bucket_of(files), &options)
    }

    #[test]
    fn test_reads_enclosing_module() {
        let options = ResolveOptions::builder().sub_dir_path("proto/other").build().unwrap();
        let workspace = read(v1_module(), options).unwrap();
        assert_eq!(workspace.modules().len(), 1);
        let module = &workspace.modules()[0];
        assert_eq!(module.opaque_id(), "buf.build/acme/single");
        assert_eq!(module.target_paths(), ["other"]);
        assert_eq!(target_paths_of(module), ["other/v1/c.proto"]);
        assert!(workspace.lint_config_for_opaque_id("buf.build/acme/single").is_some());
    }

    #[test]
    fn test_module_dir_input_targets_everything() {
        let options = ResolveOptions::builder().sub_dir_path("proto").build().unwrap();
        let workspace = read(v1_module(), options).unwrap();
        let module = &workspace.modules()[0];
        assert!(module.target_paths().is_empty());
        assert_eq!(target_paths_of(module).len(), 3);
    }

    #[test]
    fn test_default_module_without_buf_yaml() {
        let files = vec![("loose/a.proto", proto("a", &[]))];
        let options = ResolveOptions::builder().sub_dir_path("loose").build().unwrap();
        let workspace = read(files, options).unwrap();
        assert_eq!(workspace.modules()[0].opaque_id(), "loose");
    }

    #[test]
    fn test_locked_deps_added() {
        let files = legacy_workspace()
            .into_iter()
            .filter(|(path, _)| *path != "buf.work.yaml")
            .collect();
        let options = ResolveOptions::builder().sub_dir_path("proto").build().unwrap();
        let workspace = read(files, options).unwrap();
        let extra = workspace.get_module_for_opaque_id(EXTRA).unwrap();
        assert!(!extra.is_target());
        assert!(!workspace.is_v2());
    }

    #[test]
    fn test_workspace_inputs_rejected() {
        let options = ResolveOptions::builder().build().unwrap();
        let err = read(legacy_workspace(), options).unwrap_err();
        assert!(matches!(err, WorkspaceError::RequiresWorkspace { .. }));

        let options = ResolveOptions::builder().sub_dir_path("b").build().unwrap();
        let err = read(v2_workspace(), options).unwrap_err();
        assert!(matches!(err, WorkspaceError::RequiresWorkspace { .. }));
    }
}
