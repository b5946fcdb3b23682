//! Workspace - the result of resolving an input.
//!
//! A workspace is a module set plus the configuration the resolver found
//! for its local modules. It is read-only; a changed configuration needs a
//! new resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::config::{BreakingConfig, FileVersion, LintConfig, BUF_LOCK};
use crate::core::lockfile::{self, BufLockFile};
use crate::core::module::{Module, ModuleSet};
use crate::core::module_ref::{ModuleKey, ModuleRef};
use crate::errors::WorkspaceError;
use crate::storage::WriteBucket;
use crate::util::normalpath;

/// A resolved workspace.
#[derive(Debug)]
pub struct Workspace {
    module_set: ModuleSet,
    opaque_id_to_lint: HashMap<String, LintConfig>,
    opaque_id_to_breaking: HashMap<String, BreakingConfig>,
    configured_dep_refs: Vec<ModuleRef>,
    is_v2: bool,
}

impl Workspace {
    pub(crate) fn new(
        module_set: ModuleSet,
        opaque_id_to_lint: HashMap<String, LintConfig>,
        opaque_id_to_breaking: HashMap<String, BreakingConfig>,
        configured_dep_refs: Vec<ModuleRef>,
        is_v2: bool,
    ) -> Self {
        Workspace {
            module_set,
            opaque_id_to_lint,
            opaque_id_to_breaking,
            configured_dep_refs,
            is_v2,
        }
    }

    pub fn module_set(&self) -> &ModuleSet {
        &self.module_set
    }

    /// All modules, local first.
    pub fn modules(&self) -> &[Arc<Module>] {
        self.module_set.modules()
    }

    pub fn get_module_for_opaque_id(&self, opaque_id: &str) -> Option<&Arc<Module>> {
        self.module_set.get_module_for_opaque_id(opaque_id)
    }

    /// Lint settings of a local module.
    pub fn lint_config_for_opaque_id(&self, opaque_id: &str) -> Option<&LintConfig> {
        self.opaque_id_to_lint.get(opaque_id)
    }

    /// Breaking-change settings of a local module.
    pub fn breaking_config_for_opaque_id(&self, opaque_id: &str) -> Option<&BreakingConfig> {
        self.opaque_id_to_breaking.get(opaque_id)
    }

    /// Dependencies declared across every `buf.yaml` of the workspace.
    pub fn configured_dep_module_refs(&self) -> &[ModuleRef] {
        &self.configured_dep_refs
    }

    /// Whether the workspace came from a `v2` `buf.yaml`.
    pub fn is_v2(&self) -> bool {
        self.is_v2
    }
}

/// Where a refreshed lock file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LockTarget {
    /// One `v2` lock at the workspace root
    Unified { dir: String },
    /// One legacy lock per module directory
    Legacy { dirs: Vec<String>, version: FileVersion },
}

/// A workspace over a writable bucket that can rewrite its lock file.
///
/// No locking is done; callers write at most once per invocation.
#[derive(Debug)]
pub struct UpdateableWorkspace {
    workspace: Workspace,
    bucket: Arc<dyn WriteBucket>,
    lock_target: LockTarget,
}

impl UpdateableWorkspace {
    pub(crate) fn new(workspace: Workspace, bucket: Arc<dyn WriteBucket>, lock_target: LockTarget) -> Self {
        UpdateableWorkspace {
            workspace,
            bucket,
            lock_target,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    /// Path of the lock file that [`put_lock_file`](Self::put_lock_file)
    /// writes, relative to the bucket.
    pub fn lock_file_path(&self) -> Result<String, WorkspaceError> {
        Ok(normalpath::join(&[self.lock_dir()?.0.as_str(), BUF_LOCK]))
    }

    fn lock_dir(&self) -> Result<(String, FileVersion), WorkspaceError> {
        match &self.lock_target {
            LockTarget::Unified { dir } => Ok((dir.clone(), FileVersion::V2)),
            LockTarget::Legacy { dirs, version } => match dirs.as_slice() {
                [dir] => Ok((dir.clone(), *version)),
                _ => Err(WorkspaceError::LockUpdateUnsupported { count: dirs.len() }),
            },
        }
    }

    /// Replace the lock file with the given dependency keys.
    pub fn put_lock_file(&self, deps: Vec<ModuleKey>) -> Result<(), WorkspaceError> {
        let (dir, version) = self.lock_dir()?;
        let lock = BufLockFile::new(version, deps);
        lockfile::write_buf_lock(self.bucket.as_ref(), &dir, &lock)?;
        tracing::info!(
            "wrote {} with {} dependencies",
            normalpath::join(&[dir.as_str(), BUF_LOCK]),
            lock.deps().len()
        );
        Ok(())
    }
}
