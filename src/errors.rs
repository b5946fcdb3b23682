//! Workspace resolution errors and diagnostics.
//!
//! Errors fall into four groups that callers handle differently:
//!
//! - user configuration errors, reported as-is
//! - [`WorkspaceError::NoTargetFiles`], an expected outcome when path
//!   filters match nothing
//! - [`WorkspaceError::Internal`], a broken invariant
//! - storage and provider failures, passed through unchanged

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::config::ConfigError;
use crate::storage::StorageError;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::normalpath::{self, NormalPathError};

/// Error during workspace resolution.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum WorkspaceError {
    #[error("\"{dir}\" contains both buf.work.yaml and buf.yaml; only one may govern a directory")]
    #[diagnostic(
        code(protomod::config::ambiguous),
        help("Remove buf.work.yaml and declare the modules in a v2 buf.yaml, or remove the buf.yaml")
    )]
    AmbiguousConfig { dir: String },

    #[error("module \"{path}\" was specified with --path; specify this module path directly as an input")]
    #[diagnostic(code(protomod::targeting::path_is_module))]
    PathIsModuleDirectory { path: String },

    #[error("module \"{path}\" was specified with --exclude-path; this module path should not be part of the input")]
    #[diagnostic(code(protomod::targeting::exclude_is_module))]
    ExcludePathIsModuleDirectory { path: String },

    #[error(transparent)]
    #[diagnostic(code(protomod::targeting::not_in_roots))]
    PathNotInRoots(NormalPathError),

    #[error("path \"{path}\" is outside the workspace at \"{workspace}\"")]
    #[diagnostic(code(protomod::targeting::outside_workspace))]
    PathOutsideWorkspace { path: String, workspace: String },

    #[error("{file} has version {lock_version} but the governing buf.yaml has version {config_version}")]
    #[diagnostic(
        code(protomod::lock::version_mismatch),
        help("Regenerate the lock file so that its version matches buf.yaml")
    )]
    LockVersionMismatch {
        file: String,
        lock_version: String,
        config_version: String,
    },

    #[error("dependency \"{full_name}\" is declared with different references: {}", normalpath::quoted_list(.refs))]
    #[diagnostic(
        code(protomod::workspace::conflicting_deps),
        help("Declare the same reference for this dependency in every module")
    )]
    ConflictingDepRefs { full_name: String, refs: Vec<String> },

    #[error("module \"{full_name}\" is declared in multiple directories: {}", normalpath::quoted_list(.dirs))]
    #[diagnostic(code(protomod::workspace::duplicate_name))]
    DuplicateFullName { full_name: String, dirs: Vec<String> },

    #[error("unnamed module directory \"{dir}\" collides with the module named \"{dir}\"")]
    #[diagnostic(
        code(protomod::workspace::id_collision),
        help("Rename the directory or give the module a name in buf.yaml")
    )]
    ModuleIdCollision { dir: String },

    #[error("module directories \"{first}\" and \"{second}\" overlap")]
    #[diagnostic(code(protomod::workspace::overlapping_dirs))]
    OverlappingModuleDirs { first: String, second: String },

    #[error(transparent)]
    #[diagnostic(code(protomod::config::invalid))]
    Config(ConfigError),

    #[error("invalid options: {message}")]
    #[diagnostic(code(protomod::options::invalid))]
    InvalidOptions { message: String },

    #[error("{file} governs this input; read it as a workspace instead of a single module")]
    #[diagnostic(code(protomod::module::requires_workspace))]
    RequiresWorkspace { file: String },

    #[error("import cycle between modules: {}", .modules.join(" -> "))]
    #[diagnostic(code(protomod::graph::cycle))]
    ModuleCycle { modules: Vec<String> },

    #[error("cannot write a single lock file for a legacy workspace with {count} modules")]
    #[diagnostic(
        code(protomod::lock::update_unsupported),
        help("Update the lock file of each module directory separately")
    )]
    LockUpdateUnsupported { count: usize },

    #[error("no target files found")]
    #[diagnostic(code(protomod::targeting::no_target_files))]
    NoTargetFiles,

    #[error("internal error: {message}")]
    #[diagnostic(code(protomod::internal))]
    Internal { message: String },

    #[error(transparent)]
    #[diagnostic(code(protomod::storage))]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(code(protomod::provider))]
    Provider(anyhow::Error),

    #[error("resolution was cancelled")]
    #[diagnostic(code(protomod::cancelled))]
    Cancelled,
}

impl WorkspaceError {
    /// Build an internal error and log it.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("internal error: {}", message);
        WorkspaceError::Internal { message }
    }

    /// Map an `apply_roots` failure: no match is the user's problem, several
    /// matches means roots were never validated.
    pub fn from_roots(err: NormalPathError) -> Self {
        if err.is_internal() {
            WorkspaceError::internal(err.to_string())
        } else {
            WorkspaceError::PathNotInRoots(err)
        }
    }

    pub fn is_no_target_files(&self) -> bool {
        matches!(self, WorkspaceError::NoTargetFiles)
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, WorkspaceError::Internal { .. })
    }

    /// Whether this came from a bucket or provider rather than from the
    /// configuration being resolved.
    pub fn is_io(&self) -> bool {
        matches!(self, WorkspaceError::Storage(_) | WorkspaceError::Provider(_))
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            WorkspaceError::AmbiguousConfig { dir } => Diagnostic::error(self.to_string())
                .with_location(normalpath::join(&[dir.as_str(), "buf.work.yaml"]))
                .with_suggestion(suggestions::MIGRATE_V2),

            WorkspaceError::PathIsModuleDirectory { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::MODULE_AS_INPUT)
            }

            WorkspaceError::LockVersionMismatch { file, .. } => Diagnostic::error(self.to_string())
                .with_location(file)
                .with_suggestion(suggestions::REGENERATE_LOCK),

            WorkspaceError::DuplicateFullName { full_name, dirs } => {
                let mut diag = Diagnostic::error(format!(
                    "module \"{}\" is declared in multiple directories",
                    full_name
                ));
                for dir in dirs {
                    diag = diag.with_context(format!("declared in \"{}\"", dir));
                }
                diag.with_suggestion("Give each module directory a unique name")
            }

            WorkspaceError::ConflictingDepRefs { full_name, refs } => {
                let mut diag = Diagnostic::error(format!(
                    "dependency \"{}\" is declared with different references",
                    full_name
                ));
                for r in refs {
                    diag = diag.with_context(format!("declared as \"{}\"", r));
                }
                diag.with_suggestion("Use the same reference in every buf.yaml of the workspace")
            }

            WorkspaceError::ModuleCycle { modules } => Diagnostic::error("import cycle between modules")
                .with_context(format!("cycle: {}", modules.join(" -> ")))
                .with_suggestion("Move the shared definitions into a module that both can depend on"),

            WorkspaceError::NoTargetFiles => Diagnostic::warning(self.to_string())
                .with_suggestion(suggestions::CHECK_PATHS),

            WorkspaceError::Internal { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::REPORT_BUG)
            }

            WorkspaceError::Provider(err) => {
                let mut diag = Diagnostic::error(err.to_string());
                for cause in err.chain().skip(1) {
                    diag = diag.with_context(cause.to_string());
                }
                diag
            }

            _ => Diagnostic::error(self.to_string()),
        }
    }
}

impl From<ConfigError> for WorkspaceError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Storage(err) => WorkspaceError::Storage(err),
            other => WorkspaceError::Config(other),
        }
    }
}
