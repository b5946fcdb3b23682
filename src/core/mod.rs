//! Core data structures.
//!
//! - Module names, references, and keys
//! - `buf.yaml`, `buf.work.yaml`, and `buf.lock` files
//! - Modules, module sets, and workspaces

pub mod config;
pub mod imports;
pub mod lockfile;
pub mod module;
pub mod module_ref;
pub mod workspace;

pub use config::{BreakingConfig, BufWorkYamlFile, BufYamlFile, FileVersion, LintConfig, ModuleConfig};
pub use lockfile::BufLockFile;
pub use module::{LocalModuleSpec, Module, ModuleSet, ModuleSetBuilder, ProtoFileTarget};
pub use module_ref::{Digest, ModuleFullName, ModuleKey, ModuleRef};
pub use workspace::{UpdateableWorkspace, Workspace};
