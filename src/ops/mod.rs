//! High-level operations.
//!
//! Resolution entry points: workspaces, lone legacy modules, protoc-style
//! arguments, and the dependency audit over a resolved workspace.

pub mod malformed_deps;
pub mod module_reader;
pub mod options;
pub mod protoc;
pub mod workspace_provider;

pub use malformed_deps::{malformed_deps_for_workspace, MalformedDep, MalformedDepType, MalformedDepsOptions};
pub use module_reader::ModuleReader;
pub use options::{ResolveOptions, ResolveOptionsBuilder};
pub use protoc::{read_protoc, ProtocOptions};
pub use workspace_provider::WorkspaceProvider;
