//! protomod - protobuf workspace and module resolution
//!
//! This crate provides the core library functionality for protomod:
//! discovering the configuration that governs an input, targeting paths
//! through module roots, building module sets and their import graph, and
//! auditing declared dependencies.

pub mod core;
pub mod errors;
pub mod ops;
pub mod sources;
pub mod storage;
pub mod targeting;
pub mod util;

/// Test utilities for protomod unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides in-memory workspace layouts and a remote module provider.
#[cfg(test)]
pub mod test_support;

pub use core::{Module, ModuleFullName, ModuleKey, ModuleRef, ModuleSet, UpdateableWorkspace, Workspace};
pub use errors::WorkspaceError;
pub use ops::{ResolveOptions, WorkspaceProvider};
