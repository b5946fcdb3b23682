//! Command implementations.

pub mod dep_audit;
pub mod dep_prune;
pub mod ls_files;
pub mod ls_modules;
pub mod protoc;

use std::path::Path;

use anyhow::{Context, Result};

use protomod::ops::{ResolveOptions, WorkspaceProvider};
use protomod::util::GlobalContext;
use protomod::Workspace;

use crate::cli::InputArgs;

/// Build resolution options from the shared input flags.
pub fn resolve_options(args: &InputArgs, ctx: &GlobalContext) -> Result<ResolveOptions> {
    let mut builder = ResolveOptions::builder()
        .target_paths(args.paths.iter().cloned())
        .target_exclude_paths(args.exclude_paths.iter().cloned());
    if let Some(input) = &args.input {
        builder = builder.sub_dir_path(input);
    }
    if let Some(file) = &args.file {
        builder = builder.proto_file_target(file, args.include_package_files);
    }
    if let Some(config) = &args.config {
        builder = builder.config_override(config_bytes(config, ctx.cwd())?);
    }
    Ok(builder.build()?)
}

/// Resolve the workspace selected by `args`.
pub fn resolve_workspace(args: &InputArgs, ctx: &GlobalContext) -> Result<Workspace> {
    let options = resolve_options(args, ctx)?;
    let provider = ctx.provider()?;
    Ok(WorkspaceProvider::new(&provider).get_workspace(ctx.bucket(), &options)?)
}

/// `--config` is either a path to a file or the YAML itself.
fn config_bytes(value: &str, cwd: &Path) -> Result<Vec<u8>> {
    let path = cwd.join(value);
    if path.is_file() {
        return std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()));
    }
    Ok(value.as_bytes().to_vec())
}
