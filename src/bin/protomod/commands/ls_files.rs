//! `protomod ls-files` command

use anyhow::Result;

use protomod::ops::ModuleReader;
use protomod::util::GlobalContext;
use protomod::Workspace;

use super::{resolve_options, resolve_workspace};
use crate::cli::LsFilesArgs;

pub fn execute(args: LsFilesArgs, ctx: &GlobalContext) -> Result<()> {
    let workspace = if args.module {
        let options = resolve_options(&args.input, ctx)?;
        let provider = ctx.provider()?;
        ModuleReader::new(&provider).read_module(ctx.bucket(), &options)?
    } else {
        resolve_workspace(&args.input, ctx)?
    };

    for path in listed_paths(&workspace, args.all)? {
        println!("{}", path);
    }
    Ok(())
}

/// Target files of target modules, or every proto file with `all`.
///
/// Remote files are prefixed with the module name.
fn listed_paths(workspace: &Workspace, all: bool) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for module in workspace.modules() {
        if all {
            let prefix = if module.is_local() {
                String::new()
            } else {
                format!("{}:", module.opaque_id())
            };
            for info in module.proto_files()? {
                paths.push(format!("{}{}", prefix, info.path()));
            }
        } else if module.is_target() {
            paths.extend(module.target_files()?.into_iter().map(|info| info.path().to_string()));
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}
