//! `protomod dep-prune` command

use anyhow::Result;

use protomod::ops::{ResolveOptions, WorkspaceProvider};
use protomod::util::GlobalContext;
use protomod::ModuleKey;

use crate::cli::DepPruneArgs;

pub fn execute(args: DepPruneArgs, ctx: &GlobalContext) -> Result<()> {
    let options = ResolveOptions::builder().sub_dir_path(&args.input).build()?;
    let provider = ctx.provider()?;
    let updateable = WorkspaceProvider::new(&provider).get_updateable_workspace(ctx.bucket(), &options)?;

    let mut keys = Vec::new();
    for module in updateable.workspace().module_set().remote_deps_of_locals()? {
        let (Some(full_name), Some(commit_id)) = (module.full_name(), module.commit_id()) else {
            continue;
        };
        keys.push(ModuleKey::new(full_name.clone(), commit_id, Some(module.digest()?)));
    }

    let lock_path = updateable.lock_file_path()?;
    if args.dry_run {
        println!("would write {} with {} dependencies", lock_path, keys.len());
        for key in &keys {
            println!("  {}", key);
        }
        return Ok(());
    }
    updateable.put_lock_file(keys)?;
    Ok(())
}
