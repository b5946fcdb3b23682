//! `protomod ls-modules` command

use anyhow::Result;
use serde::Serialize;

use protomod::util::GlobalContext;
use protomod::{Module, Workspace};

use super::resolve_workspace;
use crate::cli::{LsModulesArgs, OutputFormat};

#[derive(Serialize)]
struct ModuleListing {
    opaque_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_id: Option<String>,
    local: bool,
    target: bool,
    /// Opaque ids of the modules this one imports from
    deps: Vec<String>,
}

pub fn execute(args: LsModulesArgs, ctx: &GlobalContext) -> Result<()> {
    let workspace = resolve_workspace(&args.input, ctx)?;
    let listings = workspace
        .modules()
        .iter()
        .map(|module| listing(&workspace, module))
        .collect::<Result<Vec<_>>>()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
        OutputFormat::Text => {
            for listing in &listings {
                println!(
                    "{}\t{}\t{}",
                    listing.opaque_id,
                    if listing.local { "local" } else { "remote" },
                    if listing.target { "target" } else { "non-target" }
                );
            }
        }
    }
    Ok(())
}

fn listing(workspace: &Workspace, module: &Module) -> Result<ModuleListing> {
    let deps = workspace
        .module_set()
        .direct_deps(module)?
        .iter()
        .map(|dep| dep.opaque_id().to_string())
        .collect();
    Ok(ModuleListing {
        opaque_id: module.opaque_id().to_string(),
        bucket_id: module.bucket_id().map(str::to_string),
        full_name: module.full_name().map(ToString::to_string),
        commit_id: module.commit_id().map(str::to_string),
        local: module.is_local(),
        target: module.is_target(),
        deps,
    })
}
