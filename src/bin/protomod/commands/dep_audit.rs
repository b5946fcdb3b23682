//! `protomod dep-audit` command

use anyhow::Result;

use protomod::ops::{malformed_deps_for_workspace, MalformedDepsOptions};
use protomod::util::GlobalContext;

use super::resolve_workspace;
use crate::cli::{DepAuditArgs, OutputFormat};

pub fn execute(args: DepAuditArgs, ctx: &GlobalContext) -> Result<()> {
    let workspace = resolve_workspace(&args.input, ctx)?;
    let options = MalformedDepsOptions {
        include_undeclared: args.undeclared,
    };
    let malformed = malformed_deps_for_workspace(&workspace, &options)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&malformed)?),
        OutputFormat::Text => {
            if malformed.is_empty() {
                tracing::info!("no malformed dependencies");
            }
            for dep in &malformed {
                println!("{}", dep);
            }
        }
    }
    Ok(())
}
