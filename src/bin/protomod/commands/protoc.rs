//! `protomod protoc` command

use anyhow::Result;

use protomod::ops::{read_protoc, ProtocOptions};
use protomod::util::GlobalContext;

use crate::cli::ProtocArgs;

pub fn execute(args: ProtocArgs, ctx: &GlobalContext) -> Result<()> {
    let options = ProtocOptions {
        include_dirs: args.include_dirs,
        file_paths: args.files,
    };
    let workspace = read_protoc(ctx.bucket(), &options)?;

    for module in workspace.modules() {
        let files = if args.all {
            module.proto_files()?
        } else {
            module.target_files()?
        };
        for info in files {
            println!("{}", info.path());
        }
    }
    Ok(())
}
