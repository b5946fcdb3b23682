//! protomod CLI - inspect protobuf workspaces and modules

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use protomod::util::{diagnostic, GlobalContext};
use protomod::WorkspaceError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        std::process::exit(report(&e, color));
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("protomod=debug")
    } else {
        EnvFilter::new("protomod=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = match cli.root {
        Some(root) => GlobalContext::with_cwd(root)?,
        None => GlobalContext::new()?,
    }
    .with_cache_dir(cli.cache_dir);
    ctx.set_verbose(cli.verbose);
    ctx.set_color(color);

    match cli.command {
        Commands::LsFiles(args) => commands::ls_files::execute(args, &ctx),
        Commands::LsModules(args) => commands::ls_modules::execute(args, &ctx),
        Commands::DepAudit(args) => commands::dep_audit::execute(args, &ctx),
        Commands::DepPrune(args) => commands::dep_prune::execute(args, &ctx),
        Commands::Protoc(args) => commands::protoc::execute(args, &ctx),
    }
}

/// Print `err` and pick the exit code: 2 when nothing was targeted, else 1.
fn report(err: &anyhow::Error, color: bool) -> i32 {
    match err.downcast_ref::<WorkspaceError>() {
        Some(err) => {
            diagnostic::emit(&err.to_diagnostic(), color);
            if err.is_no_target_files() {
                2
            } else {
                1
            }
        }
        None => {
            eprintln!("error: {:#}", err);
            1
        }
    }
}
