//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// protomod - inspect protobuf workspaces and modules
#[derive(Parser)]
#[command(name = "protomod")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Module cache directory
    #[arg(long, global = true, env = "PROTOMOD_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory that inputs are resolved against (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the files of the target modules
    LsFiles(LsFilesArgs),

    /// List the modules of the resolved workspace
    LsModules(LsModulesArgs),

    /// Report declared dependencies that are unused or missing
    DepAudit(DepAuditArgs),

    /// Rewrite the lock file with only the dependencies the targets use
    DepPrune(DepPruneArgs),

    /// Resolve protoc-style include directories and files
    Protoc(ProtocArgs),
}

/// Input selection shared by the workspace commands.
#[derive(Args)]
pub struct InputArgs {
    /// Input directory, relative to the root (defaults to the root, or to
    /// the directory of --file)
    pub input: Option<String>,

    /// Limit to these files or directories
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Exclude these files or directories
    #[arg(long = "exclude-path", value_name = "PATH")]
    pub exclude_paths: Vec<String>,

    /// Target a single .proto file
    #[arg(long, conflicts_with = "paths")]
    pub file: Option<String>,

    /// With --file, also target the files of the same package
    #[arg(long, requires = "file")]
    pub include_package_files: bool,

    /// buf.yaml content, or a path to a buf.yaml, used instead of the files on disk
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Args)]
pub struct LsFilesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Also list non-target files and files of non-target modules
    #[arg(long)]
    pub all: bool,

    /// Read the input as a single v1 module rather than a workspace
    #[arg(long, conflicts_with = "config")]
    pub module: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct LsModulesArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct DepAuditArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Also report imported modules that are not declared
    #[arg(long)]
    pub undeclared: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct DepPruneArgs {
    /// Workspace directory, relative to the root
    #[arg(default_value = ".")]
    pub input: String,

    /// Show what would be written without writing it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ProtocArgs {
    /// Include directory (repeatable)
    #[arg(short = 'I', long = "proto_path", value_name = "DIR")]
    pub include_dirs: Vec<String>,

    /// Files to target
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Also list non-target files
    #[arg(long)]
    pub all: bool,
}
