use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "npzee",
    about = "Named numeric variables in plain directories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Registry configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, register, list or remove named workspaces
    Workspace(WorkspaceArgs),
    /// List the variables of a workspace
    Vars(VarsArgs),
    /// Print a variable
    Show(ShowArgs),
    /// Store a number or a string
    Set(SetArgs),
    /// Check a variable's array blobs against its recorded digests
    Verify(VerifyArgs),
    /// Remove a variable
    Rm(RmArgs),
    /// Remove every variable of a workspace
    Clear(ClearArgs),
    /// Pack a workspace into a bundle
    Export(ExportArgs),
    /// Unpack a bundle into a workspace
    Import(ImportArgs),
}

#[derive(Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub action: WorkspaceAction,
}

#[derive(Subcommand)]
pub enum WorkspaceAction {
    /// Create a new workspace under the registry root
    Create { name: String },
    /// Register an existing directory
    Register { name: String, path: PathBuf },
    /// List registered workspaces
    List,
    /// Forget a workspace
    Remove {
        name: String,
        /// Also delete its directory
        #[arg(long)]
        delete: bool,
    },
}

/// A workspace is addressed by registered name or by directory path.
#[derive(Args)]
pub struct VarsArgs {
    pub workspace: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub workspace: String,
    pub name: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub workspace: String,
    pub name: String,
    pub value: String,
    /// Store the value as text even if it parses as a number
    #[arg(long)]
    pub text: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub workspace: String,
    pub name: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub workspace: String,
    pub name: String,
}

#[derive(Args)]
pub struct ClearArgs {
    pub workspace: String,
}

#[derive(Args)]
pub struct ExportArgs {
    pub workspace: String,
    pub out: PathBuf,
    /// zstd level
    #[arg(long, default_value = "3")]
    pub level: i32,
}

#[derive(Args)]
pub struct ImportArgs {
    pub bundle: PathBuf,
    pub workspace: String,
}
