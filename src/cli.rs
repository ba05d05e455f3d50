use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "webrig")]
#[command(version)]
#[command(about = "Declarative web server configuration from deployment manifests", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a manifest by replaying it against an in-memory store
    Check(CheckArgs),

    /// Encrypt a configuration section for a site via the platform tool
    EncryptSection(EncryptArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Manifest to check (defaults to the configured manifest path)
    pub manifest: Option<PathBuf>,
}

#[derive(Parser)]
pub struct EncryptArgs {
    /// Numeric id of the site whose configuration holds the section
    #[arg(long)]
    pub site_id: u64,

    /// Section to encrypt, e.g. connectionStrings
    #[arg(long)]
    pub section: String,

    /// Use the .NET 2 runtime's tool instead of .NET 4
    #[arg(long)]
    pub net2: bool,
}
