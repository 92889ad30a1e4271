use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "depot",
    about = "Depot: game package inspector",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show a package's summary
    Info(InfoArgs),
    /// List a package's tables and exports
    Tree(TreeArgs),
    /// Run the full startup pipeline over a content root
    Scan(ScanArgs),
    /// Build a package file from a JSON manifest
    Pack(PackArgs),
}

#[derive(Args)]
pub struct InfoArgs {
    /// Package file to inspect
    pub package: PathBuf,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Package file to inspect
    pub package: PathBuf,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Content root directory
    pub root: PathBuf,

    /// Class packages to load, in order
    #[arg(long, value_delimiter = ',')]
    pub class_packages: Option<Vec<String>>,
}

#[derive(Args)]
pub struct PackArgs {
    /// JSON manifest describing the package
    pub manifest: PathBuf,

    /// Output package path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Compress the payload region
    #[arg(long)]
    pub compress: bool,
}
