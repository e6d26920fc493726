use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "dep-checkr",
    about = "Resolve the installed dependency graph of Node.js projects",
    version
)]
pub struct Cli {
    /// Project path to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Config file [default: ./.dep-checkr/config.toml, fallback ~/.config/dep-checkr/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "summary", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Analyze every package.json below PATH, not just PATH itself
    #[arg(short, long)]
    pub recursive: bool,

    /// Never invoke npm; read lockfiles or node_modules instead
    #[arg(long)]
    pub no_npm: bool,

    /// Leave out devDependencies
    #[arg(long)]
    pub production: bool,

    /// Debug logging and per-package output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print results, no progress
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Summary,
    Json,
}
