pub mod cleanup;
pub mod config_cmd;
pub mod convert;
pub mod download;
pub mod info;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "llm-tools",
    version,
    about = "Bookkeeping for a local llama.cpp model cache"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Args, Clone)]
pub struct GlobalArgs {
    /// Model cache directory (default: ~/.cache/llama.cpp).
    #[arg(long, env = "LLM_TOOLS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// llama-swap configuration file.
    #[arg(long, env = "LLM_TOOLS_SWAP_CONFIG")]
    pub swap_config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a one-line summary of a cached model.
    Info(InfoArgs),

    /// List (and optionally delete) cached files no configured model references.
    Cleanup(CleanupArgs),

    /// Pre-download every model referenced by the swap config.
    Download(DownloadArgs),

    /// Convert a mirrored wiki dump from HTML to Markdown.
    Convert(ConvertArgs),

    /// View / edit configuration.
    Config(ConfigArgs),
}

//  Subcommand argument structs

#[derive(Debug, clap::Args, Clone)]
pub struct InfoArgs {
    /// `repository[:tag]` or a path to a model file.
    pub query: String,

    /// Skip the Hugging Face upload-date lookup.
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct CleanupArgs {
    /// Delete without prompting.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct DownloadArgs {
    /// Print the download commands without running them.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, clap::Args, Clone)]
pub struct ConvertArgs {
    /// Directory containing the mirrored HTML pages.
    #[arg(default_value = "nixos-wiki/wiki.nixos.org")]
    pub source: PathBuf,

    /// Output directory for the Markdown tree.
    #[arg(default_value = "nixos-wiki-md")]
    pub output: PathBuf,

    /// Worker count (default: 2x available cores).
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Display the current configuration.
    Show,
    /// Set a configuration value.
    Set { key: String, value: String },
}
