mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    //  Logging — stderr, so stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();

    match args.command {
        cli::Commands::Info(info_args) => cli::info::execute(args.global, info_args).await,
        cli::Commands::Cleanup(cleanup_args) => {
            cli::cleanup::execute(args.global, cleanup_args).await
        }
        cli::Commands::Download(download_args) => {
            cli::download::execute(args.global, download_args).await
        }
        cli::Commands::Convert(convert_args) => cli::convert::execute(convert_args).await,
        cli::Commands::Config(config_args) => cli::config_cmd::execute(config_args).await,
    }
}
