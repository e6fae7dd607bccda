use std::io;
use std::process::Stdio;

use anyhow::Context;
use model_cache::SwapConfig;
use tokio::process::Command;

use crate::cli::{DownloadArgs, GlobalArgs};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs, args: DownloadArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let swap_path = global.swap_config.unwrap_or(cfg.swap_config);

    println!("Reading configuration from {}...", swap_path.display());
    let swap = SwapConfig::load(&swap_path)
        .with_context(|| format!("reading {}", swap_path.display()))?;

    println!("Found {} models.", swap.models.len());
    println!("{}", "-".repeat(60));

    for (name, entry) in &swap.models {
        if entry.cmd.is_empty() {
            println!("Skipping {name}: no command found.");
            continue;
        }

        println!("Processing model: {name}");
        let dl_args = entry.download_args();
        if dl_args.is_empty() {
            println!("  warning: no Hugging Face arguments in command, skipping");
            continue;
        }

        println!("  running: llama-completion {}", dl_args.join(" "));
        if args.dry_run {
            println!("{}", "-".repeat(60));
            continue;
        }

        // Loading the model and emitting a single token forces
        // llama.cpp to fetch it into the cache.
        let status = Command::new("llama-completion")
            .args(&dl_args)
            .args(["-p", "System check", "-n", "1", "--no-display-prompt"])
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => println!("  -> verified"),
            Ok(_) => println!("  -> failed (or interrupted)"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                anyhow::bail!(
                    "'llama-completion' not found in PATH; install llama.cpp first"
                );
            }
            Err(e) => return Err(e).context(format!("running llama-completion for {name}")),
        }

        println!("{}", "-".repeat(60));
    }

    Ok(())
}
