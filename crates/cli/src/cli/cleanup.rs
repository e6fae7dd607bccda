use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use model_cache::{SwapConfig, gigabytes};

use crate::cli::{CleanupArgs, GlobalArgs};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs, args: CleanupArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let cache_dir = global.cache_dir.unwrap_or(cfg.cache_dir);
    let swap_path = global.swap_config.unwrap_or(cfg.swap_config);

    let swap = SwapConfig::load(&swap_path)
        .with_context(|| format!("reading {}", swap_path.display()))?;
    let configured = swap.configured();

    if !cache_dir.is_dir() {
        println!("Cache directory {} does not exist.", cache_dir.display());
        return Ok(());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&cache_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut unused: Vec<(PathBuf, u64)> = Vec::new();

    println!("{:<60} | {:<10}", "Unused cached file", "Size (GB)");
    println!("{}", "-".repeat(75));

    for path in entries {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if configured.covers(&name) {
            continue;
        }
        // Sidecars are cheap; only the heavy payload files are listed.
        if name.ends_with(".json") || name.ends_with(".etag") {
            continue;
        }
        let size = fs::metadata(&path)?.len();
        println!("{:<60} | {:.2}", name, gigabytes(size));
        unused.push((path, size));
    }

    println!("{}", "-".repeat(75));
    let total: u64 = unused.iter().map(|(_, size)| *size).sum();
    println!("Total potentially unused size: {:.2} GB", gigabytes(total));

    if unused.is_empty() {
        println!("No unused files found.");
        return Ok(());
    }

    if !args.yes && !confirm("Do you want to delete these files?")? {
        println!("No files deleted.");
        return Ok(());
    }

    for (path, _) in &unused {
        match fs::remove_file(path) {
            Ok(()) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                println!("Deleted {}", name.unwrap_or_else(|| path.display().to_string()));
            }
            Err(e) => eprintln!("Error deleting {}: {e}", path.display()),
        }
    }
    println!("Cleanup complete.");
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("\n{prompt} (y/N): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().eq_ignore_ascii_case("y"))
}
