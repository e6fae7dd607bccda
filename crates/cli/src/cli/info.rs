use std::path::Path;

use gguf_meta::ModelFacts;
use model_cache::{CacheQuery, fetch_upload_date, find_files, gigabytes, pick_main_file, total_size};

use crate::cli::{GlobalArgs, InfoArgs};
use crate::config::AppConfig;

pub async fn execute(global: GlobalArgs, args: InfoArgs) -> anyhow::Result<()> {
    let cfg = AppConfig::load_or_default()?;
    let cache_dir = global.cache_dir.unwrap_or(cfg.cache_dir);

    let files = find_files(&cache_dir, &args.query)?;
    if files.is_empty() {
        anyhow::bail!("no files found for '{}'", args.query);
    }

    // A query naming a file on disk has no repo to look up on the Hub.
    let repo = (!Path::new(&args.query).exists())
        .then(|| CacheQuery::parse(&args.query).repo);

    let size_gb = gigabytes(total_size(&files));

    let facts = pick_main_file(&files).and_then(gguf_meta::read_model_facts);

    let date = match repo {
        Some(repo) if !args.offline => fetch_upload_date(&repo).await,
        _ => None,
    };

    println!("{}", summary_line(date.as_deref(), size_gb, facts.as_ref()));
    Ok(())
}

/// The one-line contract: `# Uploaded <date|????>, size <N.N> GB,
/// max ctx: <ctx|????>, layers: <layers|?>`.
fn summary_line(date: Option<&str>, size_gb: f64, facts: Option<&ModelFacts>) -> String {
    let date = date.unwrap_or("????");
    let ctx = facts
        .and_then(|f| f.max_context_length)
        .map(|c| c.to_string())
        .unwrap_or_else(|| "????".to_string());
    let layers = facts
        .and_then(|f| f.block_count)
        .map(|l| l.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!("# Uploaded {date}, size {size_gb:.1} GB, max ctx: {ctx}, layers: {layers}")
}
