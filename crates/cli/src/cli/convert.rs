//! Parallel HTML → Markdown conversion of a mirrored MediaWiki dump.
//!
//! Each page is independent: extract the content div, pipe it through
//! pandoc, write the result with a YAML frontmatter block.  A failure
//! in one page never affects the others; failures are counted and
//! reported at the end.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cli::ConvertArgs;

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<h1[^>]*id="firstHeading"[^>]*>(.*?)</h1>"#).expect("valid regex")
});
static EDIT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<span class="mw-editsection">.*?</span>"#).expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static DIV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b").expect("valid regex"));

const CONTENT_MARKER: &str = r#"<div class="mw-parser-output""#;

#[derive(Serialize)]
struct Frontmatter {
    title: String,
    url: String,
}

pub async fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    if !args.source.is_dir() {
        anyhow::bail!("source directory {} does not exist", args.source.display());
    }

    let mut files = Vec::new();
    collect_html(&args.source, &mut files)?;
    files.sort();
    let total = files.len();

    let jobs = args.jobs.unwrap_or_else(|| {
        // pandoc runs as a subprocess, so 2x cores keeps the pipes full
        // without thrashing.
        std::thread::available_parallelism()
            .map(|n| n.get() * 2)
            .unwrap_or(4)
    });

    println!(
        "Converting {total} files from {} to {} using {jobs} workers...",
        args.source.display(),
        args.output.display()
    );

    let limit = Arc::new(Semaphore::new(jobs));
    let done = Arc::new(AtomicUsize::new(0));
    let mut workers = JoinSet::new();

    for file in files {
        let limit = Arc::clone(&limit);
        let done = Arc::clone(&done);
        let source = args.source.clone();
        let output = args.output.clone();
        workers.spawn(async move {
            let _permit = limit.acquire_owned().await.ok();
            let result = convert_file(&file, &source, &output).await;

            let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\r[{completed}/{total}] processed");
            let _ = stderr.flush();

            (file, result)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = workers.join_next().await {
        let (file, result) = joined.context("worker panicked")?;
        if let Err(e) = result {
            failures += 1;
            eprintln!("\n{}: {e:#}", file.display());
        }
    }
    eprintln!();

    println!("Done. Converted {} files, {failures} failed.", total - failures);
    Ok(())
}

async fn convert_file(file: &Path, source: &Path, output: &Path) -> anyhow::Result<()> {
    let rel = file.strip_prefix(source).unwrap_or(file);
    let out_path = output.join(rel).with_extension("md");
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let html = tokio::fs::read_to_string(file).await?;
    let page = extract_page(&html).context("no content found")?;

    let stem = rel
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = page.title.unwrap_or_else(|| stem.clone());

    let markdown = pandoc(&page.body).await?;

    let frontmatter = Frontmatter {
        title,
        url: format!("https://wiki.nixos.org/wiki/{stem}"),
    };
    let mut out = String::from("---\n");
    out.push_str(&serde_yaml::to_string(&frontmatter)?);
    out.push_str("---\n\n");
    out.push_str(&markdown);

    tokio::fs::write(&out_path, out).await?;
    Ok(())
}

struct Page {
    title: Option<String>,
    body: String,
}

/// Pull the page title and the `.mw-parser-output` content div out of
/// a rendered MediaWiki page.  Edit-section links are dropped.
fn extract_page(html: &str) -> Option<Page> {
    let title = TITLE
        .captures(html)
        .map(|cap| TAG.replace_all(&cap[1], "").trim().to_string());

    let start = html.find(CONTENT_MARKER)?;
    let body = balanced_div(&html[start..])?;
    let body = EDIT_SECTION.replace_all(body, "").into_owned();

    Some(Page { title, body })
}

/// Slice one `<div>…</div>` block off the front of `s`, tracking
/// nesting depth.
fn balanced_div(s: &str) -> Option<&str> {
    let mut depth = 0i64;
    for cap in DIV.captures_iter(s) {
        let whole = cap.get(0)?;
        if cap[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                let close = s[whole.start()..].find('>')?;
                return Some(&s[..whole.start() + close + 1]);
            }
        }
    }
    None
}

/// Pipe HTML through pandoc, producing GitHub-flavoured Markdown.
async fn pandoc(html: &str) -> anyhow::Result<String> {
    let mut child = Command::new("pandoc")
        .args(["-f", "html", "-t", "gfm-raw_html", "--wrap=none"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("spawning pandoc (is it installed?)")?;

    let mut stdin = child.stdin.take().context("pandoc stdin unavailable")?;
    let input = html.as_bytes().to_vec();
    let feed = async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    };

    // Feed stdin while draining stdout, or a page larger than the pipe
    // buffer deadlocks.
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    fed.context("writing to pandoc")?;
    let output = output.context("waiting for pandoc")?;

    if !output.status.success() {
        anyhow::bail!(
            "pandoc failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn collect_html(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_html(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("html") {
            out.push(path);
        }
    }
    Ok(())
}
