//! Fuzzy lookup of cached model files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// A parsed `repository[:tag]` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheQuery {
    pub repo: String,
    pub tag: Option<String>,
}

impl CacheQuery {
    /// Split on the first `:`; everything after it is the tag.
    pub fn parse(query: &str) -> Self {
        match query.split_once(':') {
            Some((repo, tag)) => Self {
                repo: repo.to_string(),
                tag: Some(tag.to_string()),
            },
            None => Self {
                repo: query.to_string(),
                tag: None,
            },
        }
    }

    /// Cache filenames embed the repo with `/` flattened to `_`
    /// (`unsloth/Qwen3-4B` → `unsloth_Qwen3-4B…`).
    pub fn filename_fragment(&self) -> String {
        self.repo.replace('/', "_").to_lowercase()
    }
}

/// Default llama.cpp download cache: `~/.cache/llama.cpp/`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("llama.cpp")
}

/// Sidecar and partial-download files that accompany cached models.
fn is_sidecar(name: &str) -> bool {
    name.ends_with(".json") || name.ends_with(".etag") || name.contains("downloadInProgress")
}

/// Resolve `query` to cached files.
///
/// A query naming an existing file resolves to exactly that file.
/// Otherwise it is parsed as `repository[:tag]` and matched
/// case-insensitively as a substring of cache filenames, with the tag
/// narrowing further.  Sidecars are never returned.  Results are
/// sorted.
pub fn find_files(cache_dir: &Path, query: &str) -> Result<Vec<PathBuf>> {
    let as_path = Path::new(query);
    if as_path.is_file() {
        return Ok(vec![as_path.to_path_buf()]);
    }

    let parsed = CacheQuery::parse(query);
    let fragment = parsed.filename_fragment();
    let tag = parsed.tag.as_deref().map(str::to_lowercase);

    let mut matches = Vec::new();
    if !cache_dir.is_dir() {
        debug!(dir = %cache_dir.display(), "cache directory does not exist");
        return Ok(matches);
    }

    for entry in fs::read_dir(cache_dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_sidecar(&name) {
            continue;
        }
        let lower = name.to_lowercase();
        if !lower.contains(&fragment) {
            continue;
        }
        if let Some(tag) = &tag {
            if !lower.contains(tag) {
                continue;
            }
        }
        matches.push(path);
    }

    matches.sort();
    Ok(matches)
}

/// Pick the file whose header is worth parsing: the first plain
/// `.gguf` (no mmproj companion, no split marker in the name), else the
/// first shard of a split set, else the first match.
pub fn pick_main_file(files: &[PathBuf]) -> Option<&Path> {
    let mut main = files.first()?.as_path();
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let name = name.to_string_lossy();
        if name.ends_with(".gguf") && !name.contains("mmproj") && !name.contains("split") {
            return Some(file.as_path());
        }
        if name.contains("00001-of-") {
            main = file.as_path();
        }
    }
    Some(main)
}

/// Sum of on-disk sizes; files that vanish mid-walk are ignored.
pub fn total_size(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|f| fs::metadata(f).ok())
        .map(|m| m.len())
        .sum()
}

pub fn gigabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}
