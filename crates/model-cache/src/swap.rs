//! llama-swap configuration parsing.
//!
//! Each model in the config carries a `cmd` launch string; the tools
//! only care about the Hugging Face repo it points at (`-hf` /
//! `--hf-repo`) and any `--mmproj-url` companion file.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{CacheError, Result};

static HF_REPO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:-hf|--hf-repo)\s+(\S+)").expect("valid regex"));
static MMPROJ_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--mmproj-url\s+(\S+)").expect("valid regex"));

/// Arguments worth forwarding to `llama-completion` for a download run.
const DOWNLOAD_FLAGS: &[&str] = &["-hf", "--hf-repo", "--hf-file", "--mmproj-url"];

#[derive(Debug, Deserialize)]
pub struct SwapConfig {
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelEntry {
    #[serde(default)]
    pub cmd: String,
}

/// Repos and companion filenames referenced by a swap config.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfiguredModels {
    /// Hugging Face repos, tag stripped (`unsloth/Qwen3-4B`).
    pub repos: Vec<String>,
    /// Exact companion filenames (`mmproj-model-f16.gguf`).
    pub files: Vec<String>,
}

impl SwapConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CacheError::MissingConfig(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Extract every repo and companion filename the config references.
    pub fn configured(&self) -> ConfiguredModels {
        let mut out = ConfiguredModels::default();
        for entry in self.models.values() {
            if let Some(cap) = HF_REPO.captures(&entry.cmd) {
                let repo_tag = cap[1].to_string();
                let repo = match repo_tag.split_once(':') {
                    Some((repo, _tag)) => repo,
                    None => repo_tag.as_str(),
                };
                out.repos.push(repo.to_string());
            }
            if let Some(cap) = MMPROJ_URL.captures(&entry.cmd) {
                if let Some(name) = cap[1].rsplit('/').next() {
                    out.files.push(name.to_string());
                }
            }
        }
        out
    }
}

impl ModelEntry {
    /// The ordered `-hf`/`--hf-repo`/`--hf-file`/`--mmproj-url`
    /// arguments of the launch command, with their values.
    pub fn download_args(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut words = self.cmd.split_whitespace();
        while let Some(word) = words.next() {
            if DOWNLOAD_FLAGS.contains(&word) {
                out.push(word.to_string());
                if let Some(value) = words.next() {
                    out.push(value.to_string());
                }
            }
        }
        out
    }
}

impl ConfiguredModels {
    /// Whether a cached filename belongs to any configured model:
    /// repo flattened `/`→`_` as a case-insensitive substring, or an
    /// exact companion filename.
    pub fn covers(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.repos
            .iter()
            .any(|repo| lower.contains(&repo.replace('/', "_").to_lowercase()))
            || self.files.iter().any(|f| f == filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
models:
  qwen3:
    cmd: >
      llama-server --port 9001 -hf unsloth/Qwen3-4B:Q4_K_M --ctx-size 8192
  gemma-vision:
    cmd: >
      llama-server --port 9002 --hf-repo google/gemma-3-4b-it
      --mmproj-url https://example.com/files/mmproj-model-f16.gguf
  local-only:
    cmd: llama-server --port 9003 -m /models/local.gguf
"#;

    fn parsed() -> SwapConfig {
        serde_yaml::from_str(CONFIG).expect("valid yaml")
    }

    #[test]
    fn extracts_repos_with_tags_stripped() {
        let configured = parsed().configured();
        assert_eq!(
            configured.repos,
            vec!["google/gemma-3-4b-it".to_string(), "unsloth/Qwen3-4B".to_string()]
        );
    }

    #[test]
    fn extracts_mmproj_basename() {
        let configured = parsed().configured();
        assert_eq!(configured.files, vec!["mmproj-model-f16.gguf".to_string()]);
    }

    #[test]
    fn covers_matches_flattened_repo_case_insensitively() {
        let configured = parsed().configured();
        assert!(configured.covers("unsloth_qwen3-4b-Q4_K_M.gguf"));
        assert!(configured.covers("mmproj-model-f16.gguf"));
        assert!(!configured.covers("someone_else_model.gguf"));
    }

    #[test]
    fn download_args_keep_flag_order_and_values() {
        let config = parsed();
        let entry = &config.models["qwen3"];
        assert_eq!(entry.download_args(), vec!["-hf", "unsloth/Qwen3-4B:Q4_K_M"]);

        let entry = &config.models["gemma-vision"];
        assert_eq!(
            entry.download_args(),
            vec![
                "--hf-repo",
                "google/gemma-3-4b-it",
                "--mmproj-url",
                "https://example.com/files/mmproj-model-f16.gguf",
            ]
        );
    }

    #[test]
    fn command_without_hf_args_yields_nothing() {
        let config = parsed();
        assert!(config.models["local-only"].download_args().is_empty());
        let configured = config.configured();
        assert_eq!(configured.repos.len(), 2);
    }

    #[test]
    fn missing_file_is_a_distinct_error() {
        let err = SwapConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, CacheError::MissingConfig(_)));
    }
}
