//! Best-effort Hugging Face Hub lookups.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

/// Hard deadline for the whole lookup.  The caller renders a
/// placeholder on any miss, so there is nothing to retry.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct HubModelInfo {
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
}

/// Resolve the upload date of `repo` (e.g. `unsloth/Qwen3-4B`) via the
/// Hub API, formatted `YYYY-MM-DD`.
///
/// Every failure — client build, network, HTTP status, payload shape,
/// date parse — yields `None`.
pub async fn fetch_upload_date(repo: &str) -> Option<String> {
    let url = format!("https://huggingface.co/api/models/{repo}");
    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
        .ok()?;

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(repo, error = %e, "hub lookup failed");
            return None;
        }
    };

    let info: HubModelInfo = response.error_for_status().ok()?.json().await.ok()?;
    format_created_at(info.created_at.as_deref()?)
}

/// `2025-04-28T07:23:54.000Z` → `2025-04-28`.
fn format_created_at(raw: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(parsed.format("%Y-%m-%d").to_string())
}
