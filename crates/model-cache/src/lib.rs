//! Bookkeeping for a local llama.cpp model cache.
//!
//! Three concerns, all read-only unless the caller deletes explicitly:
//!
//! * **lookup** — resolve a `repository[:tag]` query to cached files by
//!   fuzzy filename matching.
//! * **swap** — parse a llama-swap configuration and extract the
//!   Hugging Face repos and companion files each model references.
//! * **hub** — best-effort upload-date lookup against the Hub API.

pub mod error;
pub mod hub;
pub mod lookup;
pub mod swap;

pub use error::{CacheError, Result};
pub use hub::fetch_upload_date;
pub use lookup::{CacheQuery, default_cache_dir, find_files, gigabytes, pick_main_file, total_size};
pub use swap::{ConfiguredModels, ModelEntry, SwapConfig};
