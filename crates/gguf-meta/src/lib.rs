//! Streaming GGUF metadata reader.
//!
//! Extracts a handful of scalar facts — context length, transformer
//! block count, tensor count — from a `.gguf` file **without**
//! materializing the rest of the metadata.  Tracked keys are decoded in
//! place; every other value is skipped byte-exactly so the walk stays
//! aligned with the next entry.  Only the key-value block at the head of
//! the file is ever read, never the tensor payload.

pub mod reader;
pub mod types;

pub use reader::{ModelFacts, read_model_facts, scan};
pub use types::{GGUF_MAGIC, GgufError, GgufHeader, GgufValueType, ValueLayout};
