//! Skip-or-capture walk over the GGUF key-value block.

use std::fs;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::*;

/// Key suffixes feeding the context-length resolution.  Key names are
/// architecture-prefixed (`llama.context_length`, `qwen3.block_count`)
/// and vary by model family, so matching is always by suffix.
const CTX_SUFFIXES: &[&str] = &[".context_length", ".context_length_train"];
const BLOCK_SUFFIX: &str = ".block_count";

/// Largest declared key length we will read.
const MAX_KEY_LEN: u64 = 1_000_000;

//  Public result type

/// Scalar facts extracted from one model file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFacts {
    pub max_context_length: Option<u64>,
    pub block_count: Option<u64>,
    pub tensor_count: u64,
}

//  Entry points

/// Best-effort wrapper around [`scan`]: any failure — wrong magic,
/// truncation, unknown type tag, I/O — collapses to `None`.
pub fn read_model_facts(path: &Path) -> Option<ModelFacts> {
    match scan(path) {
        Ok(facts) => Some(facts),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "GGUF scan failed");
            None
        }
    }
}

/// Walk the metadata block of `path` and extract context length, block
/// count and tensor count.
///
/// Tracked keys are decoded; every other value is skipped byte-exactly
/// via the [`ValueLayout`] table so the cursor stays aligned with the
/// next entry.  The tensor payload is never touched.
pub fn scan(path: &Path) -> Result<ModelFacts, GgufError> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);

    let header = read_header(&mut reader)?;

    let mut ctx_candidates: Vec<(String, u64)> = Vec::new();
    let mut block_candidates: Vec<u64> = Vec::new();

    for _ in 0..header.metadata_kv_count {
        let key = read_key(&mut reader)?;
        let vtype = GgufValueType::try_from(read_u32(&mut reader)?)?;

        if CTX_SUFFIXES.iter().any(|s| key.ends_with(s)) {
            if let Some(v) = read_scalar(&mut reader, vtype)? {
                ctx_candidates.push((key, v));
            }
        } else if key.ends_with(BLOCK_SUFFIX) {
            if let Some(v) = read_scalar(&mut reader, vtype)? {
                block_candidates.push(v);
            }
        } else {
            skip_value(&mut reader, vtype)?;
        }
    }

    let facts = ModelFacts {
        max_context_length: resolve_context_length(&ctx_candidates),
        block_count: block_candidates.iter().copied().max(),
        tensor_count: header.tensor_count,
    };
    debug!(path = %path.display(), facts = ?facts, "GGUF scan complete");
    Ok(facts)
}

//  Header

fn read_header(r: &mut impl Read) -> Result<GgufHeader, GgufError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)
        .map_err(|_| GgufError::TruncatedHeader)?;
    if magic != GGUF_MAGIC {
        return Err(GgufError::InvalidMagic(magic));
    }

    let version = read_u32(r)?;
    let tensor_count = read_u64(r)?;
    let metadata_kv_count = read_u64(r)?;

    Ok(GgufHeader {
        version,
        tensor_count,
        metadata_kv_count,
    })
}

//  Capture

/// Decode an integer-typed value as `u64`.
///
/// Non-integer types are skipped (the cursor still advances exactly)
/// and yield no candidate.  Signed values outside `u64` are decoded but
/// discarded — a wrap-around cast would corrupt the max() tie-breaks.
fn read_scalar(
    r: &mut (impl Read + Seek),
    vtype: GgufValueType,
) -> Result<Option<u64>, GgufError> {
    let value = match vtype {
        GgufValueType::Uint8 => Some(u64::from(read_u8(r)?)),
        GgufValueType::Uint16 => Some(u64::from(read_u16(r)?)),
        GgufValueType::Uint32 => Some(u64::from(read_u32(r)?)),
        GgufValueType::Uint64 => Some(read_u64(r)?),
        GgufValueType::Int8 => u64::try_from(read_i8(r)?).ok(),
        GgufValueType::Int16 => u64::try_from(read_i16(r)?).ok(),
        GgufValueType::Int32 => u64::try_from(read_i32(r)?).ok(),
        GgufValueType::Int64 => u64::try_from(read_i64(r)?).ok(),
        other => {
            skip_value(r, other)?;
            None
        }
    };
    Ok(value)
}

/// Prefer the largest candidate whose key does not end in `_train`;
/// fall back to the largest overall.  This is policy, not a format
/// guarantee — model families are not consistent in key naming.
fn resolve_context_length(candidates: &[(String, u64)]) -> Option<u64> {
    candidates
        .iter()
        .filter(|(key, _)| !key.ends_with("_train"))
        .map(|(_, v)| *v)
        .max()
        .or_else(|| candidates.iter().map(|(_, v)| *v).max())
}

//  Skip

/// Advance past one value without materializing it.
fn skip_value(r: &mut (impl Read + Seek), vtype: GgufValueType) -> Result<(), GgufError> {
    match vtype.layout() {
        ValueLayout::Fixed(width) => seek_forward(r, width),
        ValueLayout::LengthPrefixed => {
            let len = read_u64(r)?;
            seek_forward(r, len)
        }
        ValueLayout::Array => {
            let elem_type = GgufValueType::try_from(read_u32(r)?)?;
            let count = read_u64(r)?;
            match elem_type.layout() {
                // One seek of count * width covers the whole array.
                ValueLayout::Fixed(width) => {
                    let bytes = count.checked_mul(width).ok_or_else(|| {
                        GgufError::Other(format!("array of {count} elements too large"))
                    })?;
                    seek_forward(r, bytes)
                }
                // String elements carry their own length prefixes.
                _ => {
                    for _ in 0..count {
                        skip_value(r, elem_type)?;
                    }
                    Ok(())
                }
            }
        }
    }
}

fn seek_forward(r: &mut impl Seek, bytes: u64) -> Result<(), GgufError> {
    let offset = i64::try_from(bytes)
        .map_err(|_| GgufError::Other(format!("skip of {bytes} bytes too large")))?;
    r.seek_relative(offset)?;
    Ok(())
}

//  Binary reading primitives

fn read_key(r: &mut impl Read) -> Result<String, GgufError> {
    let len = read_u64(r)?;
    if len > MAX_KEY_LEN {
        return Err(GgufError::Other(format!("key length {len} too large")));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_u8(r: &mut impl Read) -> Result<u8, GgufError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_i8(r: &mut impl Read) -> Result<i8, GgufError> {
    Ok(read_u8(r)? as i8)
}

fn read_u16(r: &mut impl Read) -> Result<u16, GgufError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_i16(r: &mut impl Read) -> Result<i16, GgufError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(i16::from_le_bytes(buf))
}

fn read_u32(r: &mut impl Read) -> Result<u32, GgufError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32, GgufError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64(r: &mut impl Read) -> Result<u64, GgufError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64(r: &mut impl Read) -> Result<i64, GgufError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Builds synthetic GGUF files on the wire format: magic, version,
    /// tensor count, KV count, then the raw KV bytes.
    struct GgufBuilder {
        tensor_count: u64,
        kv_count: u64,
        body: Vec<u8>,
    }

    impl GgufBuilder {
        fn new() -> Self {
            Self {
                tensor_count: 0,
                kv_count: 0,
                body: Vec::new(),
            }
        }

        fn tensor_count(mut self, n: u64) -> Self {
            self.tensor_count = n;
            self
        }

        fn push_key(&mut self, key: &str) {
            self.body.extend_from_slice(&(key.len() as u64).to_le_bytes());
            self.body.extend_from_slice(key.as_bytes());
            self.kv_count += 1;
        }

        fn kv_u32(mut self, key: &str, value: u32) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Uint32 as u32).to_le_bytes());
            self.body.extend_from_slice(&value.to_le_bytes());
            self
        }

        fn kv_i32(mut self, key: &str, value: i32) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Int32 as u32).to_le_bytes());
            self.body.extend_from_slice(&value.to_le_bytes());
            self
        }

        fn kv_u64(mut self, key: &str, value: u64) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Uint64 as u32).to_le_bytes());
            self.body.extend_from_slice(&value.to_le_bytes());
            self
        }

        fn kv_f32(mut self, key: &str, value: f32) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Float32 as u32).to_le_bytes());
            self.body.extend_from_slice(&value.to_le_bytes());
            self
        }

        fn kv_string(mut self, key: &str, value: &str) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::String as u32).to_le_bytes());
            self.body
                .extend_from_slice(&(value.len() as u64).to_le_bytes());
            self.body.extend_from_slice(value.as_bytes());
            self
        }

        fn kv_f32_array(mut self, key: &str, values: &[f32]) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Array as u32).to_le_bytes());
            self.body
                .extend_from_slice(&(GgufValueType::Float32 as u32).to_le_bytes());
            self.body
                .extend_from_slice(&(values.len() as u64).to_le_bytes());
            for v in values {
                self.body.extend_from_slice(&v.to_le_bytes());
            }
            self
        }

        fn kv_string_array(mut self, key: &str, values: &[&str]) -> Self {
            self.push_key(key);
            self.body
                .extend_from_slice(&(GgufValueType::Array as u32).to_le_bytes());
            self.body
                .extend_from_slice(&(GgufValueType::String as u32).to_le_bytes());
            self.body
                .extend_from_slice(&(values.len() as u64).to_le_bytes());
            for v in values {
                self.body.extend_from_slice(&(v.len() as u64).to_le_bytes());
                self.body.extend_from_slice(v.as_bytes());
            }
            self
        }

        fn kv_raw_tag(mut self, key: &str, tag: u32) -> Self {
            self.push_key(key);
            self.body.extend_from_slice(&tag.to_le_bytes());
            self
        }

        fn finish(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&GGUF_MAGIC);
            out.extend_from_slice(&3u32.to_le_bytes());
            out.extend_from_slice(&self.tensor_count.to_le_bytes());
            out.extend_from_slice(&self.kv_count.to_le_bytes());
            out.extend_from_slice(&self.body);
            out
        }
    }

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create tmp");
        tmp.write_all(bytes).expect("write tmp");
        tmp
    }

    fn facts_of(bytes: &[u8]) -> Option<ModelFacts> {
        let tmp = write_temp(bytes);
        read_model_facts(tmp.path())
    }

    #[test]
    fn rejects_wrong_magic_without_panicking() {
        assert_eq!(facts_of(b"NOPE\x03\x00\x00\x00"), None);
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(facts_of(b""), None);
    }

    #[test]
    fn scan_reports_the_magic_mismatch() {
        let tmp = write_temp(b"ggml rest of some other container");
        assert!(matches!(
            scan(tmp.path()),
            Err(GgufError::InvalidMagic(_))
        ));
    }

    #[test]
    fn prefers_non_train_context_length() {
        let bytes = GgufBuilder::new()
            .kv_u32("llama.context_length", 4096)
            .kv_u32("llama.context_length_train", 8192)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.max_context_length, Some(4096));
    }

    #[test]
    fn falls_back_to_train_context_length() {
        let bytes = GgufBuilder::new()
            .kv_u32("llama.context_length_train", 8192)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.max_context_length, Some(8192));
    }

    #[test]
    fn block_count_ties_break_by_max() {
        let bytes = GgufBuilder::new()
            .kv_u32("a.block_count", 12)
            .kv_u32("b.block_count", 32)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.block_count, Some(32));
    }

    #[test]
    fn fixed_width_array_is_skipped_exactly() {
        // A tracked key AFTER the untracked array only decodes if the
        // skip advanced by exactly count * element width.
        let bytes = GgufBuilder::new()
            .kv_f32_array("tokenizer.ggml.scores", &[0.5; 97])
            .kv_u32("llama.context_length", 2048)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.max_context_length, Some(2048));
    }

    #[test]
    fn string_array_is_skipped_exactly() {
        let bytes = GgufBuilder::new()
            .kv_string_array("tokenizer.ggml.tokens", &["<s>", "</s>", "hello", ""])
            .kv_u32("llama.block_count", 36)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.block_count, Some(36));
    }

    #[test]
    fn round_trips_a_minimal_file() {
        let bytes = GgufBuilder::new()
            .tensor_count(291)
            .kv_string("general.architecture", "qwen3")
            .kv_u64("qwen3.context_length", 40960)
            .kv_u32("qwen3.block_count", 36)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(
            facts,
            ModelFacts {
                max_context_length: Some(40960),
                block_count: Some(36),
                tensor_count: 291,
            }
        );
    }

    #[test]
    fn unknown_type_tag_aborts_the_whole_read() {
        let bytes = GgufBuilder::new()
            .kv_u32("llama.context_length", 4096)
            .kv_raw_tag("general.mystery", 99)
            .finish();
        assert_eq!(facts_of(&bytes), None);
    }

    #[test]
    fn truncated_entry_yields_none() {
        let mut bytes = GgufBuilder::new()
            .kv_u32("llama.context_length", 4096)
            .kv_u32("llama.block_count", 32)
            .finish();
        bytes.truncate(bytes.len() - 10);
        assert_eq!(facts_of(&bytes), None);
    }

    #[test]
    fn tracked_key_with_float_value_is_skipped() {
        let bytes = GgufBuilder::new()
            .kv_f32("rope.context_length", 1.5)
            .kv_u32("llama.block_count", 40)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.max_context_length, None);
        assert_eq!(facts.block_count, Some(40));
    }

    #[test]
    fn negative_tracked_value_is_discarded() {
        let bytes = GgufBuilder::new()
            .kv_i32("llama.context_length", -1)
            .kv_u32("llama.context_length_train", 8192)
            .finish();
        let facts = facts_of(&bytes).unwrap();
        // The only non-train candidate was unusable, so the train key wins.
        assert_eq!(facts.max_context_length, Some(8192));
    }

    #[test]
    fn file_with_no_tracked_keys_still_reports_tensor_count() {
        let bytes = GgufBuilder::new()
            .tensor_count(7)
            .kv_string("general.name", "tiny")
            .finish();
        let facts = facts_of(&bytes).unwrap();
        assert_eq!(facts.max_context_length, None);
        assert_eq!(facts.block_count, None);
        assert_eq!(facts.tensor_count, 7);
    }
}
