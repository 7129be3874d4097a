//! Character encoding detection for delimited text.
//!
//! Candidates are tried in rank order. A candidate wins when it decodes the
//! sampled leading lines and then the whole buffer without a single malformed
//! sequence.

use encoding_rs::Encoding;
use tracing::debug;

use crate::error::{PrepError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Text decoded with the encoding that accepted it.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    /// Canonical WHATWG name of the winning encoding (e.g. `UTF-8`, `Shift_JIS`).
    pub encoding: &'static str,
}

/// Resolve encoding labels, failing on the first unknown one.
pub fn resolve_candidates(labels: &[String]) -> Result<Vec<&'static Encoding>> {
    labels
        .iter()
        .map(|label| {
            Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| PrepError::InvalidConfig(format!("Unknown encoding '{label}'")))
        })
        .collect()
}

/// Leading slice of `bytes` covering at most `lines` lines.
fn sample_lines(bytes: &[u8], lines: usize) -> &[u8] {
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .nth(lines.saturating_sub(1))
        .map(|(idx, _)| &bytes[..=idx])
        .unwrap_or(bytes)
}

/// Decode without replacement; `None` if any sequence is malformed.
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Detect the encoding of `bytes` and decode them.
///
/// A leading UTF-8 byte order mark is stripped before any candidate is tried.
pub fn detect_and_decode(
    bytes: &[u8],
    candidates: &[&'static Encoding],
    sample_rows: usize,
) -> Result<DecodedText> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let sample = sample_lines(bytes, sample_rows);

    for encoding in candidates {
        if decode_strict(encoding, sample).is_none() {
            debug!("Encoding {} rejected on sampled lines", encoding.name());
            continue;
        }
        match decode_strict(encoding, bytes) {
            Some(text) => {
                debug!("Detected encoding {}", encoding.name());
                return Ok(DecodedText {
                    text,
                    encoding: encoding.name(),
                });
            }
            None => debug!("Encoding {} rejected on full buffer", encoding.name()),
        }
    }

    Err(PrepError::UnreadableFile(format!(
        "none of the encodings [{}] could decode the file",
        candidates
            .iter()
            .map(|e| e.name())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}
