//! Decompression and line splitting for fetched log objects.

use std::io::Read;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;

use crate::error::DecodeError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const MAX_CAPACITY_HINT: usize = 64 << 20;

/// Compression applied to stored log objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// CloudFront standard logs are always gzip-compressed
    #[default]
    Gzip,
    None,
    /// Gzip when the payload starts with the gzip magic bytes, plain otherwise
    Auto,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::None => "none",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "none" | "identity" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "Unsupported compression: {}. Supported: gzip, none, auto",
                other
            )),
        }
    }
}

/// Decompress a fetched object.
///
/// Concatenated gzip members (as produced by appending compressed chunks)
/// are decoded as one stream.
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, DecodeError> {
    let gzip = match compression {
        Compression::Gzip => true,
        Compression::None => false,
        Compression::Auto => data.starts_with(&GZIP_MAGIC),
    };
    if !gzip {
        return Ok(data.to_vec());
    }

    let mut decoder = MultiGzDecoder::new(data);
    let mut decompressed = Vec::with_capacity(capacity_hint(data.len()));
    decoder
        .read_to_end(&mut decompressed)
        .map_err(DecodeError::Gzip)?;
    Ok(decompressed)
}

/// Initial buffer for a gzip body; `read_to_end` grows it past this.
fn capacity_hint(compressed_len: usize) -> usize {
    compressed_len.saturating_mul(4).min(MAX_CAPACITY_HINT)
}

/// Split decoded text into lines without their `\n`.
///
/// A trailing newline does not produce a final empty line.
pub fn lines(text: &[u8]) -> impl Iterator<Item = &[u8]> {
    let text = text.strip_suffix(b"\n").unwrap_or(text);
    let empty = text.is_empty();
    text.split(|b| *b == b'\n').filter(move |_| !empty)
}
