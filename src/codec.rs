//! Codec Module
//!
//! Pluggable on-disk representation of blobs. The cache core never looks at
//! encoded bytes; it only sees what `decompress` hands back.

use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

// == Blob Codec ==
/// Compress/decompress pair applied to persisted blobs.
pub trait BlobCodec: Send + Sync + 'static {
    /// File extension (without the dot) identifying blobs written by this codec.
    fn extension(&self) -> &str;

    /// Encodes a raw payload for storage.
    fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>>;

    /// Decodes a stored file back into the raw payload.
    fn decompress(&self, stored: &[u8]) -> io::Result<Vec<u8>>;
}

// == Identity Codec ==
/// Stores payloads as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl BlobCodec for IdentityCodec {
    fn extension(&self) -> &str {
        "blob"
    }

    fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        Ok(raw.to_vec())
    }

    fn decompress(&self, stored: &[u8]) -> io::Result<Vec<u8>> {
        Ok(stored.to_vec())
    }
}

// == Gzip Codec ==
/// Gzip-compressed blobs.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    /// Creates a codec with the given compression level (0-9).
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::fast(),
        }
    }
}

impl BlobCodec for GzipCodec {
    fn extension(&self) -> &str {
        "gz"
    }

    fn compress(&self, raw: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(raw)?;
        encoder.finish()
    }

    fn decompress(&self, stored: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(stored);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;
        Ok(raw)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passes_bytes_through() {
        let codec = IdentityCodec;
        let raw = b"texture bytes".to_vec();

        assert_eq!(codec.compress(&raw).unwrap(), raw);
        assert_eq!(codec.decompress(&raw).unwrap(), raw);
        assert_eq!(codec.extension(), "blob");
    }

    #[test]
    fn test_gzip_shrinks_repetitive_payload() {
        let codec = GzipCodec::default();
        let raw = vec![0xABu8; 64 * 1024];

        let stored = codec.compress(&raw).unwrap();
        assert!(stored.len() < raw.len() / 10);
        assert_eq!(codec.decompress(&stored).unwrap(), raw);
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let codec = GzipCodec::with_level(6);
        assert!(codec.decompress(b"definitely not gzip").is_err());
    }
}
