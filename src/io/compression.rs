//! Pluggable byte-level compression for queue payloads and stored blobs.
//!
//! Every payload the extended queue client sends or stores goes through the
//! same compressed frame, whatever the chosen effort. A reader therefore never
//! needs to know whether a body was worth compressing: it always decompresses.
//!
//! ## Architecture
//!
//! - [`CompressionCodec`] - the pluggable algorithm interface
//! - [`CompressionLevel`] - effort selection, including a stored-only level
//! - [`GzipCodec`] - the built-in codec, via the `flate2` crate
//!
//! ## Usage
//! ```
//! use cloudwrap::io::compression::{CompressionCodec, CompressionLevel, GzipCodec};
//! # fn main() -> std::io::Result<()> {
//! let codec = GzipCodec;
//! let framed = codec.compress(b"abc", CompressionLevel::None)?;
//! assert_eq!(codec.decompress(&framed)?, b"abc");
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Decisions
//!
//! ### Stored-Only Framing
//! [`CompressionLevel::None`] still emits a complete gzip member (header, stored
//! deflate blocks, CRC trailer). Small payloads skip the CPU cost of matching
//! while the decoder keeps a single code path.
//!
//! ### Magic-Byte Validation
//! Input that does not start with the codec's magic bytes is rejected before
//! decoding, so an arbitrary string never decodes to an empty payload.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read, Write};

/// Compression effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Stored blocks only; framing without matching.
    None,
    /// Fastest matching.
    Fast,
    /// The algorithm's default trade-off.
    #[default]
    Default,
    /// Smallest output.
    Best,
    /// Explicit level, clamped to `0..=9`.
    Level(u32),
}

impl CompressionLevel {
    #[must_use]
    pub fn to_flate2(self) -> Compression {
        match self {
            Self::None => Compression::none(),
            Self::Fast => Compression::fast(),
            Self::Default => Compression::default(),
            Self::Best => Compression::best(),
            Self::Level(level) => Compression::new(level.min(9)),
        }
    }
}

/// Pluggable compression codec trait.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; a single codec instance is shared by
/// every concurrent decode of a batch.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip").
    fn name(&self) -> &str;

    /// Suffix appended to stored blob keys, including the leading dot.
    fn extension(&self) -> &str;

    /// Value recorded as the blob's content encoding.
    fn content_encoding(&self) -> &str;

    /// Magic byte signature every compressed frame starts with.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Compress `data` into a single self-describing frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to write or finish the frame
    fn compress(&self, data: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>>;

    /// Decompress a frame produced by [`CompressionCodec::compress`].
    ///
    /// # Errors
    ///
    /// Returns an `InvalidData` error for malformed or truncated input
    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// Whether `data` starts with the codec's magic bytes; codecs without any accept all input.
#[must_use]
pub fn has_magic<C: CompressionCodec + ?Sized>(codec: &C, data: &[u8]) -> bool {
    codec.magic_bytes().is_none_or(|magic| data.starts_with(magic))
}

/// Gzip framing around deflate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipCodec;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extension(&self) -> &str {
        ".json.gz"
    }

    fn content_encoding(&self) -> &str {
        "gzip"
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&GZIP_MAGIC)
    }

    fn compress(&self, data: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
        let buffer = Vec::with_capacity(data.len() / 2 + 32);
        let mut encoder = GzEncoder::new(buffer, level.to_flate2());
        encoder.write_all(data)?;
        encoder.finish()
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        if !has_magic(self, data) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "input is not a gzip frame",
            ));
        }

        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len() * 2);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(out)
    }
}
