//! Zlib format wrapper (RFC 1950) and one-shot helpers.
//!
//! ```text
//! +---+---+=====================+============+---+---+---+---+
//! |CMF|FLG| [DICTID, 4 bytes]   | compressed |    ADLER32    |
//! +---+---+=====================+============+---+---+---+---+
//! ```
//!
//! - CMF: bits 0-3 method (8 = deflate), bits 4-7 window size minus 8
//! - FLG: bits 0-4 check so `(CMF * 256 + FLG) % 31 == 0`, bit 5 preset
//!   dictionary, bits 6-7 compression level class
//! - DICTID: Adler-32 of the preset dictionary, big-endian
//! - ADLER32: Adler-32 of the uncompressed data, big-endian

use oxiflate_core::adler32::Adler32;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{Compressor, Decompressor, Flush, Status, Strategy};

use crate::config::DeflateConfig;
use crate::deflate::Deflater;
use crate::inflate::Inflater;

/// Compression level class recorded in the FLG byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ZlibLevel {
    /// Fastest compression.
    Fastest = 0,
    /// Fast compression.
    Fast = 1,
    /// Default compression.
    Default = 2,
    /// Maximum compression.
    Maximum = 3,
}

impl ZlibLevel {
    /// Class for a compression level (0-9).
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Self::Fastest,
            2..=5 => Self::Fast,
            6 => Self::Default,
            _ => Self::Maximum,
        }
    }

    /// Lowercase name, as shown by tools.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fastest => "fastest",
            Self::Fast => "fast",
            Self::Default => "default",
            Self::Maximum => "maximum",
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

/// The two header bytes, CMF and FLG, as a big-endian value.
///
/// Huffman-only streams are always marked fastest.
pub(crate) fn zlib_header(w_bits: u8, level: u8, strategy: Strategy, has_dict: bool) -> u16 {
    let cmf = ((w_bits - 8) << 4) | 8;
    let flevel = match strategy {
        Strategy::HuffmanOnly => ZlibLevel::Fastest,
        _ => ZlibLevel::from_level(level),
    } as u8;
    let fdict = has_dict as u8;
    let base = (cmf as u16) << 8 | ((flevel << 6) | (fdict << 5)) as u16;
    let remainder = base % 31;
    let fcheck = if remainder == 0 { 0 } else { 31 - remainder };
    base | fcheck
}

/// Parsed zlib stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZlibHeader {
    /// Window size (log2) the stream was compressed with.
    pub window_bits: u8,
    /// Compression level class.
    pub level: ZlibLevel,
    /// Adler-32 of the preset dictionary, if one is required.
    pub dictionary_id: Option<u32>,
}

impl ZlibHeader {
    /// Parse the header at the start of `input`.
    pub fn parse(input: &[u8]) -> Result<Self> {
        let [cmf, flg, ..] = *input else {
            return Err(OxiflateError::data("zlib header truncated"));
        };
        if cmf & 0x0f != 8 {
            return Err(OxiflateError::data("unknown compression method"));
        }
        let window_bits = (cmf >> 4) + 8;
        if window_bits > 15 {
            return Err(OxiflateError::data("invalid window size"));
        }
        if (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
            return Err(OxiflateError::data("incorrect header check"));
        }

        let dictionary_id = if flg & 0x20 != 0 {
            let Some(id) = input.get(2..6) else {
                return Err(OxiflateError::data("zlib header truncated"));
            };
            Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
        } else {
            None
        };

        Ok(Self {
            window_bits,
            level: ZlibLevel::from_bits(flg >> 6),
            dictionary_id,
        })
    }

    /// Header length in bytes, dictionary id included.
    pub fn len(&self) -> usize {
        if self.dictionary_id.is_some() { 6 } else { 2 }
    }

    /// Always false; a header is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Compress data into a zlib stream.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress, zlib_decompress};
///
/// let data = b"Hello, World! Hello, World!";
/// let compressed = zlib_compress(data, 6).unwrap();
/// assert_eq!(&compressed[..2], &[0x78, 0x9C]);
/// let decompressed = zlib_decompress(&compressed).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    let config = DeflateConfig::new(level.min(9));
    Deflater::with_config(config)?.compress_all(input)
}

/// Compress data into a zlib stream using a preset dictionary.
///
/// The dictionary's Adler-32 is recorded in the header; the same bytes
/// must be supplied to decompress.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_decompress_with_dict};
///
/// let dict = b"common patterns and shared content";
/// let data = b"This text has common patterns that match the dictionary";
/// let compressed = zlib_compress_with_dict(data, 6, dict).unwrap();
/// let decompressed = zlib_decompress_with_dict(&compressed, dict).unwrap();
/// assert_eq!(decompressed, data);
/// ```
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let config = DeflateConfig::new(level.min(9));
    let mut deflater = Deflater::with_config(config)?;
    deflater.set_dictionary(dictionary)?;
    deflater.compress_all(input)
}

/// Decompress a complete zlib stream.
///
/// Fails with a stream error if the stream needs a preset dictionary; use
/// [`zlib_decompress_with_dict`] for those.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    Inflater::new().decompress_all(input)
}

/// Decompress a complete zlib stream, supplying `dictionary` when the
/// header asks for one.
///
/// A dictionary whose Adler-32 differs from the header's id fails with
/// [`OxiflateError::ChecksumMismatch`]. Streams without a dictionary id
/// decode normally and ignore `dictionary`.
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::new();
    let mut output = Vec::new();
    let mut buffer = vec![0u8; 32 * 1024];
    let mut pos = 0;

    loop {
        let (consumed, produced, status) =
            match inflater.decompress(&input[pos..], &mut buffer, Flush::None) {
                Ok(step) => step,
                Err(OxiflateError::Buffer) => {
                    return Err(OxiflateError::data("unexpected end of compressed stream"));
                }
                Err(e) => return Err(e),
            };
        pos += consumed;
        output.extend_from_slice(&buffer[..produced]);

        match status {
            Status::StreamEnd => return Ok(output),
            Status::NeedDictionary(_) => inflater.set_dictionary(dictionary)?,
            Status::Ok => {}
        }
    }
}

/// Dictionary id required by a zlib stream, if any.
///
/// # Example
///
/// ```
/// use oxiflate_deflate::zlib::{zlib_compress_with_dict, zlib_requires_dictionary};
///
/// let dict = b"test dictionary";
/// let compressed = zlib_compress_with_dict(b"test data", 6, dict).unwrap();
/// assert!(zlib_requires_dictionary(&compressed).is_some());
/// ```
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    ZlibHeader::parse(input).ok()?.dictionary_id
}

/// Adler-32 stored in the trailer of a complete zlib stream.
pub fn zlib_trailer_checksum(input: &[u8]) -> Option<u32> {
    let start = input.len().checked_sub(4)?;
    let tail = &input[start..];
    Some(u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]))
}

/// Adler-32 of `data`, as a zlib trailer would carry it.
pub fn zlib_checksum(data: &[u8]) -> u32 {
    Adler32::checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_bytes() {
        let default = Strategy::Default;
        assert_eq!(zlib_header(15, 6, default, false), 0x789C);
        assert_eq!(zlib_header(15, 1, default, false), 0x7801);
        assert_eq!(zlib_header(15, 2, default, false), 0x785E);
        assert_eq!(zlib_header(15, 5, default, false), 0x785E);
        assert_eq!(zlib_header(15, 9, default, false), 0x78DA);
        assert_eq!(zlib_header(15, 0, default, false), 0x7801);
        assert_eq!(zlib_header(9, 6, default, false), 0x1895);
        assert_eq!(zlib_header(15, 9, Strategy::HuffmanOnly, false), 0x7801);
        assert_eq!(zlib_header(15, 9, Strategy::Filtered, false), 0x78DA);
        for w_bits in 9..=15 {
            for level in 0..=9 {
                for has_dict in [false, true] {
                    assert_eq!(zlib_header(w_bits, level, default, has_dict) % 31, 0);
                }
            }
        }
    }

    #[test]
    fn test_zlib_level_classes() {
        assert_eq!(ZlibLevel::from_level(0), ZlibLevel::Fastest);
        assert_eq!(ZlibLevel::from_level(1), ZlibLevel::Fastest);
        assert_eq!(ZlibLevel::from_level(2), ZlibLevel::Fast);
        assert_eq!(ZlibLevel::from_level(4), ZlibLevel::Fast);
        assert_eq!(ZlibLevel::from_level(6), ZlibLevel::Default);
        assert_eq!(ZlibLevel::from_level(9), ZlibLevel::Maximum);
    }

    #[test]
    fn test_parse_header() {
        let header = ZlibHeader::parse(&[0x78, 0x9C]).unwrap();
        assert_eq!(header.window_bits, 15);
        assert_eq!(header.level, ZlibLevel::Default);
        assert_eq!(header.dictionary_id, None);
        assert_eq!(header.len(), 2);

        assert!(ZlibHeader::parse(&[0x78]).is_err());
        assert!(ZlibHeader::parse(&[0x78, 0x9D]).is_err());
        assert!(ZlibHeader::parse(&[0x77, 0x9C]).is_err());
    }

    #[test]
    fn test_roundtrip() {
        let data = b"Hello, World! Hello, World! Hello, World!";
        for level in 0..=9 {
            let compressed = zlib_compress(data, level).unwrap();
            assert_eq!(zlib_decompress(&compressed).unwrap(), data);
            assert_eq!(
                zlib_trailer_checksum(&compressed),
                Some(zlib_checksum(data))
            );
        }
    }

    #[test]
    fn test_dictionary_roundtrip() {
        let dict = b"The quick brown fox jumps over the lazy dog";
        let data = b"The quick brown fox is quick and brown";
        let compressed = zlib_compress_with_dict(data, 9, dict).unwrap();

        let header = ZlibHeader::parse(&compressed).unwrap();
        assert_eq!(header.dictionary_id, Some(Adler32::checksum(dict)));
        assert_eq!(header.len(), 6);
        assert_eq!(zlib_requires_dictionary(&compressed), header.dictionary_id);

        assert_eq!(zlib_decompress_with_dict(&compressed, dict).unwrap(), data);
        assert!(matches!(
            zlib_decompress(&compressed),
            Err(OxiflateError::Stream { .. })
        ));
        assert!(matches!(
            zlib_decompress_with_dict(&compressed, b"another dictionary"),
            Err(OxiflateError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_dictionary_ignored_without_fdict() {
        let compressed = zlib_compress(b"plain", 6).unwrap();
        assert_eq!(zlib_requires_dictionary(&compressed), None);
        assert_eq!(
            zlib_decompress_with_dict(&compressed, b"unused").unwrap(),
            b"plain"
        );
    }

    #[test]
    fn test_trailer_checksum_short_input() {
        assert_eq!(zlib_trailer_checksum(&[1, 2, 3]), None);
    }
}
