//! Core traits for streaming compression and decompression.
//!
//! Both directions are push/pull step functions: the caller lends an input
//! slice and an output slice, the codec consumes and produces as much as it
//! can, and reports how many bytes moved plus a [`Status`].

use crate::error::{OxiflateError, Result};

/// Successful outcome of a step call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; call again with more input or output space.
    Ok,
    /// The stream is complete.
    StreamEnd,
    /// The stream requires a preset dictionary with the given Adler-32.
    NeedDictionary(u32),
}

/// Flush mode for a step call.
///
/// Variants are ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Flush {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Partial flush - emit pending bits with an empty static block.
    Partial,
    /// Sync flush - emit all pending output and align on a byte boundary.
    Sync,
    /// Full flush - as sync, and reset the match history.
    Full,
    /// Finish - complete the stream.
    Finish,
}

/// Match-search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Normal LZ77 + Huffman.
    #[default]
    Default,
    /// Favor Huffman coding over short matches (data produced by a filter).
    Filtered,
    /// Huffman coding only, no string matching.
    HuffmanOnly,
}

/// Compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (store only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// Default compression (balanced).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (slowest).
    pub const BEST: Self = Self(9);

    /// Create a custom compression level (0-9).
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u8> for CompressionLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status).
    /// [`OxiflateError::Buffer`] means no progress was possible.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(usize, usize, Status)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has reached the end of the stream.
    fn is_finished(&self) -> bool;

    /// Decompress a complete stream at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let step = self.decompress(&input[input_pos..], &mut buffer, Flush::None);
            let (consumed, produced, status) = match step {
                Ok(step) => step,
                Err(OxiflateError::Buffer) => {
                    return Err(OxiflateError::data("unexpected end of compressed stream"));
                }
                Err(e) => return Err(e),
            };

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                Status::StreamEnd => break,
                Status::NeedDictionary(id) => {
                    return Err(OxiflateError::stream(format!(
                        "preset dictionary {:#010x} required",
                        id
                    )));
                }
                Status::Ok => continue,
            }
        }

        Ok(output)
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// # Returns
    ///
    /// A tuple of (bytes consumed from input, bytes written to output, status).
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(usize, usize, Status)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has written the end of the stream.
    fn is_finished(&self) -> bool;

    /// Compress all data and finish the stream (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, Flush::Finish)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == Status::StreamEnd {
                break;
            }
        }

        Ok(output)
    }
}
