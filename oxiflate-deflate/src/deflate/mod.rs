//! Streaming DEFLATE compression.
//!
//! [`Deflater`] turns input into a zlib stream (RFC 1950) or raw DEFLATE
//! (RFC 1951) one step call at a time. Each call consumes as much input and
//! fills as much output as it can, so the caller may supply buffers of any
//! size, including a single byte.
//!
//! The stream moves through three states:
//!
//! ```text
//! Init --first step--> Busy --Flush::Finish--> Finish
//! ```
//!
//! The zlib header is written on the first step call, and the Adler-32
//! trailer once all blocks have been emitted under [`Flush::Finish`].
//!
//! Levels pick one of three block functions:
//!
//! - level 0: stored blocks only
//! - levels 1-3: greedy matching
//! - levels 4-9: lazy matching

mod blocks;
pub(crate) mod window;

use oxiflate_core::adler32::Adler32;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressionLevel, Compressor, Flush, Status, Strategy};

use crate::bits::PendingBuf;
use crate::buffers::StreamBuffers;
use crate::config::{BlockFunc, CONFIGURATION_TABLE, DeflateConfig};
use crate::trees::Trees;
use crate::zlib::zlib_header;
use window::Window;

/// Stream-level state of a [`Deflater`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeflateState {
    /// Header not yet written.
    Init,
    /// Compressing.
    Busy,
    /// [`Flush::Finish`] seen; only draining remains.
    Finish,
}

/// Outcome of one block-function run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Need more input or more output space.
    NeedMore,
    /// A flush was honoured; the block is complete.
    BlockDone,
    /// The final block is emitted but output space ran out.
    FinishStarted,
    /// The final block is emitted and drained.
    FinishDone,
}

/// Streaming DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    state: DeflateState,
    /// Emit the zlib header and trailer.
    wrap: bool,
    trailer_written: bool,
    level: u8,
    strategy: Strategy,
    window: Window,
    trees: Trees,
    pending: PendingBuf,
    /// Size of the staging area; bounds stored blocks.
    pending_buf_size: usize,
    adler: Adler32,
    total_in: u64,
    total_out: u64,
    /// Flush mode of the previous call; `None` forces the next call through.
    last_flush: Option<Flush>,
    msg: Option<String>,
}

impl Deflater {
    /// Create a zlib compressor with the given level (0-9) and default
    /// parameters.
    pub fn new(level: impl Into<CompressionLevel>) -> Self {
        let config = DeflateConfig::new(level);
        Self::build(&config)
    }

    /// Create a compressor from a full configuration.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(&config))
    }

    fn build(config: &DeflateConfig) -> Self {
        let level = config.level.level();
        let lit_bufsize = 1usize << (config.mem_level + 6);
        let pending_buf_size = lit_bufsize * 4;

        tracing::debug!(
            level,
            window_bits = config.window_bits,
            mem_level = config.mem_level,
            strategy = ?config.strategy,
            "deflate init"
        );

        let wrap = !config.is_raw();
        Self {
            state: if wrap {
                DeflateState::Init
            } else {
                DeflateState::Busy
            },
            wrap,
            trailer_written: false,
            level,
            strategy: config.strategy,
            window: Window::new(
                config.wbits(),
                config.mem_level,
                &CONFIGURATION_TABLE[level as usize],
            ),
            trees: Trees::new(lit_bufsize),
            pending: PendingBuf::with_capacity(pending_buf_size),
            pending_buf_size,
            adler: Adler32::new(),
            total_in: 0,
            total_out: 0,
            last_flush: None,
            msg: None,
        }
    }

    /// Reset to the start of a new stream, keeping level, strategy and
    /// window size.
    pub fn reset(&mut self) {
        self.state = if self.wrap {
            DeflateState::Init
        } else {
            DeflateState::Busy
        };
        self.trailer_written = false;
        self.window.reset();
        self.trees.reset();
        self.pending.reset();
        self.adler = Adler32::new();
        self.total_in = 0;
        self.total_out = 0;
        self.last_flush = None;
        self.msg = None;
    }

    /// Total input consumed since creation or the last reset.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Total output produced since creation or the last reset.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the input consumed so far (of the dictionary right after
    /// [`Self::set_dictionary`]).
    pub fn adler(&self) -> u32 {
        self.adler.finish()
    }

    /// Message of the last error, if any.
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Current compression level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Whether this stream carries the zlib wrapper.
    pub fn is_raw(&self) -> bool {
        !self.wrap
    }

    /// Load a preset dictionary.
    ///
    /// Allowed only before the first step call. A zlib stream records the
    /// dictionary's Adler-32 in its header; the decompressor must supply
    /// the same bytes. Only the last `w_size - 262` bytes can be referenced.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let fresh = match self.state {
            DeflateState::Init => true,
            DeflateState::Busy => !self.wrap && self.total_in == 0 && self.window.strstart == 0,
            DeflateState::Finish => false,
        };
        if !fresh {
            return Err(self.fail(OxiflateError::stream(
                "dictionary must be set before compressing",
            )));
        }

        self.adler = Adler32::new();
        self.adler.update(dictionary);

        let max_dist = self.window.max_dist();
        let dictionary = if dictionary.len() > max_dist {
            &dictionary[dictionary.len() - max_dist..]
        } else {
            dictionary
        };
        tracing::debug!(
            length = dictionary.len(),
            adler = self.adler.finish(),
            "deflate dictionary"
        );
        self.window.load_dictionary(dictionary);
        Ok(())
    }

    /// Change level and strategy mid-stream.
    ///
    /// When the new level uses a different block function and input has
    /// already been consumed, the pending input is first compressed with
    /// the old parameters and a partial flush is written to `output`.
    ///
    /// Returns the bytes written to `output` and whether the new parameters
    /// took effect. If `output` fills before every consumed byte has been
    /// closed into a block, the parameters stay unchanged and the call must
    /// be repeated with more output space. [`OxiflateError::Buffer`] means
    /// nothing could be written and nothing changed.
    pub fn set_params(
        &mut self,
        level: impl Into<CompressionLevel>,
        strategy: Strategy,
        output: &mut [u8],
    ) -> Result<(usize, bool)> {
        let level = level.into().level();
        let old_func = CONFIGURATION_TABLE[self.level as usize].func;
        let new_func = CONFIGURATION_TABLE[level as usize].func;

        let mut produced = 0;
        if old_func != new_func && self.total_in != 0 {
            match self.compress(&[], output, Flush::Partial) {
                Ok((_, n, _)) => produced = n,
                Err(OxiflateError::Buffer) => {}
                Err(e) => return Err(e),
            }
            if !self.window_flushed() {
                tracing::debug!(produced, "deflate params deferred, output full");
                if produced == 0 {
                    return Err(self.fail(OxiflateError::Buffer));
                }
                return Ok((produced, false));
            }
        }

        if self.level != level {
            self.level = level;
            self.window.set_params(&CONFIGURATION_TABLE[level as usize]);
        }
        self.strategy = strategy;
        tracing::debug!(level, ?strategy, produced, "deflate params changed");
        Ok((produced, true))
    }

    /// Whether every byte taken into the window has been closed into a block.
    fn window_flushed(&self) -> bool {
        let w = &self.window;
        w.lookahead == 0 && w.strstart as isize == w.block_start
    }

    /// Release the compressor.
    ///
    /// Fails with a data error if the stream was started but never
    /// finished; the compressor is released either way.
    pub fn end(self) -> Result<()> {
        tracing::debug!(
            total_in = self.total_in,
            total_out = self.total_out,
            "deflate end"
        );
        if self.state == DeflateState::Busy {
            return Err(OxiflateError::data("stream freed prematurely"));
        }
        Ok(())
    }

    /// Run one step: consume input and produce output until one of them is
    /// exhausted or the requested flush is complete.
    ///
    /// Returns bytes consumed, bytes produced and [`Status::StreamEnd`] once
    /// the trailer has been fully delivered under [`Flush::Finish`].
    /// [`OxiflateError::Buffer`] means no progress was possible.
    pub fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(usize, usize, Status)> {
        if self.state == DeflateState::Finish && flush != Flush::Finish {
            return Err(self.fail(OxiflateError::stream(
                "stream is finishing; only Flush::Finish is allowed",
            )));
        }
        if output.is_empty() {
            return Err(self.fail(OxiflateError::Buffer));
        }

        let mut strm = StreamBuffers::new(input, output);
        let result = self.step(&mut strm, flush);
        let (consumed, produced) = (strm.consumed(), strm.produced());
        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        match result {
            Ok(status) => Ok((consumed, produced, status)),
            // Some progress was made before the stall was detected.
            Err(OxiflateError::Buffer) if consumed != 0 || produced != 0 => {
                Ok((consumed, produced, Status::Ok))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, err: OxiflateError) -> OxiflateError {
        self.msg = Some(err.to_string());
        err
    }

    fn step(&mut self, strm: &mut StreamBuffers<'_>, flush: Flush) -> Result<Status> {
        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        if self.state == DeflateState::Init {
            self.write_header();
            self.state = DeflateState::Busy;
        }

        if self.pending.pending() != 0 {
            self.flush_pending(strm);
            if strm.avail_out() == 0 {
                // Pending output remains; make sure the next call with the
                // same flush mode is not rejected as a no-op.
                self.last_flush = None;
                return Ok(Status::Ok);
            }
        } else if strm.avail_in() == 0 && Some(flush) <= old_flush && flush != Flush::Finish {
            return Err(OxiflateError::Buffer);
        }

        if self.state == DeflateState::Finish && strm.avail_in() != 0 {
            return Err(OxiflateError::Buffer);
        }

        if strm.avail_in() != 0
            || self.window.lookahead != 0
            || (flush != Flush::None && self.state != DeflateState::Finish)
        {
            let bstate = match CONFIGURATION_TABLE[self.level as usize].func {
                BlockFunc::Stored => self.deflate_stored(strm, flush),
                BlockFunc::Fast => self.deflate_fast(strm, flush),
                BlockFunc::Slow => self.deflate_slow(strm, flush),
            };

            if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
                self.state = DeflateState::Finish;
            }
            match bstate {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if strm.avail_out() == 0 {
                        self.last_flush = None;
                    }
                    return Ok(Status::Ok);
                }
                BlockState::BlockDone => {
                    if flush == Flush::Partial {
                        self.trees.align(&mut self.pending);
                    } else {
                        // Sync and full flushes end on a byte boundary with
                        // an empty stored block.
                        self.trees.stored_block(&mut self.pending, &[], false);
                        if flush == Flush::Full {
                            self.window.clear_hash();
                        }
                    }
                    self.flush_pending(strm);
                    if strm.avail_out() == 0 {
                        self.last_flush = None;
                        return Ok(Status::Ok);
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        if flush != Flush::Finish {
            return Ok(Status::Ok);
        }
        if !self.wrap || self.trailer_written {
            return Ok(Status::StreamEnd);
        }

        let adler = self.adler.finish();
        self.pending.put_short_msb((adler >> 16) as u16);
        self.pending.put_short_msb(adler as u16);
        self.flush_pending(strm);
        self.trailer_written = true;
        tracing::debug!(
            total_in = self.total_in + strm.consumed() as u64,
            adler,
            "deflate trailer written"
        );

        Ok(if self.pending.pending() != 0 {
            Status::Ok
        } else {
            Status::StreamEnd
        })
    }

    fn write_header(&mut self) {
        let has_dict = self.window.strstart != 0;
        let header = zlib_header(self.window.w_bits, self.level, self.strategy, has_dict);
        self.pending.put_short_msb(header);
        if has_dict {
            let dict_id = self.adler.finish();
            self.pending.put_short_msb((dict_id >> 16) as u16);
            self.pending.put_short_msb(dict_id as u16);
        }
        self.adler = Adler32::new();
    }

    fn flush_pending(&mut self, strm: &mut StreamBuffers<'_>) {
        let n = self.pending.flush_to(strm.output_mut());
        strm.advance_out(n);
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(usize, usize, Status)> {
        Deflater::compress(self, input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.state == DeflateState::Finish
            && self.pending.pending() == 0
            && (self.trailer_written || !self.wrap)
    }
}

/// Compress data to raw DEFLATE (no zlib wrapper).
pub fn deflate(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_config(DeflateConfig::new(level).raw())?;
    deflater.compress_all(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    #[test]
    fn test_deflate_stored() {
        let input = b"Hello, World!";
        let compressed = deflate(input, 0).unwrap();

        // One final stored block: header byte, LEN, NLEN, data.
        assert_eq!(compressed.len(), 1 + 4 + input.len());
        assert_eq!(compressed[0], 0x01);
        assert_eq!(&compressed[5..], input);

        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_deflate_compressed() {
        let input = b"AAAAAAAAAABBBBBBBBBBCCCCCCCCCC";
        let compressed = deflate(input, 6).unwrap();

        assert!(
            compressed.len() < input.len(),
            "compressed {} >= input {}",
            compressed.len(),
            input.len()
        );
        assert_eq!(inflate(&compressed).unwrap(), input);
    }

    #[test]
    fn test_deflate_empty() {
        // Empty input at level 6 is one fixed block holding only EOB.
        let compressed = deflate(&[], 6).unwrap();
        assert_eq!(compressed, vec![0x03, 0x00]);
        assert!(inflate(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_zlib_empty_stream() {
        let mut deflater = Deflater::new(6);
        let compressed = deflater.compress_all(&[]).unwrap();
        assert_eq!(
            compressed,
            vec![0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]
        );
        assert!(deflater.is_finished());
        assert_eq!(deflater.total_in(), 0);
        assert_eq!(deflater.total_out(), 8);
    }

    #[test]
    fn test_deflate_roundtrip_all_levels() {
        let input: Vec<u8> = b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .cycle()
            .take(10_000)
            .copied()
            .collect();

        for level in 0..=9 {
            let compressed = deflate(&input, level).unwrap();
            let decompressed = inflate(&compressed).unwrap();
            assert_eq!(decompressed, input, "level {}", level);
            if level > 0 {
                assert!(compressed.len() < input.len() / 10, "level {}", level);
            }
        }
    }

    #[test]
    fn test_deflate_strategies() {
        let input: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8 ^ (i / 97) as u8).collect();

        for strategy in [Strategy::Default, Strategy::Filtered, Strategy::HuffmanOnly] {
            let config = DeflateConfig::new(6).with_strategy(strategy).raw();
            let mut deflater = Deflater::with_config(config).unwrap();
            let compressed = deflater.compress_all(&input).unwrap();
            assert_eq!(inflate(&compressed).unwrap(), input, "{:?}", strategy);
        }
    }

    #[test]
    fn test_single_byte_output_buffer() {
        let input = b"hello hello hello hello hello hello";
        let mut deflater = Deflater::new(9);
        let mut compressed = Vec::new();
        let mut pos = 0;
        let mut byte = [0u8; 1];

        loop {
            let (consumed, produced, status) = deflater
                .compress(&input[pos..], &mut byte, Flush::Finish)
                .unwrap();
            pos += consumed;
            compressed.extend_from_slice(&byte[..produced]);
            if status == Status::StreamEnd {
                break;
            }
        }

        assert_eq!(pos, input.len());
        assert_eq!(compressed, Deflater::new(9).compress_all(input).unwrap());
    }

    #[test]
    fn test_empty_output_is_buffer_error() {
        let mut deflater = Deflater::new(6);
        let err = deflater.compress(b"data", &mut [], Flush::None).unwrap_err();
        assert_eq!(err, OxiflateError::Buffer);
    }

    #[test]
    fn test_repeated_flush_without_input_is_buffer_error() {
        let mut deflater = Deflater::new(6);
        let mut out = [0u8; 64];
        deflater.compress(b"abc", &mut out, Flush::Sync).unwrap();
        let err = deflater.compress(&[], &mut out, Flush::Sync).unwrap_err();
        assert_eq!(err, OxiflateError::Buffer);
        // A stronger flush is still accepted.
        assert!(deflater.compress(&[], &mut out, Flush::Full).is_ok());
    }

    #[test]
    fn test_non_finish_after_finish_is_stream_error() {
        let mut deflater = Deflater::new(6);
        let mut out = [0u8; 64];
        let (_, _, status) = deflater.compress(b"abc", &mut out, Flush::Finish).unwrap();
        assert_eq!(status, Status::StreamEnd);

        let err = deflater.compress(&[], &mut out, Flush::None).unwrap_err();
        assert!(matches!(err, OxiflateError::Stream { .. }));
        assert!(deflater.message().is_some());

        // Finishing again is harmless.
        let (_, produced, status) = deflater.compress(&[], &mut out, Flush::Finish).unwrap();
        assert_eq!((produced, status), (0, Status::StreamEnd));
    }

    #[test]
    fn test_end_before_finish() {
        let mut deflater = Deflater::new(6);
        let mut out = [0u8; 64];
        deflater.compress(b"abc", &mut out, Flush::None).unwrap();
        assert!(deflater.end().unwrap_err().is_data_error());

        assert!(Deflater::new(6).end().is_ok());
    }

    #[test]
    fn test_sync_flush_ends_with_empty_stored_block() {
        let mut deflater = Deflater::with_config(DeflateConfig::new(6).raw()).unwrap();
        let mut out = [0u8; 256];
        let (consumed, produced, _) = deflater
            .compress(b"hello world", &mut out, Flush::Sync)
            .unwrap();
        assert_eq!(consumed, 11);
        assert_eq!(&out[produced - 4..produced], &[0x00, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_reset_reproduces_stream() {
        let input = b"reset me, reset me, reset me";
        let mut deflater = Deflater::new(6);
        let first = deflater.compress_all(input).unwrap();
        deflater.reset();
        assert_eq!(deflater.total_in(), 0);
        let second = deflater.compress_all(input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_dictionary_after_start_fails() {
        let mut deflater = Deflater::new(6);
        let mut out = [0u8; 64];
        deflater.compress(b"abc", &mut out, Flush::None).unwrap();
        assert!(deflater.set_dictionary(b"dict").is_err());
    }

    #[test]
    fn test_set_dictionary_sets_fdict() {
        let mut deflater = Deflater::new(6);
        deflater.set_dictionary(b"hello world").unwrap();
        assert_eq!(deflater.adler(), Adler32::checksum(b"hello world"));

        let compressed = deflater.compress_all(b"hello world").unwrap();
        assert_eq!(compressed[1] & 0x20, 0x20);
        let dict_id = u32::from_be_bytes([compressed[2], compressed[3], compressed[4], compressed[5]]);
        assert_eq!(dict_id, Adler32::checksum(b"hello world"));
    }

    #[test]
    fn test_set_params_switches_block_function() {
        let input: Vec<u8> = b"abcdefghij".iter().cycle().take(4096).copied().collect();
        let mut deflater = Deflater::with_config(DeflateConfig::new(0).raw()).unwrap();
        let mut compressed = Vec::new();
        let mut out = vec![0u8; 8192];

        let (consumed, produced, _) = deflater.compress(&input[..2048], &mut out, Flush::None).unwrap();
        assert_eq!(consumed, 2048);
        compressed.extend_from_slice(&out[..produced]);

        let (produced, applied) = deflater.set_params(9, Strategy::Default, &mut out).unwrap();
        assert!(applied);
        compressed.extend_from_slice(&out[..produced]);
        assert_eq!(deflater.level(), 9);

        let (_, produced, status) = deflater.compress(&input[2048..], &mut out, Flush::Finish).unwrap();
        assert_eq!(status, Status::StreamEnd);
        compressed.extend_from_slice(&out[..produced]);

        assert_eq!(inflate(&compressed).unwrap(), input);
    }
}
