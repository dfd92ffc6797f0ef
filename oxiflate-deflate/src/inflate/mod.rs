//! Streaming DEFLATE decompression.
//!
//! [`Inflater`] decodes a zlib stream (RFC 1950) or raw DEFLATE (RFC 1951)
//! one step call at a time. Any input split and any output buffer size,
//! down to a single byte, yields the same result.
//!
//! A zlib stream is decoded in these phases:
//!
//! ```text
//! Method -> Flag -> [DictId -> NeedDict] -> Blocks -> Check -> Done
//! ```
//!
//! Raw streams start directly in `Blocks` and end without a trailer.
//! Data errors are terminal: the decompressor returns the same error on
//! every later call until it is reset or [`Inflater::sync`] finds a flush
//! marker.

mod blocks;
mod codes;
mod window;

use oxiflate_core::adler32::Adler32;
use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{Decompressor, Flush, Status};

use crate::buffers::StreamBuffers;
use crate::config::InflateConfig;
use blocks::InflateBlocks;

/// Compression method "deflate" in the CMF byte.
const Z_DEFLATED: u8 = 8;

/// FLG bit: a preset dictionary id follows the header.
const PRESET_DICT: u8 = 0x20;

/// LEN/NLEN of the empty stored block that ends a sync or full flush.
const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Marker state meaning resynchronization is impossible.
const NO_SYNC: usize = SYNC_MARKER.len() + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// CMF byte.
    Method,
    /// FLG byte.
    Flag,
    /// Dictionary id, `left` bytes to go.
    DictId { left: u8 },
    /// Waiting for [`Inflater::set_dictionary`].
    NeedDict,
    Blocks,
    /// Adler-32 trailer, `left` bytes to go.
    Check { left: u8 },
    Done,
    /// Data error latched, or resynchronization in progress.
    Bad,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater {
    mode: Mode,
    /// Expect the zlib header and trailer.
    wrap: bool,
    w_bits: u8,
    /// CMF byte, kept for the header check.
    method: u8,
    /// Dictionary id or trailer being assembled.
    need: u32,
    /// Checksum of the decoded output, for the trailer check.
    was: u32,
    /// Sync marker bytes matched so far.
    marker: usize,
    blocks: InflateBlocks,
    total_in: u64,
    total_out: u64,
    dict_id: Option<u32>,
    error: Option<OxiflateError>,
    msg: Option<String>,
}

impl Inflater {
    /// Create a zlib decompressor with a 32K window.
    pub fn new() -> Self {
        Self::build(&InflateConfig::default())
    }

    /// Create a decompressor from a configuration.
    pub fn with_config(config: InflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(&config))
    }

    fn build(config: &InflateConfig) -> Self {
        tracing::debug!(
            window_bits = config.window_bits,
            raw = config.raw,
            "inflate init"
        );
        let wrap = !config.raw;
        Self {
            mode: if wrap { Mode::Method } else { Mode::Blocks },
            wrap,
            w_bits: config.window_bits,
            method: 0,
            need: 0,
            was: 0,
            marker: 0,
            blocks: InflateBlocks::new(config.window_bits, wrap),
            total_in: 0,
            total_out: 0,
            dict_id: None,
            error: None,
            msg: None,
        }
    }

    /// Reset to the start of a new stream, keeping the configuration.
    pub fn reset(&mut self) {
        self.mode = if self.wrap { Mode::Method } else { Mode::Blocks };
        self.method = 0;
        self.need = 0;
        self.was = 0;
        self.marker = 0;
        self.blocks.reset();
        self.total_in = 0;
        self.total_out = 0;
        self.dict_id = None;
        self.error = None;
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

    /// Adler-32 of the output delivered so far, or the requested
    /// dictionary id while one is awaited.
    pub fn adler(&self) -> u32 {
        match self.mode {
            Mode::NeedDict => self.need,
            _ => self.blocks.io.checksum(),
        }
    }

    /// Message of the last error, if any.
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Dictionary id announced by the stream header, if any.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dict_id
    }

    /// Whether this decompressor expects raw DEFLATE.
    pub fn is_raw(&self) -> bool {
        !self.wrap
    }

    /// Whether the end of the stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }

    /// Supply the preset dictionary.
    ///
    /// For a zlib stream this is only valid right after a step call returned
    /// [`Status::NeedDictionary`]; the dictionary's Adler-32 must match the
    /// id in the header, otherwise [`OxiflateError::ChecksumMismatch`] is
    /// returned and a different dictionary may be tried. A raw decompressor
    /// accepts a dictionary before any input.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        match self.mode {
            Mode::NeedDict => {
                let computed = Adler32::checksum(dictionary);
                if computed != self.need {
                    return Err(self.fail(OxiflateError::checksum_mismatch(self.need, computed)));
                }
            }
            Mode::Blocks if !self.wrap && self.total_in == 0 => {}
            _ => {
                return Err(self.fail(OxiflateError::stream(
                    "no dictionary expected at this point",
                )));
            }
        }

        self.blocks.io.set_dictionary(dictionary);
        self.mode = Mode::Blocks;
        tracing::debug!(length = dictionary.len(), "inflate dictionary set");
        Ok(())
    }

    /// Run one step: consume input and produce output until one of them is
    /// exhausted, the stream ends, or a dictionary is needed.
    ///
    /// `flush` is accepted for symmetry with [`crate::Deflater::compress`];
    /// decompression always makes as much progress as the buffers allow.
    /// [`OxiflateError::Buffer`] means nothing was consumed or produced.
    pub fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        _flush: Flush,
    ) -> Result<(usize, usize, Status)> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut strm = StreamBuffers::new(input, output);
        let result = self.step(&mut strm);
        let (consumed, produced) = (strm.consumed(), strm.produced());
        self.total_in += consumed as u64;
        self.total_out += produced as u64;

        match result {
            Ok(Status::Ok) if consumed == 0 && produced == 0 => Err(OxiflateError::Buffer),
            Ok(status) => Ok((consumed, produced, status)),
            Err(err) => {
                if err.is_data_error() {
                    tracing::warn!(error = %err, total_in = self.total_in, "inflate data error");
                    self.marker = match err {
                        OxiflateError::ChecksumMismatch { .. } => NO_SYNC,
                        _ => 0,
                    };
                    self.mode = Mode::Bad;
                    self.error = Some(err.clone());
                }
                Err(self.fail(err))
            }
        }
    }

    fn fail(&mut self, err: OxiflateError) -> OxiflateError {
        self.msg = Some(err.to_string());
        err
    }

    fn step(&mut self, strm: &mut StreamBuffers<'_>) -> Result<Status> {
        loop {
            match self.mode {
                Mode::Method => {
                    let Some(cmf) = strm.next_byte() else {
                        return Ok(Status::Ok);
                    };
                    self.method = cmf;
                    if cmf & 0x0f != Z_DEFLATED {
                        return Err(OxiflateError::data("unknown compression method"));
                    }
                    if (cmf >> 4) + 8 > self.w_bits {
                        return Err(OxiflateError::data("invalid window size"));
                    }
                    self.mode = Mode::Flag;
                }
                Mode::Flag => {
                    let Some(flg) = strm.next_byte() else {
                        return Ok(Status::Ok);
                    };
                    if (u16::from(self.method) << 8 | u16::from(flg)) % 31 != 0 {
                        return Err(OxiflateError::data("incorrect header check"));
                    }
                    tracing::debug!(
                        window_bits = (self.method >> 4) + 8,
                        level = flg >> 6,
                        dictionary = flg & PRESET_DICT != 0,
                        "zlib header"
                    );
                    if flg & PRESET_DICT == 0 {
                        self.mode = Mode::Blocks;
                    } else {
                        self.need = 0;
                        self.mode = Mode::DictId { left: 4 };
                    }
                }
                Mode::DictId { left } => {
                    let Some(byte) = strm.next_byte() else {
                        return Ok(Status::Ok);
                    };
                    self.need = self.need << 8 | u32::from(byte);
                    if left > 1 {
                        self.mode = Mode::DictId { left: left - 1 };
                    } else {
                        self.dict_id = Some(self.need);
                        self.mode = Mode::NeedDict;
                        tracing::debug!(dict_id = self.need, "preset dictionary required");
                        return Ok(Status::NeedDictionary(self.need));
                    }
                }
                Mode::NeedDict => return Err(OxiflateError::stream("need dictionary")),
                Mode::Blocks => {
                    if !self.blocks.run(strm)? {
                        return Ok(Status::Ok);
                    }
                    self.was = self.blocks.io.checksum();
                    self.blocks.restart();
                    if self.wrap {
                        self.need = 0;
                        self.mode = Mode::Check { left: 4 };
                    } else {
                        self.blocks.io.unread_whole_bytes(strm);
                        self.mode = Mode::Done;
                    }
                }
                Mode::Check { left } => {
                    let Some(byte) = self.blocks.io.take_byte(strm) else {
                        return Ok(Status::Ok);
                    };
                    self.need = self.need << 8 | u32::from(byte);
                    if left > 1 {
                        self.mode = Mode::Check { left: left - 1 };
                        continue;
                    }
                    if self.need != self.was {
                        return Err(OxiflateError::checksum_mismatch(self.need, self.was));
                    }
                    tracing::debug!(adler = self.was, "inflate trailer verified");
                    self.mode = Mode::Done;
                }
                Mode::Done => return Ok(Status::StreamEnd),
                Mode::Bad => {
                    return Err(OxiflateError::stream(
                        "resynchronizing; call sync until a marker is found",
                    ));
                }
            }
        }
    }

    /// Skip input up to and including the next flush marker, then restart
    /// decoding at the block that follows with an empty window.
    ///
    /// Returns the bytes consumed and whether a marker was found. Partial
    /// marker matches carry over to the next call. Totals are preserved; the
    /// trailer of a zlib stream will usually no longer match.
    pub fn sync(&mut self, input: &[u8]) -> Result<(usize, bool)> {
        if self.mode != Mode::Bad {
            self.mode = Mode::Bad;
            self.marker = 0;
        }
        if self.marker == NO_SYNC {
            return Err(self
                .error
                .clone()
                .unwrap_or_else(|| OxiflateError::data("cannot resynchronize")));
        }
        if input.is_empty() {
            return Err(OxiflateError::Buffer);
        }

        let mut matched = self.marker;
        let mut consumed = 0;
        for &byte in input {
            if matched == SYNC_MARKER.len() {
                break;
            }
            if byte == SYNC_MARKER[matched] {
                matched += 1;
            } else if byte != 0 {
                matched = 0;
            } else {
                // A zero keeps the last one or two zeros as a prefix.
                matched = SYNC_MARKER.len() - matched;
            }
            consumed += 1;
        }
        self.total_in += consumed as u64;
        self.marker = matched;

        if matched != SYNC_MARKER.len() {
            return Ok((consumed, false));
        }

        let (total_in, total_out) = (self.total_in, self.total_out);
        self.reset();
        self.total_in = total_in;
        self.total_out = total_out;
        self.mode = Mode::Blocks;
        tracing::debug!(total_in, total_out, "inflate resynchronized");
        Ok((consumed, true))
    }

    /// Whether decoding stopped exactly at a flush marker, where
    /// [`Self::sync`] would resume.
    pub fn sync_point(&self) -> bool {
        self.mode == Mode::Blocks && self.blocks.sync_point()
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(usize, usize, Status)> {
        Inflater::decompress(self, input, output, flush)
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        Inflater::is_finished(self)
    }
}

/// Decompress a complete raw DEFLATE stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Inflater::with_config(InflateConfig::raw())?;
    inflater.decompress_all(data)
}
