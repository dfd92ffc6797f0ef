//! Block headers: stored blocks, fixed and dynamic Huffman blocks.

use std::borrow::Cow;

use oxiflate_core::error::{OxiflateError, Result};

use super::codes::{Codes, decode};
use super::window::InflateIo;
use crate::buffers::StreamBuffers;
use crate::inftree::{HuffmanTable, build_bit_length_table, build_dynamic_tables, fixed_tables};
use crate::tables::{BL_CODES, BL_ORDER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Block header.
    Type,
    /// Stored block LEN/NLEN.
    Lens,
    Stored,
    /// HLIT/HDIST/HCLEN.
    Table,
    /// Code-length code lengths.
    BitTree,
    /// Literal/length and distance code lengths.
    DistTree,
    Codes,
    /// Last block done; draining the window.
    Dry,
    Done,
    Bad,
}

#[derive(Debug)]
pub(super) struct InflateBlocks {
    mode: Mode,
    last: bool,
    /// Bytes left in the current stored block.
    left: usize,
    nlen: usize,
    ndist: usize,
    ncode: usize,
    index: usize,
    bl_lengths: [u8; BL_CODES],
    bl_table: HuffmanTable,
    lengths: Vec<u8>,
    codes: Option<Codes>,
    /// Header of an empty stored block just ended.
    after_empty_stored: bool,
    pub(super) io: InflateIo,
}

impl InflateBlocks {
    pub(super) fn new(w_bits: u8, wrap: bool) -> Self {
        Self {
            mode: Mode::Type,
            last: false,
            left: 0,
            nlen: 0,
            ndist: 0,
            ncode: 0,
            index: 0,
            bl_lengths: [0; BL_CODES],
            bl_table: HuffmanTable::default(),
            lengths: Vec::with_capacity(288 + 32),
            codes: None,
            after_empty_stored: false,
            io: InflateIo::new(w_bits, wrap),
        }
    }

    /// Start over at a block header, dropping history and buffered bits.
    /// Returns the checksum of the output delivered so far.
    pub(super) fn reset(&mut self) -> u32 {
        self.restart();
        self.io.reset()
    }

    /// Start over at a block header but keep buffered input bits, so a
    /// trailer can be read from them.
    pub(super) fn restart(&mut self) {
        self.mode = Mode::Type;
        self.last = false;
        self.codes = None;
        self.after_empty_stored = false;
    }

    /// At a byte-aligned position where a flush marker could restart
    /// decoding.
    pub(super) fn sync_point(&self) -> bool {
        self.mode == Mode::Lens || (self.mode == Mode::Type && self.after_empty_stored)
    }

    /// Run until the last block is fully delivered (`Ok(true)`) or input or
    /// output space runs out (`Ok(false)`).
    pub(super) fn run(&mut self, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        match self.step(strm) {
            Err(err) => {
                self.mode = Mode::Bad;
                Err(err)
            }
            ok => ok,
        }
    }

    fn step(&mut self, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        loop {
            match self.mode {
                Mode::Type => {
                    if !self.io.need_bits(strm, 3) {
                        return self.leave(strm);
                    }
                    let header = self.io.bits(3);
                    self.io.dump(3);
                    self.after_empty_stored = false;
                    self.last = header & 1 != 0;
                    match header >> 1 {
                        0 => {
                            tracing::trace!(last = self.last, "stored block");
                            self.io.align();
                            self.mode = Mode::Lens;
                        }
                        1 => {
                            tracing::trace!(last = self.last, "fixed block");
                            let (lit, dist) = fixed_tables();
                            self.codes = Some(Codes::new(Cow::Borrowed(lit), Cow::Borrowed(dist)));
                            self.mode = Mode::Codes;
                        }
                        2 => self.mode = Mode::Table,
                        _ => return Err(OxiflateError::data("invalid block type")),
                    }
                }
                Mode::Lens => {
                    if !self.io.need_bits(strm, 32) {
                        return self.leave(strm);
                    }
                    let lens = self.io.bits(32);
                    if (!lens >> 16) & 0xffff != lens & 0xffff {
                        return Err(OxiflateError::data("invalid stored block lengths"));
                    }
                    self.io.dump(32);
                    self.left = (lens & 0xffff) as usize;
                    self.mode = if self.left != 0 {
                        Mode::Stored
                    } else if self.last {
                        Mode::Dry
                    } else {
                        self.after_empty_stored = true;
                        Mode::Type
                    };
                }
                Mode::Stored => {
                    if strm.avail_in() == 0 && self.io.bitk < 8 {
                        return self.leave(strm);
                    }
                    if !self.io.need_out(strm) {
                        return self.leave(strm);
                    }
                    // Whole bytes pulled in with the length words come first.
                    while self.left > 0 && self.io.bitk >= 8 && self.io.avail() > 0 {
                        let byte = self.io.bits(8) as u8;
                        self.io.dump(8);
                        self.io.put(byte);
                        self.left -= 1;
                    }
                    let n = self.left.min(strm.avail_in()).min(self.io.avail());
                    self.io.put_slice(strm.take(n));
                    self.left -= n;
                    if self.left == 0 {
                        self.mode = if self.last { Mode::Dry } else { Mode::Type };
                    }
                }
                Mode::Table => {
                    if !self.io.need_bits(strm, 14) {
                        return self.leave(strm);
                    }
                    let t = self.io.bits(14) as usize;
                    if t & 0x1f > 29 || (t >> 5) & 0x1f > 29 {
                        return Err(OxiflateError::data("too many length or distance symbols"));
                    }
                    self.io.dump(14);
                    self.nlen = 257 + (t & 0x1f);
                    self.ndist = 1 + ((t >> 5) & 0x1f);
                    self.ncode = 4 + (t >> 10);
                    self.index = 0;
                    self.bl_lengths = [0; BL_CODES];
                    self.mode = Mode::BitTree;
                }
                Mode::BitTree => {
                    while self.index < self.ncode {
                        if !self.io.need_bits(strm, 3) {
                            return self.leave(strm);
                        }
                        self.bl_lengths[BL_ORDER[self.index]] = self.io.bits(3) as u8;
                        self.io.dump(3);
                        self.index += 1;
                    }
                    self.bl_table = build_bit_length_table(&self.bl_lengths)?;
                    self.index = 0;
                    self.lengths.clear();
                    self.lengths.resize(self.nlen + self.ndist, 0);
                    self.mode = Mode::DistTree;
                }
                Mode::DistTree => {
                    if !self.read_code_lengths(strm)? {
                        return self.leave(strm);
                    }
                    let (lit, dist) = build_dynamic_tables(&self.lengths, self.nlen)?;
                    tracing::trace!(
                        last = self.last,
                        nlen = self.nlen,
                        ndist = self.ndist,
                        "dynamic block"
                    );
                    self.codes = Some(Codes::new(Cow::Owned(lit), Cow::Owned(dist)));
                    self.mode = Mode::Codes;
                }
                Mode::Codes => {
                    let Some(codes) = self.codes.as_mut() else {
                        return Err(OxiflateError::stream("missing block tables"));
                    };
                    if !codes.run(&mut self.io, strm)? {
                        return Ok(false);
                    }
                    self.codes = None;
                    self.mode = if self.last { Mode::Dry } else { Mode::Type };
                }
                Mode::Dry => {
                    self.io.flush(strm);
                    if !self.io.is_drained() {
                        return Ok(false);
                    }
                    self.mode = Mode::Done;
                }
                Mode::Done => return Ok(true),
                Mode::Bad => return Err(OxiflateError::data("invalid block state")),
            }
        }
    }

    /// Decode code lengths with the bit-length code. True once all
    /// `nlen + ndist` lengths are in.
    fn read_code_lengths(&mut self, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        let total = self.nlen + self.ndist;
        let width = self.bl_table.root_bits as u32;

        while self.index < total {
            let Some((_, code)) = decode(&self.bl_table, 0, width, &mut self.io, strm) else {
                return Ok(false);
            };
            let symbol = code.val as usize;
            let bits = code.bits as u32;

            if symbol < 16 {
                self.io.dump(bits);
                self.lengths[self.index] = symbol as u8;
                self.index += 1;
                continue;
            }

            let (extra, base) = match symbol {
                16 => (2, 3),
                17 => (3, 3),
                _ => (7, 11),
            };
            if !self.io.need_bits(strm, bits + extra) {
                return Ok(false);
            }
            self.io.dump(bits);
            let repeat = base + self.io.bits(extra) as usize;
            self.io.dump(extra);

            if self.index + repeat > total || (symbol == 16 && self.index == 0) {
                return Err(OxiflateError::data("invalid bit length repeat"));
            }
            let value = if symbol == 16 {
                self.lengths[self.index - 1]
            } else {
                0
            };
            self.lengths[self.index..self.index + repeat].fill(value);
            self.index += repeat;
        }
        Ok(true)
    }

    fn leave(&mut self, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        self.io.flush(strm);
        Ok(false)
    }
}
