//! Decoding the literal/length and distance codes of one block.
//!
//! [`Codes::run`] is a resumable state machine: it stops whenever input or
//! window space runs out and picks up at the same symbol on the next call.
//! While plenty of both is available it hands off to [`inflate_fast`].

use std::borrow::Cow;

use oxiflate_core::error::{OxiflateError, Result};

use super::window::InflateIo;
use crate::buffers::StreamBuffers;
use crate::inftree::{Code, HuffmanTable};
use crate::tables::MAX_MATCH;

/// Input bytes the fast loop needs on hand for one symbol pair.
const FAST_MIN_INPUT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Start,
    Len,
    LenExt,
    Dist,
    DistExt,
    Copy,
    Lit,
    Wash,
    End,
    BadCode,
}

#[derive(Debug)]
pub(super) struct Codes {
    mode: Mode,
    lit: Cow<'static, HuffmanTable>,
    dist: Cow<'static, HuffmanTable>,
    /// Current (sub-)table start and index width.
    table_base: usize,
    need: u32,
    len: usize,
    dist_val: usize,
    extra: u32,
    literal: u8,
}

/// Decode one entry of `table`, pulling input bytes only while the entry
/// length is still unknown. `None` when input ran out.
pub(super) fn decode(
    table: &HuffmanTable,
    base: usize,
    width: u32,
    io: &mut InflateIo,
    strm: &mut StreamBuffers<'_>,
) -> Option<(usize, Code)> {
    loop {
        let index = base + io.bits(width) as usize;
        let code = table.codes.get(index).copied().unwrap_or(Code::INVALID);
        if code.bits as u32 <= io.bitk {
            return Some((index, code));
        }
        if !io.pull_byte(strm) {
            return None;
        }
    }
}

impl Codes {
    pub(super) fn new(lit: Cow<'static, HuffmanTable>, dist: Cow<'static, HuffmanTable>) -> Self {
        Self {
            mode: Mode::Start,
            lit,
            dist,
            table_base: 0,
            need: 0,
            len: 0,
            dist_val: 0,
            extra: 0,
            literal: 0,
        }
    }

    /// Decode until the end of the block (`Ok(true)`) or until input or
    /// output space runs out (`Ok(false)`).
    pub(super) fn run(&mut self, io: &mut InflateIo, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        loop {
            match self.mode {
                Mode::Start => {
                    if io.avail() >= MAX_MATCH && strm.avail_in() >= FAST_MIN_INPUT {
                        match inflate_fast(io, strm, &self.lit, &self.dist) {
                            Ok(true) => {
                                self.mode = Mode::Wash;
                                continue;
                            }
                            Ok(false) => {}
                            Err(err) => {
                                self.mode = Mode::BadCode;
                                return Err(err);
                            }
                        }
                    }
                    self.table_base = 0;
                    self.need = self.lit.root_bits as u32;
                    self.mode = Mode::Len;
                }
                Mode::Len => {
                    let Some((index, code)) = decode(&self.lit, self.table_base, self.need, io, strm)
                    else {
                        return self.leave(io, strm);
                    };
                    io.dump(code.bits as u32);
                    if code.is_literal() {
                        self.literal = code.val as u8;
                        self.mode = Mode::Lit;
                    } else if code.is_base() {
                        self.len = code.val as usize;
                        self.extra = code.extra_bits();
                        self.mode = Mode::LenExt;
                    } else if code.is_link() {
                        self.table_base = index + code.val as usize;
                        self.need = code.op as u32;
                    } else if code.is_end_of_block() {
                        self.mode = Mode::Wash;
                    } else {
                        self.mode = Mode::BadCode;
                        return Err(OxiflateError::data("invalid literal/length code"));
                    }
                }
                Mode::LenExt => {
                    if !io.need_bits(strm, self.extra) {
                        return self.leave(io, strm);
                    }
                    self.len += io.bits(self.extra) as usize;
                    io.dump(self.extra);
                    self.table_base = 0;
                    self.need = self.dist.root_bits as u32;
                    self.mode = Mode::Dist;
                }
                Mode::Dist => {
                    let Some((index, code)) =
                        decode(&self.dist, self.table_base, self.need, io, strm)
                    else {
                        return self.leave(io, strm);
                    };
                    io.dump(code.bits as u32);
                    if code.is_base() {
                        self.dist_val = code.val as usize;
                        self.extra = code.extra_bits();
                        self.mode = Mode::DistExt;
                    } else if code.is_link() && !code.is_literal() {
                        self.table_base = index + code.val as usize;
                        self.need = code.op as u32;
                    } else {
                        self.mode = Mode::BadCode;
                        return Err(OxiflateError::data("invalid distance code"));
                    }
                }
                Mode::DistExt => {
                    if !io.need_bits(strm, self.extra) {
                        return self.leave(io, strm);
                    }
                    self.dist_val += io.bits(self.extra) as usize;
                    io.dump(self.extra);
                    if !io.has_history(self.dist_val) {
                        self.mode = Mode::BadCode;
                        return Err(OxiflateError::data("invalid distance too far back"));
                    }
                    self.mode = Mode::Copy;
                }
                Mode::Copy => {
                    while self.len > 0 {
                        if !io.need_out(strm) {
                            return self.leave(io, strm);
                        }
                        io.put_back(self.dist_val);
                        self.len -= 1;
                    }
                    self.mode = Mode::Start;
                }
                Mode::Lit => {
                    if !io.need_out(strm) {
                        return self.leave(io, strm);
                    }
                    io.put(self.literal);
                    self.mode = Mode::Start;
                }
                Mode::Wash => {
                    io.unread_whole_bytes(strm);
                    io.flush(strm);
                    if !io.is_drained() {
                        return Ok(false);
                    }
                    self.mode = Mode::End;
                }
                Mode::End => return Ok(true),
                Mode::BadCode => return Err(OxiflateError::data("invalid code")),
            }
        }
    }

    fn leave(&self, io: &mut InflateIo, strm: &mut StreamBuffers<'_>) -> Result<bool> {
        io.flush(strm);
        Ok(false)
    }
}

#[inline]
fn grab(io: &mut InflateIo, strm: &mut StreamBuffers<'_>, n: u32) {
    while io.bitk < n && io.pull_byte(strm) {}
}

#[inline]
fn mask(bits: u8) -> u64 {
    (1u64 << bits) - 1
}

/// Decode symbols straight into contiguous window space while at least
/// one maximal match fits and [`FAST_MIN_INPUT`] bytes remain. Returns
/// true at the end of the block.
///
/// Whole bytes left in the bit buffer are handed back to the input on exit.
fn inflate_fast(
    io: &mut InflateIo,
    strm: &mut StreamBuffers<'_>,
    lit: &HuffmanTable,
    dist: &HuffmanTable,
) -> Result<bool> {
    let lit_mask = mask(lit.root_bits);
    let dist_mask = mask(dist.root_bits);
    let mut end_of_block = false;

    'symbols: while io.avail() >= MAX_MATCH && strm.avail_in() >= FAST_MIN_INPUT {
        // Longest code plus length extra bits.
        grab(io, strm, 20);
        let mut index = (io.bitb & lit_mask) as usize;
        let mut code = lit.codes.get(index).copied().unwrap_or(Code::INVALID);

        loop {
            io.dump(code.bits as u32);
            if code.is_literal() {
                io.put(code.val as u8);
                continue 'symbols;
            }
            if code.is_base() {
                let extra = code.extra_bits();
                let len = code.val as usize + io.bits(extra) as usize;
                io.dump(extra);

                grab(io, strm, 15);
                let mut dindex = (io.bitb & dist_mask) as usize;
                let mut dcode = dist.codes.get(dindex).copied().unwrap_or(Code::INVALID);
                loop {
                    io.dump(dcode.bits as u32);
                    if dcode.is_base() {
                        let extra = dcode.extra_bits();
                        grab(io, strm, extra);
                        let d = dcode.val as usize + io.bits(extra) as usize;
                        io.dump(extra);
                        if !io.has_history(d) {
                            return Err(OxiflateError::data("invalid distance too far back"));
                        }
                        io.copy_match(d, len);
                        continue 'symbols;
                    }
                    if dcode.is_link() && !dcode.is_literal() {
                        dindex += dcode.val as usize + (io.bitb & mask(dcode.op)) as usize;
                        dcode = dist.codes.get(dindex).copied().unwrap_or(Code::INVALID);
                        continue;
                    }
                    return Err(OxiflateError::data("invalid distance code"));
                }
            }
            if code.is_link() {
                index += code.val as usize + (io.bitb & mask(code.op)) as usize;
                code = lit.codes.get(index).copied().unwrap_or(Code::INVALID);
                continue;
            }
            if code.is_end_of_block() {
                end_of_block = true;
                break 'symbols;
            }
            return Err(OxiflateError::data("invalid literal/length code"));
        }
    }

    io.unread_whole_bytes(strm);
    Ok(end_of_block)
}
