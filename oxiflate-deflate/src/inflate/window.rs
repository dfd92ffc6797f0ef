//! Bit buffer and circular output window for the decompressor.
//!
//! Decoded bytes are written into the window first and later copied out to
//! the caller by [`InflateIo::flush`]. `read..write` (wrapping) is the part
//! not yet delivered. The window is full when `write` is one slot behind
//! `read`, so `read == write` always means drained.
//!
//! Bits are accumulated LSB-first. Bits above `bitk` are always zero, so a
//! table lookup with fewer bits than the root width sees zeros there.

use oxiflate_core::adler32::Adler32;

use crate::buffers::StreamBuffers;

#[derive(Debug)]
pub(crate) struct InflateIo {
    pub(super) bitb: u64,
    pub(super) bitk: u32,
    window: Vec<u8>,
    read: usize,
    write: usize,
    /// Valid history bytes, at most the window size.
    whave: usize,
    /// Running checksum over delivered bytes; `None` for raw streams.
    check: Option<Adler32>,
}

impl InflateIo {
    pub(crate) fn new(w_bits: u8, wrap: bool) -> Self {
        Self {
            bitb: 0,
            bitk: 0,
            window: vec![0; 1 << w_bits],
            read: 0,
            write: 0,
            whave: 0,
            check: wrap.then(Adler32::new),
        }
    }

    /// Drop all bits and history. Returns the checksum of everything
    /// delivered before the reset.
    pub(crate) fn reset(&mut self) -> u32 {
        let was = self.checksum();
        self.bitb = 0;
        self.bitk = 0;
        self.read = 0;
        self.write = 0;
        self.whave = 0;
        if let Some(check) = &mut self.check {
            *check = Adler32::new();
        }
        was
    }

    /// Adler-32 of the bytes delivered so far (1 for raw streams).
    pub(crate) fn checksum(&self) -> u32 {
        self.check.as_ref().map_or(1, Adler32::finish)
    }

    // ----- bits -----

    /// Pull one input byte into the bit buffer.
    #[inline]
    pub(super) fn pull_byte(&mut self, strm: &mut StreamBuffers<'_>) -> bool {
        match strm.next_byte() {
            Some(byte) => {
                self.bitb |= (byte as u64) << self.bitk;
                self.bitk += 8;
                true
            }
            None => false,
        }
    }

    /// Make sure `n` bits are buffered; false if input ran out first.
    #[inline]
    pub(super) fn need_bits(&mut self, strm: &mut StreamBuffers<'_>, n: u32) -> bool {
        while self.bitk < n {
            if !self.pull_byte(strm) {
                return false;
            }
        }
        true
    }

    /// Low `n` bits of the buffer.
    #[inline]
    pub(super) fn bits(&self, n: u32) -> u32 {
        (self.bitb & ((1u64 << n) - 1)) as u32
    }

    #[inline]
    pub(super) fn dump(&mut self, n: u32) {
        self.bitb >>= n;
        self.bitk -= n;
    }

    /// Discard bits up to the next byte boundary.
    pub(super) fn align(&mut self) {
        self.dump(self.bitk & 7);
    }

    /// Next byte-aligned byte: buffered whole bytes first, then input.
    pub(super) fn take_byte(&mut self, strm: &mut StreamBuffers<'_>) -> Option<u8> {
        self.align();
        if self.bitk >= 8 {
            let byte = self.bits(8) as u8;
            self.dump(8);
            return Some(byte);
        }
        strm.next_byte()
    }

    /// Hand whole buffered bytes taken during this call back to the input.
    pub(super) fn unread_whole_bytes(&mut self, strm: &mut StreamBuffers<'_>) {
        let n = (self.bitk >> 3).min(strm.consumed() as u32);
        strm.unread(n as usize);
        self.bitk -= n << 3;
        self.bitb &= (1u64 << self.bitk) - 1;
    }

    // ----- window -----

    /// Contiguous free space at `write`.
    #[inline]
    pub(super) fn avail(&self) -> usize {
        if self.write < self.read {
            self.read - self.write - 1
        } else {
            self.window.len() - self.write
        }
    }

    /// Whether every decoded byte has been delivered.
    #[inline]
    pub(super) fn is_drained(&self) -> bool {
        self.read == self.write
    }

    #[inline]
    pub(super) fn has_history(&self, dist: usize) -> bool {
        dist <= self.whave
    }

    fn wrap_write(&mut self) {
        if self.write == self.window.len() && self.read != 0 {
            self.write = 0;
        }
    }

    /// Make room for at least one output byte, delivering pending output
    /// if needed. False if the window is still full.
    pub(super) fn need_out(&mut self, strm: &mut StreamBuffers<'_>) -> bool {
        if self.avail() == 0 {
            self.wrap_write();
            if self.avail() == 0 {
                self.flush(strm);
                self.wrap_write();
                if self.avail() == 0 {
                    return false;
                }
            }
        }
        true
    }

    #[inline]
    pub(super) fn put(&mut self, byte: u8) {
        self.window[self.write] = byte;
        self.write += 1;
        if self.whave < self.window.len() {
            self.whave += 1;
        }
    }

    /// Append bytes; `bytes.len()` must not exceed [`Self::avail`].
    pub(super) fn put_slice(&mut self, bytes: &[u8]) {
        self.window[self.write..self.write + bytes.len()].copy_from_slice(bytes);
        self.write += bytes.len();
        self.whave = (self.whave + bytes.len()).min(self.window.len());
    }

    /// Append a copy of the byte `dist` back.
    #[inline]
    pub(super) fn put_back(&mut self, dist: usize) {
        let size = self.window.len();
        let from = (self.write + size - dist) % size;
        self.put(self.window[from]);
    }

    /// Append `len` bytes copied from `dist` back. The caller guarantees
    /// `len <= avail()` and `dist <= whave`.
    pub(super) fn copy_match(&mut self, dist: usize, len: usize) {
        let size = self.window.len();
        let mut from = if dist <= self.write {
            self.write - dist
        } else {
            self.write + size - dist
        };

        if from < self.write && from + len <= self.write {
            // Source and destination do not overlap.
            self.window.copy_within(from..from + len, self.write);
            self.write += len;
        } else {
            for _ in 0..len {
                self.window[self.write] = self.window[from];
                self.write += 1;
                from += 1;
                if from == size {
                    from = 0;
                }
            }
        }
        self.whave = (self.whave + len).min(size);
    }

    /// Copy undelivered bytes to the caller's output, updating the checksum
    /// over exactly the bytes delivered.
    pub(crate) fn flush(&mut self, strm: &mut StreamBuffers<'_>) {
        let end = if self.read <= self.write {
            self.write
        } else {
            self.window.len()
        };
        self.deliver(strm, end);

        if self.read == self.window.len() {
            self.read = 0;
            if self.write == self.window.len() {
                self.write = 0;
            }
            self.deliver(strm, self.write);
        }
    }

    fn deliver(&mut self, strm: &mut StreamBuffers<'_>, end: usize) {
        let n = strm.write(&self.window[self.read..end]);
        if let Some(check) = &mut self.check {
            check.update(&self.window[self.read..self.read + n]);
        }
        self.read += n;
    }

    /// Preload history. At most `window size - 1` bytes are kept.
    pub(crate) fn set_dictionary(&mut self, dictionary: &[u8]) {
        let max = self.window.len() - 1;
        let dictionary = if dictionary.len() > max {
            &dictionary[dictionary.len() - max..]
        } else {
            dictionary
        };
        self.window[..dictionary.len()].copy_from_slice(dictionary);
        self.read = dictionary.len();
        self.write = dictionary.len();
        self.whave = dictionary.len();
    }
}
