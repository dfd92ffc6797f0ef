//! Pending-output buffer with an LSB-first bit accumulator.
//!
//! The compressor never writes to the caller's buffer directly. Finished
//! bytes are staged here and drained by [`PendingBuf::flush_to`] whenever
//! the caller offers output space, so a step call can always stop at any
//! byte boundary and resume later.
//!
//! Bits are packed LSB-first through a 16-bit accumulator, as DEFLATE
//! requires.

/// Width of the bit accumulator.
const BUF_SIZE: u32 = 16;

/// Staged output bytes plus the bit accumulator.
#[derive(Debug, Default)]
pub(crate) struct PendingBuf {
    /// Bytes not yet handed to the caller.
    buf: Vec<u8>,
    /// Next byte of `buf` to hand out.
    out: usize,
    /// Bit accumulator; bits are inserted starting at the bottom.
    bi_buf: u16,
    /// Number of valid bits in `bi_buf`.
    bi_valid: u32,
}

impl PendingBuf {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Drop staged bytes and bits.
    pub(crate) fn reset(&mut self) {
        self.buf.clear();
        self.out = 0;
        self.bi_buf = 0;
        self.bi_valid = 0;
    }

    /// Number of staged bytes still owed to the caller.
    #[inline]
    pub(crate) fn pending(&self) -> usize {
        self.buf.len() - self.out
    }

    /// Number of bits waiting in the accumulator.
    #[inline]
    pub(crate) fn bits_valid(&self) -> u32 {
        self.bi_valid
    }

    #[inline]
    pub(crate) fn put_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Write a 16-bit value LSB first.
    #[inline]
    pub(crate) fn put_short(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 16-bit value MSB first (zlib header and trailer).
    #[inline]
    pub(crate) fn put_short_msb(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes; the accumulator must be empty.
    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bi_valid, 0, "raw bytes written mid-byte");
        self.buf.extend_from_slice(bytes);
    }

    /// Send `length` bits of `value`, LSB first.
    #[inline]
    pub(crate) fn send_bits(&mut self, value: u32, length: u32) {
        debug_assert!(length > 0 && length <= BUF_SIZE && value >> length == 0);
        if self.bi_valid > BUF_SIZE - length {
            self.bi_buf |= (value << self.bi_valid) as u16;
            self.put_short(self.bi_buf);
            self.bi_buf = (value >> (BUF_SIZE - self.bi_valid)) as u16;
            self.bi_valid = self.bi_valid + length - BUF_SIZE;
        } else {
            self.bi_buf |= (value << self.bi_valid) as u16;
            self.bi_valid += length;
        }
    }

    /// Flush whole bytes out of the accumulator, keeping at most 7 bits.
    pub(crate) fn bi_flush(&mut self) {
        if self.bi_valid == 16 {
            self.put_short(self.bi_buf);
            self.bi_buf = 0;
            self.bi_valid = 0;
        } else if self.bi_valid >= 8 {
            self.put_byte(self.bi_buf as u8);
            self.bi_buf >>= 8;
            self.bi_valid -= 8;
        }
    }

    /// Flush the accumulator and pad to a byte boundary.
    pub(crate) fn bi_windup(&mut self) {
        if self.bi_valid > 8 {
            self.put_short(self.bi_buf);
        } else if self.bi_valid > 0 {
            self.put_byte(self.bi_buf as u8);
        }
        self.bi_buf = 0;
        self.bi_valid = 0;
    }

    /// Copy as many staged bytes as fit into `output`; returns the count.
    pub(crate) fn flush_to(&mut self, output: &mut [u8]) -> usize {
        let len = self.pending().min(output.len());
        if len == 0 {
            return 0;
        }
        output[..len].copy_from_slice(&self.buf[self.out..self.out + len]);
        self.out += len;
        if self.out == self.buf.len() {
            self.buf.clear();
            self.out = 0;
        }
        len
    }
}
