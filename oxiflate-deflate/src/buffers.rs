//! Caller buffers lent to one step call.

use oxiflate_core::adler32::Adler32;

/// Input and output slices for a single step call, with cursors.
///
/// `next_in <= input.len()` and `next_out <= output.len()` hold at all times;
/// the remaining counts are derived from them.
#[derive(Debug)]
pub(crate) struct StreamBuffers<'a> {
    input: &'a [u8],
    next_in: usize,
    output: &'a mut [u8],
    next_out: usize,
}

impl<'a> StreamBuffers<'a> {
    pub(crate) fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            input,
            next_in: 0,
            output,
            next_out: 0,
        }
    }

    /// Bytes of input not yet consumed.
    #[inline]
    pub(crate) fn avail_in(&self) -> usize {
        self.input.len() - self.next_in
    }

    /// Bytes of output space left.
    #[inline]
    pub(crate) fn avail_out(&self) -> usize {
        self.output.len() - self.next_out
    }

    /// Bytes consumed so far in this call.
    #[inline]
    pub(crate) fn consumed(&self) -> usize {
        self.next_in
    }

    /// Bytes produced so far in this call.
    #[inline]
    pub(crate) fn produced(&self) -> usize {
        self.next_out
    }

    /// Take the next input byte.
    #[inline]
    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        let byte = self.input.get(self.next_in).copied()?;
        self.next_in += 1;
        Some(byte)
    }

    /// Take up to `n` input bytes.
    #[inline]
    pub(crate) fn take(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.avail_in());
        let input: &'a [u8] = self.input;
        let taken = &input[self.next_in..self.next_in + n];
        self.next_in += n;
        taken
    }

    /// Give back `n` bytes taken during this call.
    #[inline]
    pub(crate) fn unread(&mut self, n: usize) {
        debug_assert!(n <= self.next_in);
        self.next_in -= n;
    }

    /// Copy input into `dst`, updating `checksum` over the copied bytes.
    pub(crate) fn read_buf(&mut self, dst: &mut [u8], checksum: Option<&mut Adler32>) -> usize {
        let src = self.take(dst.len());
        dst[..src.len()].copy_from_slice(src);
        if let Some(adler) = checksum {
            adler.update(src);
        }
        src.len()
    }

    /// Unused part of the output buffer.
    #[inline]
    pub(crate) fn output_mut(&mut self) -> &mut [u8] {
        &mut self.output[self.next_out..]
    }

    /// Mark `n` bytes of [`Self::output_mut`] as written.
    #[inline]
    pub(crate) fn advance_out(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.next_out += n;
    }

    /// Append bytes to the output; returns how many fit.
    pub(crate) fn write(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.avail_out());
        self.output[self.next_out..self.next_out + n].copy_from_slice(&bytes[..n]);
        self.next_out += n;
        n
    }
}
