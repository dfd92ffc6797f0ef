//! Adler-32 checksum (RFC 1950).
//!
//! Adler-32 keeps two running sums modulo the largest prime below 65536:
//! `s1` is the sum of all bytes plus one, `s2` is the sum of every `s1`
//! value. The packed checksum is `(s2 << 16) | s1`, and the checksum of an
//! empty stream is 1.

/// Largest prime smaller than 65536.
const ADLER_MOD: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(ADLER_MOD-1) fits in 32 bits.
const NMAX: usize = 5552;

/// Checksum of the empty byte sequence.
pub const ADLER32_INIT: u32 = 1;

/// Adler-32 checksum calculator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// Create a new Adler-32 calculator.
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Resume from a previously computed checksum.
    pub fn from_checksum(checksum: u32) -> Self {
        Self {
            a: checksum & 0xFFFF,
            b: checksum >> 16,
        }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        let mut a = self.a;
        let mut b = self.b;

        for chunk in data.chunks(NMAX) {
            let mut blocks = chunk.chunks_exact(16);
            for block in &mut blocks {
                // Sixteen steps at once: every byte adds to `b` once per
                // step left in the block, including its own.
                let mut sum = 0u32;
                let mut weighted = 0u32;
                for (i, &byte) in block.iter().enumerate() {
                    sum += byte as u32;
                    weighted += (16 - i as u32) * byte as u32;
                }
                b += 16 * a + weighted;
                a += sum;
            }
            for &byte in blocks.remainder() {
                a += byte as u32;
                b += a;
            }

            a %= ADLER_MOD;
            b %= ADLER_MOD;
        }

        self.a = a;
        self.b = b;
    }

    /// Return the packed checksum.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Compute the Adler-32 checksum of data in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.finish()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Continue a running checksum over `data`.
///
/// `adler32(ADLER32_INIT, data)` is the checksum of `data`; feeding the
/// result back in with the next chunk yields the checksum of the
/// concatenation.
pub fn adler32(running: u32, data: &[u8]) -> u32 {
    let mut adler = Adler32::from_checksum(running);
    adler.update(data);
    adler.finish()
}
