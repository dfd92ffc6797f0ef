//! Deterministic test data shared by the integration tests.

#![allow(dead_code)]

/// Linear congruential generator; the same seed always yields the same data.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    pub fn below(&mut self, n: usize) -> usize {
        self.next_u32() as usize % n
    }
}

/// Incompressible bytes.
pub fn random(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    (0..size).map(|_| (rng.next_u32() >> 8) as u8).collect()
}

/// Word salad over a small vocabulary; compresses well with long and short
/// matches at varying distances.
pub fn text(size: usize, seed: u64) -> Vec<u8> {
    const WORDS: [&[u8]; 12] = [
        b"the ", b"window ", b"slides ", b"over ", b"a ", b"stream ", b"of ", b"bytes, ",
        b"matching ", b"longest ", b"runs.\n", b"Huffman ",
    ];
    let mut rng = Lcg::new(seed);
    let mut data = Vec::with_capacity(size + 16);
    while data.len() < size {
        data.extend_from_slice(WORDS[rng.below(WORDS.len())]);
    }
    data.truncate(size);
    data
}

/// Text interleaved with random bursts and long zero runs.
pub fn mixed(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = Lcg::new(seed);
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let n = 1 + rng.below(600);
        match rng.below(3) {
            0 => data.extend(text(n, rng.next_u32() as u64)),
            1 => data.extend(random(n, rng.next_u32() as u64)),
            _ => data.extend(std::iter::repeat_n(0u8, n)),
        }
    }
    data.truncate(size);
    data
}
