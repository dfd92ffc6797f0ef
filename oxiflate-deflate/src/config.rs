//! Session parameters for the compressor and decompressor.

use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressionLevel, Strategy};

/// Smallest supported window size (log2).
pub const MIN_WBITS: u8 = 9;

/// Largest supported window size (log2); a 32K window.
pub const MAX_WBITS: u8 = 15;

/// Largest memory level.
pub const MAX_MEM_LEVEL: u8 = 9;

/// Default memory level.
pub const DEF_MEM_LEVEL: u8 = 8;

/// Which block function a level uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockFunc {
    /// Copy input into stored blocks.
    Stored,
    /// Greedy matching.
    Fast,
    /// Lazy matching.
    Slow,
}

/// Match-effort parameters for one compression level.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LevelParams {
    /// Reduce lazy search above this match length.
    pub(crate) good_length: u16,
    /// Do not perform lazy search above this match length. For the fast
    /// function, do not insert skipped strings above this length.
    pub(crate) max_lazy: u16,
    /// Quit search above this match length.
    pub(crate) nice_length: u16,
    /// Maximum number of hash-chain probes.
    pub(crate) max_chain: u16,
    pub(crate) func: BlockFunc,
}

const fn params(good: u16, lazy: u16, nice: u16, chain: u16, func: BlockFunc) -> LevelParams {
    LevelParams {
        good_length: good,
        max_lazy: lazy,
        nice_length: nice,
        max_chain: chain,
        func,
    }
}

/// Parameters for levels 0-9.
pub(crate) const CONFIGURATION_TABLE: [LevelParams; 10] = [
    params(0, 0, 0, 0, BlockFunc::Stored),
    params(4, 4, 8, 4, BlockFunc::Fast),
    params(4, 5, 16, 8, BlockFunc::Fast),
    params(4, 6, 32, 32, BlockFunc::Fast),
    params(4, 4, 16, 16, BlockFunc::Slow),
    params(8, 16, 32, 32, BlockFunc::Slow),
    params(8, 16, 128, 128, BlockFunc::Slow),
    params(8, 32, 128, 256, BlockFunc::Slow),
    params(32, 128, 258, 1024, BlockFunc::Slow),
    params(32, 258, 258, 4096, BlockFunc::Slow),
];

/// Compressor configuration.
///
/// `window_bits` follows the zlib convention: 9..=15 selects a zlib-wrapped
/// stream with a window of `1 << window_bits` bytes, and the negated value
/// selects raw DEFLATE without header or trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Compression level.
    pub level: CompressionLevel,
    /// Window size (log2), negative for raw DEFLATE.
    pub window_bits: i32,
    /// Memory level 1..=9: sizes the hash table and the symbol buffer.
    pub mem_level: u8,
    /// Match-search strategy.
    pub strategy: Strategy,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: CompressionLevel::DEFAULT,
            window_bits: MAX_WBITS as i32,
            mem_level: DEF_MEM_LEVEL,
            strategy: Strategy::Default,
        }
    }
}

impl DeflateConfig {
    /// Default configuration at the given level.
    pub fn new(level: impl Into<CompressionLevel>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Set the compression level.
    pub fn with_level(mut self, level: impl Into<CompressionLevel>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the window size (log2), negative for raw DEFLATE.
    pub fn with_window_bits(mut self, window_bits: i32) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the memory level.
    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Produce raw DEFLATE (no zlib header or trailer).
    pub fn raw(mut self) -> Self {
        self.window_bits = -self.window_bits.abs();
        self
    }

    /// Whether the zlib wrapper is suppressed.
    pub fn is_raw(&self) -> bool {
        self.window_bits < 0
    }

    /// Window size (log2) regardless of wrapping.
    pub fn wbits(&self) -> u8 {
        self.window_bits.unsigned_abs().min(u8::MAX as u32) as u8
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        let wbits = self.window_bits.unsigned_abs();
        if !(MIN_WBITS as u32..=MAX_WBITS as u32).contains(&wbits) {
            return Err(OxiflateError::stream(format!(
                "window bits {} outside {}..={}",
                self.window_bits, MIN_WBITS, MAX_WBITS
            )));
        }
        if !(1..=MAX_MEM_LEVEL).contains(&self.mem_level) {
            return Err(OxiflateError::stream(format!(
                "memory level {} outside 1..={}",
                self.mem_level, MAX_MEM_LEVEL
            )));
        }
        Ok(())
    }
}

/// Decompressor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateConfig {
    /// Window size (log2); must be at least the compressor's.
    pub window_bits: u8,
    /// Expect raw DEFLATE (no zlib header or trailer).
    pub raw: bool,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            window_bits: MAX_WBITS,
            raw: false,
        }
    }
}

impl InflateConfig {
    /// Configuration for raw DEFLATE with a 32K window.
    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::default()
        }
    }

    /// Set the window size (log2).
    pub fn with_window_bits(mut self, window_bits: u8) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Check the parameters.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WBITS..=MAX_WBITS).contains(&self.window_bits) {
            return Err(OxiflateError::stream(format!(
                "window bits {} outside {}..={}",
                self.window_bits, MIN_WBITS, MAX_WBITS
            )));
        }
        Ok(())
    }
}
