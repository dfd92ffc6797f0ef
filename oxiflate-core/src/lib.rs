//! # OxiFlate Core
//!
//! Core components shared by the OxiFlate codec crates.
//!
//! - [`adler32`]: Adler-32 checksum used by the zlib wrapper
//! - [`traits`]: Streaming [`Compressor`]/[`Decompressor`] traits, flush modes,
//!   levels and strategies
//! - [`error`]: Error types following the zlib return-code taxonomy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Tools                                               │
//! │     oxiflate CLI                                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Framing and adapters                                │
//! │     zlib header/trailer, Read/Write wrappers, one-shot  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Codec                                               │
//! │     LZ77 + Huffman compressor, table-driven inflater    │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Core (this crate)                                   │
//! │     Adler-32, traits, errors                            │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_core::adler32::{ADLER32_INIT, Adler32, adler32};
//!
//! let whole = Adler32::checksum(b"Hello, World!");
//! let running = adler32(ADLER32_INIT, b"Hello, ");
//! assert_eq!(adler32(running, b"World!"), whole);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler32;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use adler32::{ADLER32_INIT, Adler32, adler32};
pub use error::{OxiflateError, Result};
pub use traits::{CompressionLevel, Compressor, Decompressor, Flush, Status, Strategy};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adler32::Adler32;
    pub use crate::error::{OxiflateError, Result};
    pub use crate::traits::{
        CompressionLevel, Compressor, Decompressor, Flush, Status, Strategy,
    };
}
