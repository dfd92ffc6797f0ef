//! # OxiFlate Deflate
//!
//! Pure Rust streaming implementation of DEFLATE (RFC 1951) and the zlib
//! wrapper (RFC 1950).
//!
//! Both directions are resumable state machines driven by step calls over
//! caller-supplied buffers. Input may be split anywhere and output buffers
//! may be as small as one byte; the bytes produced are identical to a
//! single call with unbounded buffers.
//!
//! ## Features
//!
//! - **Compression**: hash-chain LZ77 with greedy or lazy matching, optimal
//!   choice between stored, fixed and dynamic Huffman blocks per block
//!   - Levels 0-9, filtered and Huffman-only strategies
//!   - Partial, sync and full flushes; preset dictionaries
//! - **Decompression**: multi-level table decoding with a fast path
//!   - Window sizes 512 bytes to 32K
//!   - Preset dictionaries, resynchronization at flush markers
//! - **Adapters**: one-shot helpers and [`std::io`] reader/writer wrappers
//!
//! ## Example
//!
//! ```rust
//! use oxiflate_deflate::{zlib_compress, zlib_decompress};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = zlib_compress(original, 6).unwrap();
//! let decompressed = zlib_decompress(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use oxiflate_core::{Flush, Status};
//! use oxiflate_deflate::{Deflater, Inflater};
//!
//! let mut deflater = Deflater::new(6);
//! let mut compressed = [0u8; 256];
//! let (_, n, status) = deflater
//!     .compress(b"stream me", &mut compressed, Flush::Finish)
//!     .unwrap();
//! assert_eq!(status, Status::StreamEnd);
//!
//! let mut inflater = Inflater::new();
//! let mut out = [0u8; 64];
//! let (_, m, status) = inflater
//!     .decompress(&compressed[..n], &mut out, Flush::None)
//!     .unwrap();
//! assert_eq!(status, Status::StreamEnd);
//! assert_eq!(&out[..m], b"stream me");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod bits;
mod buffers;
pub mod config;
pub mod deflate;
pub mod inflate;
mod inftree;
pub mod stream;
pub mod tables;
pub mod trees;
pub mod zlib;

// Re-exports
pub use config::{DeflateConfig, InflateConfig};
pub use deflate::{Deflater, deflate};
pub use inflate::{Inflater, inflate};
pub use stream::{ZlibReader, ZlibWriter};
pub use zlib::{
    ZlibHeader, ZlibLevel, zlib_compress, zlib_compress_with_dict, zlib_decompress,
    zlib_decompress_with_dict, zlib_requires_dictionary,
};
