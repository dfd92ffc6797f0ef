//! Error types for OxiFlate operations.
//!
//! The variants follow the classic zlib return-code taxonomy: stream errors
//! signal caller misuse, data errors signal a malformed bitstream, buffer
//! errors signal that no progress was possible with the buffers supplied, and
//! memory errors signal an allocation failure.

use std::io;
use thiserror::Error;

/// The main error type for OxiFlate operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OxiflateError {
    /// Invalid call sequence or invalid arguments.
    #[error("Stream error: {message}")]
    Stream {
        /// Description of the misuse.
        message: String,
    },

    /// Malformed compressed data.
    #[error("Data error: {message}")]
    Data {
        /// Description of the corruption.
        message: String,
    },

    /// Adler-32 mismatch on a trailer or preset dictionary.
    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Value carried by the stream (or requested by it).
        expected: u32,
        /// Value computed from the data actually seen.
        computed: u32,
    },

    /// No progress was possible: input exhausted or output full.
    ///
    /// This is not fatal; retry the call with more input or output space.
    #[error("Buffer error: no progress possible")]
    Buffer,

    /// Allocation failure.
    #[error("Memory error: {message}")]
    Mem {
        /// Description of the failed allocation.
        message: String,
    },
}

/// Result type alias for OxiFlate operations.
pub type Result<T> = std::result::Result<T, OxiflateError>;

impl OxiflateError {
    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, computed: u32) -> Self {
        Self::ChecksumMismatch { expected, computed }
    }

    /// Create a memory error.
    pub fn mem(message: impl Into<String>) -> Self {
        Self::Mem {
            message: message.into(),
        }
    }

    /// True for errors caused by malformed input data.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::Data { .. } | Self::ChecksumMismatch { .. })
    }

    /// True if retrying with more input or output space may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Buffer)
    }

    /// The zlib integer return code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Stream { .. } => -2,
            Self::Data { .. } | Self::ChecksumMismatch { .. } => -3,
            Self::Mem { .. } => -4,
            Self::Buffer => -5,
        }
    }
}

impl From<OxiflateError> for io::Error {
    fn from(err: OxiflateError) -> Self {
        let kind = if err.is_data_error() {
            io::ErrorKind::InvalidData
        } else {
            io::ErrorKind::Other
        };
        io::Error::new(kind, err)
    }
}
