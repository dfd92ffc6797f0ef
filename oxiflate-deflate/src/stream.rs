//! [`std::io`] adapters over the streaming codec.
//!
//! [`ZlibWriter`] compresses everything written to it into an inner
//! writer; [`ZlibReader`] decompresses a zlib stream pulled from an inner
//! reader. Both also handle raw DEFLATE through their `with_config`
//! constructors.

use std::io::{self, Read, Write};

use oxiflate_core::error::{OxiflateError, Result};
use oxiflate_core::traits::{CompressionLevel, Flush, Status};

use crate::config::{DeflateConfig, InflateConfig};
use crate::deflate::Deflater;
use crate::inflate::Inflater;

/// Size of the staging buffers between the codec and the inner stream.
const BUFFER_SIZE: usize = 32 * 1024;

/// A compressing writer.
///
/// [`Write::flush`] emits a sync flush, so everything written so far can be
/// decoded by the reader. Call [`ZlibWriter::finish`] to write the final
/// block and trailer and get the inner writer back; dropping an unfinished
/// writer finishes it on a best-effort basis.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use oxiflate_deflate::stream::ZlibWriter;
/// use oxiflate_deflate::zlib::zlib_decompress;
///
/// let mut writer = ZlibWriter::new(Vec::new(), 6);
/// writer.write_all(b"Hello, World!").unwrap();
/// let compressed = writer.finish().unwrap();
/// assert_eq!(zlib_decompress(&compressed).unwrap(), b"Hello, World!");
/// ```
#[derive(Debug)]
pub struct ZlibWriter<W: Write> {
    inner: Option<W>,
    deflater: Deflater,
    buffer: Vec<u8>,
}

impl<W: Write> ZlibWriter<W> {
    /// Create a zlib writer with the given level and default parameters.
    pub fn new(inner: W, level: impl Into<CompressionLevel>) -> Self {
        Self {
            inner: Some(inner),
            deflater: Deflater::new(level),
            buffer: vec![0; BUFFER_SIZE],
        }
    }

    /// Create a writer from a full configuration (raw DEFLATE included).
    pub fn with_config(inner: W, config: DeflateConfig) -> Result<Self> {
        Ok(Self {
            inner: Some(inner),
            deflater: Deflater::with_config(config)?,
            buffer: vec![0; BUFFER_SIZE],
        })
    }

    /// Preset dictionary; only valid before the first write.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.deflater.set_dictionary(dictionary)
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.deflater.total_in()
    }

    /// Compressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.deflater.total_out()
    }

    /// The inner writer, holding the compressed bytes written so far.
    ///
    /// `None` only while the writer is being finished.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Finish the stream and return the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.pump(&[], Flush::Finish)?;
        let mut inner = self
            .inner
            .take()
            .ok_or_else(|| io::Error::other("zlib writer already finished"))?;
        inner.flush()?;
        Ok(inner)
    }

    /// Feed `input` through the compressor, writing all output produced.
    fn pump(&mut self, mut input: &[u8], flush: Flush) -> io::Result<()> {
        let Some(inner) = self.inner.as_mut() else {
            return Err(io::Error::other("zlib writer already finished"));
        };

        loop {
            let (consumed, produced, status) =
                match self.deflater.compress(input, &mut self.buffer, flush) {
                    Ok(step) => step,
                    // Nothing left to do for this flush mode.
                    Err(OxiflateError::Buffer) => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
            input = &input[consumed..];
            inner.write_all(&self.buffer[..produced])?;

            if status == Status::StreamEnd {
                return Ok(());
            }
            if input.is_empty() && produced < self.buffer.len() && flush != Flush::Finish {
                return Ok(());
            }
        }
    }
}

impl<W: Write> Write for ZlibWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pump(buf, Flush::None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.pump(&[], Flush::Sync)?;
        match self.inner.as_mut() {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for ZlibWriter<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            let _ = self.pump(&[], Flush::Finish);
        }
    }
}

/// A decompressing reader.
///
/// Reading stops at the end of the compressed stream; bytes after it stay
/// unread in the internal buffer. A stream cut short yields
/// [`io::ErrorKind::UnexpectedEof`]; corrupt data yields
/// [`io::ErrorKind::InvalidData`].
///
/// # Example
///
/// ```
/// use std::io::Read;
/// use oxiflate_deflate::stream::ZlibReader;
/// use oxiflate_deflate::zlib::zlib_compress;
///
/// let compressed = zlib_compress(b"Hello, World!", 6).unwrap();
/// let mut reader = ZlibReader::new(&compressed[..]);
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "Hello, World!");
/// ```
#[derive(Debug)]
pub struct ZlibReader<R: Read> {
    inner: R,
    inflater: Inflater,
    buffer: Vec<u8>,
    pos: usize,
    len: usize,
    eof: bool,
    done: bool,
    dictionary: Option<Vec<u8>>,
}

impl<R: Read> ZlibReader<R> {
    /// Create a reader for a zlib stream.
    pub fn new(inner: R) -> Self {
        Self::from_inflater(inner, Inflater::new())
    }

    /// Create a reader from a configuration (raw DEFLATE included).
    pub fn with_config(inner: R, config: InflateConfig) -> Result<Self> {
        Ok(Self::from_inflater(inner, Inflater::with_config(config)?))
    }

    fn from_inflater(inner: R, inflater: Inflater) -> Self {
        Self {
            inner,
            inflater,
            buffer: vec![0; BUFFER_SIZE],
            pos: 0,
            len: 0,
            eof: false,
            done: false,
            dictionary: None,
        }
    }

    /// Dictionary to supply if the stream asks for one. Raw readers load it
    /// immediately.
    pub fn with_dictionary(mut self, dictionary: &[u8]) -> Result<Self> {
        if self.inflater.is_raw() {
            self.inflater.set_dictionary(dictionary)?;
        }
        self.dictionary = Some(dictionary.to_vec());
        Ok(self)
    }

    /// Compressed bytes consumed so far.
    pub fn total_in(&self) -> u64 {
        self.inflater.total_in()
    }

    /// Decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.inflater.total_out()
    }

    /// The inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the adapter and return the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.pos == self.len && !self.eof {
            self.pos = 0;
            self.len = loop {
                match self.inner.read(&mut self.buffer) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            self.eof = self.len == 0;
        }
        Ok(())
    }
}

impl<R: Read> Read for ZlibReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }

        loop {
            self.fill()?;
            let input = &self.buffer[self.pos..self.len];
            match self.inflater.decompress(input, out, Flush::None) {
                Ok((consumed, produced, status)) => {
                    self.pos += consumed;
                    match status {
                        Status::StreamEnd => {
                            self.done = true;
                            return Ok(produced);
                        }
                        Status::NeedDictionary(id) => {
                            let Some(dictionary) = &self.dictionary else {
                                return Err(io::Error::new(
                                    io::ErrorKind::InvalidInput,
                                    format!("stream needs preset dictionary {id:#010x}"),
                                ));
                            };
                            self.inflater.set_dictionary(dictionary)?;
                        }
                        Status::Ok => {}
                    }
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
                Err(OxiflateError::Buffer) if self.eof => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "compressed stream ended prematurely",
                    ));
                }
                Err(OxiflateError::Buffer) if self.pos < self.len => {
                    return Err(io::Error::other("decompressor made no progress"));
                }
                Err(OxiflateError::Buffer) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zlib::{zlib_compress, zlib_compress_with_dict, zlib_decompress};

    /// Reader that hands out at most `chunk` bytes per call.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn text(len: usize) -> Vec<u8> {
        b"All work and no play makes Jack a dull boy. "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn test_writer_roundtrip() {
        let data = text(100_000);
        let mut writer = ZlibWriter::new(Vec::new(), 6);
        for chunk in data.chunks(777) {
            writer.write_all(chunk).unwrap();
        }
        assert_eq!(writer.total_in(), data.len() as u64);
        let compressed = writer.finish().unwrap();
        assert!(compressed.len() < data.len() / 10);
        assert_eq!(zlib_decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_writer_flush_is_decodable() {
        let mut writer = ZlibWriter::new(Vec::new(), 6);
        writer.write_all(b"partial message").unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();

        let so_far = writer.inner.clone().unwrap();
        assert_eq!(&so_far[so_far.len() - 4..], &[0x00, 0x00, 0xFF, 0xFF]);

        let mut inflater = Inflater::new();
        let mut out = [0u8; 64];
        let (_, produced, _) = inflater.decompress(&so_far, &mut out, Flush::None).unwrap();
        assert_eq!(&out[..produced], b"partial message");
    }

    #[test]
    fn test_writer_drop_finishes() {
        let mut sink = Vec::new();
        {
            let mut writer = ZlibWriter::new(&mut sink, 1);
            writer.write_all(b"dropped").unwrap();
        }
        assert_eq!(zlib_decompress(&sink).unwrap(), b"dropped");
    }

    #[test]
    fn test_reader_trickle() {
        let data = text(50_000);
        let compressed = zlib_compress(&data, 9).unwrap();
        let mut reader = ZlibReader::new(Trickle {
            data: &compressed,
            chunk: 3,
        });
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(reader.total_in(), compressed.len() as u64);
    }

    #[test]
    fn test_reader_truncated() {
        let compressed = zlib_compress(&text(10_000), 6).unwrap();
        let mut reader = ZlibReader::new(&compressed[..compressed.len() - 3]);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_reader_corrupt() {
        let mut compressed = zlib_compress(&text(10_000), 6).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        let mut reader = ZlibReader::new(&compressed[..]);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_reader_dictionary() {
        let dict = b"shared vocabulary shared vocabulary";
        let compressed = zlib_compress_with_dict(b"vocabulary shared", 6, dict).unwrap();

        let mut reader = ZlibReader::new(&compressed[..]);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let mut reader = ZlibReader::new(&compressed[..]).with_dictionary(dict).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"vocabulary shared");
    }

    #[test]
    fn test_raw_pair() {
        let data = text(20_000);
        let mut writer =
            ZlibWriter::with_config(Vec::new(), DeflateConfig::new(4).raw()).unwrap();
        writer.write_all(&data).unwrap();
        let compressed = writer.finish().unwrap();

        let mut reader = ZlibReader::with_config(&compressed[..], InflateConfig::raw()).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
