//! Info command implementation.

use super::test::verify_stream;
use crate::utils::format_ratio;
use oxiflate_deflate::{ZlibHeader, zlib::zlib_trailer_checksum};
use serde::Serialize;
use std::path::Path;

/// Header and trailer details of a zlib stream.
#[derive(Debug, Serialize)]
struct StreamInfo {
    file: String,
    compressed_size: u64,
    method: &'static str,
    window_bits: u8,
    window_size: u32,
    level: &'static str,
    preset_dictionary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dictionary_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncompressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trailer_adler32: Option<u32>,
    /// `None` when the stream cannot be decoded without its dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StreamInfo {
    fn inspect(file: &Path, data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let header = ZlibHeader::parse(data)?;
        let mut info = Self {
            file: file.display().to_string(),
            compressed_size: data.len() as u64,
            method: "deflate",
            window_bits: header.window_bits,
            window_size: 1 << header.window_bits,
            level: header.level.name(),
            preset_dictionary: header.dictionary_id.is_some(),
            dictionary_id: header.dictionary_id,
            uncompressed_size: None,
            space_savings: None,
            trailer_adler32: None,
            valid: None,
            error: None,
        };

        if header.dictionary_id.is_some() {
            return Ok(info);
        }
        match verify_stream(data, false) {
            Ok(verified) => {
                let end = verified.compressed as usize;
                info.trailer_adler32 = zlib_trailer_checksum(&data[..end.min(data.len())]);
                info.uncompressed_size = Some(verified.original);
                if verified.original > 0 {
                    info.space_savings = Some(
                        (1.0 - verified.compressed as f64 / verified.original as f64) * 100.0,
                    );
                }
                info.valid = Some(true);
            }
            Err(e) => {
                info.trailer_adler32 = zlib_trailer_checksum(data);
                info.valid = Some(false);
                info.error = Some(e.to_string());
            }
        }
        Ok(info)
    }

    fn print(&self) {
        println!("Stream Information");
        println!("==================");
        println!("File: {}", self.file);
        println!("Compressed size: {} bytes", self.compressed_size);
        println!("Method: {} (CM 8)", self.method);
        println!(
            "Window: {} bytes (CINFO {})",
            self.window_size,
            self.window_bits - 8
        );
        println!("Level class: {}", self.level);
        match self.dictionary_id {
            Some(id) => println!("Preset dictionary: yes (id {:#010x})", id),
            None => println!("Preset dictionary: no"),
        }

        if let Some(size) = self.uncompressed_size {
            println!("Uncompressed size: {} bytes", size);
            println!(
                "Compression ratio: {}",
                format_ratio(size, self.compressed_size)
            );
        }
        if let Some(adler) = self.trailer_adler32 {
            println!("Trailer Adler-32: {:#010x}", adler);
        }
        match (self.valid, &self.error) {
            (Some(true), _) => println!("Integrity: OK"),
            (Some(false), Some(e)) => println!("Integrity: FAILED - {}", e),
            _ => println!("Integrity: not checked (dictionary required)"),
        }
    }
}

pub fn cmd_info(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(file)?;
    let info = StreamInfo::inspect(file, &data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        info.print();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiflate_core::Adler32;
    use oxiflate_deflate::{zlib_compress, zlib_compress_with_dict};

    #[test]
    fn test_inspect_plain_stream() {
        let data = b"information about this stream ".repeat(40);
        let compressed = zlib_compress(&data, 9).unwrap();
        let info = StreamInfo::inspect(Path::new("x.zz"), &compressed).unwrap();
        assert_eq!(info.window_bits, 15);
        assert_eq!(info.window_size, 32768);
        assert_eq!(info.level, "maximum");
        assert!(!info.preset_dictionary);
        assert_eq!(info.uncompressed_size, Some(data.len() as u64));
        assert_eq!(info.trailer_adler32, Some(Adler32::checksum(&data)));
        assert_eq!(info.valid, Some(true));
    }

    #[test]
    fn test_inspect_dictionary_stream() {
        let compressed = zlib_compress_with_dict(b"needs a dictionary", 6, b"dictionary").unwrap();
        let info = StreamInfo::inspect(Path::new("d.zz"), &compressed).unwrap();
        assert_eq!(info.dictionary_id, Some(Adler32::checksum(b"dictionary")));
        assert_eq!(info.valid, None);
        assert_eq!(info.uncompressed_size, None);
    }

    #[test]
    fn test_inspect_corrupt_trailer() {
        let mut compressed = zlib_compress(b"corrupt trailer", 6).unwrap();
        let last = compressed.len() - 1;
        compressed[last] ^= 1;
        let info = StreamInfo::inspect(Path::new("c.zz"), &compressed).unwrap();
        assert_eq!(info.valid, Some(false));
        assert!(info.error.is_some());
    }

    #[test]
    fn test_json_fields() {
        let compressed = zlib_compress(b"json", 6).unwrap();
        let info = StreamInfo::inspect(Path::new("j.zz"), &compressed).unwrap();
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["method"], "deflate");
        assert_eq!(value["level"], "default");
        assert!(value.get("dictionary_id").is_none());
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_not_zlib() {
        assert!(StreamInfo::inspect(Path::new("n"), b"PK\x03\x04").is_err());
    }
}
