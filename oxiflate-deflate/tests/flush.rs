//! Flush boundaries, resynchronization and mid-stream parameter changes.

mod common;

use oxiflate_core::error::OxiflateError;
use oxiflate_core::traits::{Decompressor, Flush, Status, Strategy};
use oxiflate_deflate::{DeflateConfig, Deflater, InflateConfig, Inflater, zlib_decompress};

const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// Compress `input` with one call and an output buffer large enough for it.
fn step(deflater: &mut Deflater, input: &[u8], flush: Flush) -> Vec<u8> {
    let mut out = vec![0u8; input.len() * 2 + 1024];
    let (consumed, produced, _) = deflater.compress(input, &mut out, flush).unwrap();
    assert_eq!(consumed, input.len());
    out.truncate(produced);
    out
}

/// Decode as far as `compressed` allows, stopping at the first stall.
fn decode_available(inflater: &mut Inflater, compressed: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut out = vec![0u8; 4096];
    let mut pos = 0;
    loop {
        match inflater.decompress(&compressed[pos..], &mut out, Flush::None) {
            Ok((consumed, produced, status)) => {
                pos += consumed;
                data.extend_from_slice(&out[..produced]);
                if status == Status::StreamEnd {
                    break;
                }
            }
            Err(OxiflateError::Buffer) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    data
}

#[test]
fn test_sync_flush_prefixes_decode() {
    let data = common::mixed(50_000, 31);
    let segments: Vec<&[u8]> = data.chunks(9_000).collect();
    for level in [0u8, 1, 6, 9] {
        let mut deflater = Deflater::new(level);
        let mut compressed = Vec::new();
        let mut consumed = 0;
        for segment in &segments {
            compressed.extend(step(&mut deflater, segment, Flush::Sync));
            consumed += segment.len();
            assert!(compressed.ends_with(&SYNC_MARKER));

            let mut inflater = Inflater::new();
            assert_eq!(decode_available(&mut inflater, &compressed), &data[..consumed]);
        }
        compressed.extend(step(&mut deflater, &[], Flush::Finish));
        assert_eq!(zlib_decompress(&compressed).unwrap(), data);
    }
}

#[test]
fn test_partial_flush_prefix_decodes() {
    let data = common::text(20_000, 32);
    let (first, second) = data.split_at(7_777);
    let mut deflater = Deflater::new(6);
    let mut compressed = step(&mut deflater, first, Flush::Partial);
    // Not byte aligned, so no stored marker.
    assert!(!compressed.ends_with(&SYNC_MARKER));

    let mut inflater = Inflater::new();
    assert_eq!(decode_available(&mut inflater, &compressed), first);

    compressed.extend(step(&mut deflater, second, Flush::Finish));
    assert_eq!(zlib_decompress(&compressed).unwrap(), data);
}

#[test]
fn test_sync_point_after_full_flush() {
    let data = common::text(10_000, 33);
    let mut deflater = Deflater::new(6);
    let flushed = step(&mut deflater, &data, Flush::Full);
    assert!(flushed.ends_with(&SYNC_MARKER));

    // Directly after the marker.
    let mut inflater = Inflater::new();
    assert_eq!(decode_available(&mut inflater, &flushed), data);
    assert!(inflater.sync_point());

    // Waiting for the stored block's length bytes.
    let mut inflater = Inflater::new();
    assert_eq!(decode_available(&mut inflater, &flushed[..flushed.len() - 4]), data);
    assert!(inflater.sync_point());

    // Mid-block is never a sync point.
    let mut inflater = Inflater::new();
    decode_available(&mut inflater, &flushed[..flushed.len() / 2]);
    assert!(!inflater.sync_point());
}

#[test]
fn test_sync_recovers_after_full_flush() {
    let data = common::text(30_000, 34);
    let (first, rest) = data.split_at(12_000);
    let (second, third) = rest.split_at(9_000);

    let config = DeflateConfig::new(6).raw();
    let mut deflater = Deflater::with_config(config).unwrap();
    let mut compressed = step(&mut deflater, first, Flush::Full);
    let first_len = compressed.len();
    compressed.extend(step(&mut deflater, second, Flush::Full));
    compressed.extend(step(&mut deflater, third, Flush::Finish));

    // Start reading in the middle of the first segment.
    let mut inflater = Inflater::with_config(InflateConfig::raw()).unwrap();
    let (skipped, found) = inflater.sync(&compressed[5..]).unwrap();
    assert!(found);
    assert_eq!(5 + skipped, first_len);

    let recovered = decode_available(&mut inflater, &compressed[first_len..]);
    assert_eq!(recovered, rest);
    assert!(inflater.is_finished());
}

#[test]
fn test_sync_after_data_error() {
    let data = common::text(20_000, 35);
    let (first, second) = data.split_at(10_000);
    let mut deflater = Deflater::with_config(DeflateConfig::new(6).raw()).unwrap();
    let mut compressed = step(&mut deflater, first, Flush::Full);
    let first_len = compressed.len();
    compressed.extend(step(&mut deflater, second, Flush::Finish));

    // Block type 3 right at the start.
    let mut corrupt = compressed.clone();
    corrupt[0] |= 0x06;
    let mut inflater = Inflater::with_config(InflateConfig::raw()).unwrap();
    let mut out = vec![0u8; 64 * 1024];
    let err = inflater.decompress(&corrupt, &mut out, Flush::None).unwrap_err();
    assert!(err.is_data_error());

    let (skipped, found) = inflater.sync(&corrupt[1..]).unwrap();
    assert!(found);
    assert_eq!(1 + skipped, first_len);
    assert_eq!(decode_available(&mut inflater, &corrupt[first_len..]), second);
}

#[test]
fn test_sync_without_marker() {
    let mut inflater = Inflater::new();
    let (consumed, found) = inflater.sync(&[1, 2, 3, 0, 0]).unwrap();
    assert_eq!(consumed, 5);
    assert!(!found);
    // The two zeros carry over.
    let (consumed, found) = inflater.sync(&[0xFF, 0xFF, 0x03]).unwrap();
    assert_eq!(consumed, 2);
    assert!(found);
    assert!(matches!(inflater.sync(&[]), Err(OxiflateError::Buffer)));
}

#[test]
fn test_repeated_flush_without_input() {
    let mut deflater = Deflater::new(6);
    let mut compressed = step(&mut deflater, b"some input", Flush::Sync);
    let mut out = [0u8; 64];
    assert!(matches!(
        deflater.compress(&[], &mut out, Flush::Sync),
        Err(OxiflateError::Buffer)
    ));
    // A stronger flush still goes through.
    compressed.extend(step(&mut deflater, &[], Flush::Full));
    compressed.extend(step(&mut deflater, &[], Flush::Finish));
    assert_eq!(zlib_decompress(&compressed).unwrap(), b"some input");
}

#[test]
fn test_flush_every_byte() {
    let data = common::text(2_000, 36);
    let mut deflater = Deflater::new(6);
    let mut compressed = Vec::new();
    for byte in data.chunks(1) {
        compressed.extend(step(&mut deflater, byte, Flush::Sync));
    }
    compressed.extend(step(&mut deflater, &[], Flush::Finish));
    assert_eq!(zlib_decompress(&compressed).unwrap(), data);
}

#[test]
fn test_set_params_mid_stream() {
    let data = common::mixed(90_000, 37);
    let parts: Vec<&[u8]> = data.chunks(30_000).collect();
    let changes = [(0u8, Strategy::Default), (9, Strategy::Filtered), (2, Strategy::HuffmanOnly)];

    for (level, strategy) in changes {
        let mut deflater = Deflater::new(6);
        let mut compressed = step(&mut deflater, parts[0], Flush::None);

        let mut out = vec![0u8; 128 * 1024];
        let (produced, applied) = deflater.set_params(level, strategy, &mut out).unwrap();
        assert!(applied);
        compressed.extend_from_slice(&out[..produced]);
        assert_eq!(deflater.level(), level);

        compressed.extend(step(&mut deflater, parts[1], Flush::None));
        compressed.extend(step(&mut deflater, parts[2], Flush::Finish));
        assert_eq!(zlib_decompress(&compressed).unwrap(), data, "level {level}");
    }
}

#[test]
fn test_set_params_before_input() {
    let data = common::text(10_000, 38);
    let mut deflater = Deflater::new(1);
    let mut out = [0u8; 16];
    assert_eq!(
        deflater.set_params(9, Strategy::Default, &mut out).unwrap(),
        (0, true)
    );
    let compressed = step(&mut deflater, &data, Flush::Finish);
    // FLEVEL reflects the level in effect when the header was written.
    assert_eq!(compressed[1] >> 6, 3);
    assert_eq!(zlib_decompress(&compressed).unwrap(), data);
}

/// Retry `set_params` with `chunk`-sized output until it takes effect.
fn set_params_in_chunks(deflater: &mut Deflater, level: u8, chunk: usize) -> Vec<u8> {
    let mut written = Vec::new();
    let mut out = vec![0u8; chunk];
    loop {
        let (produced, applied) = deflater
            .set_params(level, Strategy::Default, &mut out)
            .unwrap();
        written.extend_from_slice(&out[..produced]);
        if applied {
            return written;
        }
    }
}

#[test]
fn test_set_params_without_output_space() {
    let data = common::mixed(60_003, 39);
    let (first, second) = data.split_at(20_001);

    // Stored, greedy and lazy block functions in every pairing.
    let switches = [(0u8, 1u8), (0, 9), (1, 0), (1, 9), (9, 0), (9, 1)];
    for (from, to) in switches {
        let mut deflater = Deflater::new(from);
        let mut compressed = step(&mut deflater, first, Flush::None);

        let err = deflater
            .set_params(to, Strategy::Default, &mut [])
            .unwrap_err();
        assert_eq!(err, OxiflateError::Buffer, "{from} -> {to}");
        assert_eq!(deflater.level(), from, "{from} -> {to}");

        compressed.extend(set_params_in_chunks(&mut deflater, to, 7));
        assert_eq!(deflater.level(), to, "{from} -> {to}");

        compressed.extend(step(&mut deflater, second, Flush::Finish));
        assert_eq!(zlib_decompress(&compressed).unwrap(), data, "{from} -> {to}");
    }
}

#[test]
fn test_set_params_stored_to_lazy_after_empty_output() {
    let data = common::text(20_001, 40);
    let mut deflater = Deflater::new(0);
    let mut compressed = step(&mut deflater, &data, Flush::None);

    assert!(matches!(
        deflater.set_params(9, Strategy::Default, &mut []),
        Err(OxiflateError::Buffer)
    ));
    compressed.extend(set_params_in_chunks(&mut deflater, 9, 64 * 1024));
    compressed.extend(step(&mut deflater, &[], Flush::Finish));

    let mut inflater = Inflater::new();
    assert_eq!(inflater.decompress_all(&compressed).unwrap(), data);
}

#[test]
fn test_set_params_after_partial_flush_needs_no_output() {
    let data = common::text(5_000, 41);
    let mut deflater = Deflater::new(0);
    let mut compressed = step(&mut deflater, &data, Flush::Partial);

    // Everything consumed is already in a block.
    assert_eq!(
        deflater.set_params(6, Strategy::Default, &mut []).unwrap(),
        (0, true)
    );
    compressed.extend(step(&mut deflater, &data, Flush::Finish));
    assert_eq!(zlib_decompress(&compressed).unwrap(), data.repeat(2));
}
