//! Constant tables for DEFLATE (RFC 1951).
//!
//! The length/distance base values and extra-bit counts are part of the wire
//! format. The bucketing tables (`LENGTH_CODE`, `DIST_CODE`) are derived from
//! them at compile time and map a match length or distance to its code.

/// Maximum code length for literal/length and distance codes.
pub const MAX_BITS: usize = 15;

/// Maximum code length for the bit-length alphabet.
pub const MAX_BL_BITS: usize = 7;

/// Number of length codes, not counting the special END_BLOCK code.
pub const LENGTH_CODES: usize = 29;

/// Number of literal bytes 0..255.
pub const LITERALS: usize = 256;

/// Number of literal/length codes, including END_BLOCK.
pub const L_CODES: usize = LITERALS + 1 + LENGTH_CODES;

/// Number of distance codes.
pub const D_CODES: usize = 30;

/// Number of codes used to transfer the bit lengths.
pub const BL_CODES: usize = 19;

/// Maximum heap size.
pub const HEAP_SIZE: usize = 2 * L_CODES + 1;

/// End of block literal code.
pub const END_BLOCK: usize = 256;

/// Repeat previous bit length 3-6 times (2 bits of repeat count).
pub const REP_3_6: usize = 16;

/// Repeat a zero length 3-10 times (3 bits of repeat count).
pub const REPZ_3_10: usize = 17;

/// Repeat a zero length 11-138 times (7 bits of repeat count).
pub const REPZ_11_138: usize = 18;

/// Shortest match.
pub const MIN_MATCH: usize = 3;

/// Longest match.
pub const MAX_MATCH: usize = 258;

/// Block type: stored.
pub const STORED_BLOCK: u32 = 0;

/// Block type: fixed Huffman codes.
pub const STATIC_TREES: u32 = 1;

/// Block type: dynamic Huffman codes.
pub const DYN_TREES: u32 = 2;

/// Extra bits for each length code.
pub const EXTRA_LBITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Extra bits for each distance code.
pub const EXTRA_DBITS: [u8; D_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Extra bits for each bit-length code.
pub const EXTRA_BLBITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Order in which the bit-length code lengths are transmitted.
pub const BL_ORDER: [usize; BL_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Length base values for symbols 257..=287, as consumed by the inflater.
///
/// Symbols 286 and 287 never occur in valid data; their extra-bit entry
/// marks them invalid.
pub const LENGTH_BASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];

/// Extra bits for symbols 257..=287; 112 flags an invalid symbol.
pub const LENGTH_EXTRA: [u8; 31] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0, 112,
    112,
];

/// Distance base values for distance codes 0..=29.
pub const DIST_BASE: [u16; D_CODES] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits for distance codes 0..=29, as consumed by the inflater.
pub const DIST_EXTRA: [u8; D_CODES] = EXTRA_DBITS;

const fn build_length_tables() -> ([u8; 256], [u16; LENGTH_CODES]) {
    let mut length_code = [0u8; 256];
    let mut base_length = [0u16; LENGTH_CODES];
    let mut length = 0usize;
    let mut code = 0usize;
    while code < LENGTH_CODES - 1 {
        base_length[code] = length as u16;
        let mut n = 0;
        while n < (1 << EXTRA_LBITS[code]) {
            length_code[length] = code as u8;
            length += 1;
            n += 1;
        }
        code += 1;
    }
    // Match length 258 is coded as 285, overriding the 255 slot of code 284.
    length_code[length - 1] = code as u8;
    (length_code, base_length)
}

const fn build_dist_tables() -> ([u8; 512], [u16; D_CODES]) {
    let mut dist_code = [0u8; 512];
    let mut base_dist = [0u16; D_CODES];
    let mut dist = 0usize;
    let mut code = 0usize;
    while code < 16 {
        base_dist[code] = dist as u16;
        let mut n = 0;
        while n < (1 << EXTRA_DBITS[code]) {
            dist_code[dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }
    // From here on, all distances are divided by 128.
    dist >>= 7;
    while code < D_CODES {
        base_dist[code] = (dist << 7) as u16;
        let mut n = 0;
        while n < (1 << (EXTRA_DBITS[code] - 7)) {
            dist_code[256 + dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }
    (dist_code, base_dist)
}

const LENGTH_TABLES: ([u8; 256], [u16; LENGTH_CODES]) = build_length_tables();
const DIST_TABLES: ([u8; 512], [u16; D_CODES]) = build_dist_tables();

/// Length code for each normalized match length (`length - MIN_MATCH`).
pub const LENGTH_CODE: [u8; 256] = LENGTH_TABLES.0;

/// First normalized length for each length code.
pub const BASE_LENGTH: [u16; LENGTH_CODES] = LENGTH_TABLES.1;

/// Distance codes: the first 256 entries map distances 0..255 directly,
/// the last 256 map `distance >> 7` for longer distances.
pub const DIST_CODE: [u8; 512] = DIST_TABLES.0;

/// First normalized distance for each distance code.
pub const BASE_DIST: [u16; D_CODES] = DIST_TABLES.1;

/// Map a normalized distance (`distance - 1`, 0..32767) to its code.
#[inline]
pub fn d_code(dist: usize) -> usize {
    if dist < 256 {
        DIST_CODE[dist] as usize
    } else {
        DIST_CODE[256 + (dist >> 7)] as usize
    }
}

/// Fixed literal/length code lengths (RFC 1951 Section 3.2.6).
///
/// - Symbols 0-143: 8 bits
/// - Symbols 144-255: 9 bits
/// - Symbols 256-279: 7 bits
/// - Symbols 280-287: 8 bits
pub const fn fixed_litlen_lengths() -> [u8; 288] {
    let mut lengths = [0u8; 288];
    let mut n = 0;
    while n < 288 {
        lengths[n] = match n {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
        n += 1;
    }
    lengths
}

/// Fixed distance code lengths: all 30 distance codes use 5 bits.
pub const fn fixed_distance_lengths() -> [u8; D_CODES] {
    [5u8; D_CODES]
}
