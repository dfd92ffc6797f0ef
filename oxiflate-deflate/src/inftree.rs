//! Multi-level Huffman decoding tables.
//!
//! A table is indexed by the next `root_bits` bits of input (LSB first).
//! Each [`Code`] entry says how many bits the code used and what it
//! decodes to. Codes longer than the root width land on a link entry,
//! which points to a sub-table indexed by the following bits.
//!
//! The `op` byte of an entry encodes its kind:
//!
//! | `op`              | meaning                                             |
//! |-------------------|-----------------------------------------------------|
//! | `0`               | literal byte `val`                                  |
//! | `16 + 64 + e`     | length or distance base `val` with `e` extra bits   |
//! | `1..=15`          | link: sub-table of `op` bits at `index + val`      |
//! | `32 + 64`         | end of block                                        |
//! | `128 + 64` (etc.) | invalid code                                        |
//!
//! Tables for one dynamic block may not exceed [`MANY`] entries in total.

use std::sync::OnceLock;

use oxiflate_core::error::{OxiflateError, Result};

use crate::tables::{
    DIST_BASE, DIST_EXTRA, LENGTH_BASE, LENGTH_EXTRA, fixed_distance_lengths, fixed_litlen_lengths,
};

/// Longest code length.
const BMAX: usize = 15;

/// Upper bound on table entries for one dynamic block.
pub(crate) const MANY: usize = 1440;

/// Root width of the literal/length table.
const LITLEN_ROOT_BITS: u8 = 9;

/// Root width of the distance table.
const DIST_ROOT_BITS: u8 = 6;

/// Root width of the bit-length table.
const BIT_LENGTH_ROOT_BITS: u8 = 7;

/// Fixed-table root widths.
const FIXED_LITLEN_BITS: u8 = 9;
const FIXED_DIST_BITS: u8 = 5;

const OP_BASE: u8 = 16;
const OP_END: u8 = 32;
const OP_TERMINAL: u8 = 64;
const OP_INVALID: u8 = 128 + OP_TERMINAL;

/// One decoding-table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Code {
    /// Kind of entry; see the module docs.
    pub(crate) op: u8,
    /// Bits consumed by this entry.
    pub(crate) bits: u8,
    /// Literal, base value, or sub-table offset.
    pub(crate) val: u16,
}

impl Code {
    /// Entry returned for an index outside the table.
    pub(crate) const INVALID: Code = Code {
        op: OP_INVALID,
        bits: 0,
        val: 0,
    };

    #[inline]
    pub(crate) fn is_literal(&self) -> bool {
        self.op == 0
    }

    /// Length or distance base; see [`Self::extra_bits`].
    #[inline]
    pub(crate) fn is_base(&self) -> bool {
        self.op & OP_BASE != 0
    }

    #[inline]
    pub(crate) fn extra_bits(&self) -> u32 {
        (self.op & 15) as u32
    }

    /// Link to a sub-table of `op` bits starting `val` entries further on.
    #[inline]
    pub(crate) fn is_link(&self) -> bool {
        self.op & OP_TERMINAL == 0
    }

    #[inline]
    pub(crate) fn is_end_of_block(&self) -> bool {
        self.op & OP_END != 0
    }
}

/// A decoding table: the root table followed by its sub-tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct HuffmanTable {
    pub(crate) codes: Vec<Code>,
    pub(crate) root_bits: u8,
}

/// Why a code-length set could not be turned into a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TableError {
    /// More codes than the lengths allow, or the entry budget was exceeded.
    Oversubscribed,
    /// Lengths leave part of the code space unused. The table is still
    /// built; unused patterns decode as invalid.
    Incomplete(HuffmanTable),
}

/// Build a decoding table from code lengths.
///
/// Symbols below `simple` decode to themselves (256 is end of block);
/// the rest map through `base`/`extra`. `root_bits` is the preferred root
/// width, clamped to the shortest and longest code. `used` counts entries
/// across the tables of one block.
///
/// An all-zero length set yields an empty table with `root_bits == 0`.
pub(crate) fn build_table(
    lengths: &[u8],
    simple: usize,
    base: &[u16],
    extra: &[u8],
    root_bits: u8,
    used: &mut usize,
) -> std::result::Result<HuffmanTable, TableError> {
    let n = lengths.len();
    let mut count = [0usize; BMAX + 1];
    for &len in lengths {
        count[len as usize] += 1;
    }
    if count[0] == n {
        return Ok(HuffmanTable::default());
    }

    // Clamp the root width to the code-length range.
    let mut l = root_bits as usize;
    let mut j = (1..=BMAX).find(|&len| count[len] != 0).unwrap_or(BMAX);
    let min_len = j;
    l = l.max(j);
    let max_len = (1..=BMAX).rev().find(|&len| count[len] != 0).unwrap_or(1);
    l = l.min(max_len);

    // Count unused code patterns; pad the longest length with dummies.
    let mut dummies: isize = 1 << j;
    while j < max_len {
        dummies -= count[j] as isize;
        if dummies < 0 {
            return Err(TableError::Oversubscribed);
        }
        j += 1;
        dummies <<= 1;
    }
    dummies -= count[max_len] as isize;
    if dummies < 0 {
        return Err(TableError::Oversubscribed);
    }
    count[max_len] += dummies as usize;

    // Symbols sorted by code length, then by value.
    let mut offsets = [0usize; BMAX + 1];
    for len in 1..max_len {
        offsets[len + 1] = offsets[len] + count[len];
    }
    let mut values = vec![0u16; n];
    for (symbol, &len) in lengths.iter().enumerate() {
        if len != 0 {
            values[offsets[len as usize]] = symbol as u16;
            offsets[len as usize] += 1;
        }
    }
    let n_values = offsets[max_len];

    let mut table = HuffmanTable {
        codes: Vec::new(),
        root_bits: l as u8,
    };
    // Start of each table level, and the code prefix each one covers.
    let mut starts = [0usize; BMAX];
    let mut prefixes = [0usize; BMAX + 1];
    let mut code = 0usize;
    let mut p = 0usize;
    let mut h: isize = -1;
    let mut w: isize = -(l as isize);
    let mut q = 0usize;
    let mut z = 0usize;
    // Entry template; fields not rewritten carry over between uses.
    let mut r = Code::default();

    for k in min_len..=max_len {
        let mut a = count[k];
        while a > 0 {
            a -= 1;

            // Open tables until this code's length fits.
            while k as isize > w + l as isize {
                h += 1;
                w += l as isize;
                let wu = w as usize;

                // Smallest table that the remaining codes fill, up to l bits.
                z = (max_len - wu).min(l);
                let mut tbits = k - wu;
                let mut f = 1usize << tbits;
                if f > a + 1 && tbits < z {
                    f -= a + 1;
                    let mut xp = k;
                    loop {
                        tbits += 1;
                        if tbits >= z {
                            break;
                        }
                        xp += 1;
                        f <<= 1;
                        if f <= count[xp] {
                            break;
                        }
                        f -= count[xp];
                    }
                }
                z = 1 << tbits;

                if *used + z > MANY {
                    return Err(TableError::Oversubscribed);
                }
                q = table.codes.len();
                table.codes.resize(q + z, Code::default());
                *used += z;
                let hu = h as usize;
                starts[hu] = q;

                if hu > 0 {
                    prefixes[hu] = code;
                    r.bits = l as u8;
                    r.op = tbits as u8;
                    let index = code >> (wu - l);
                    r.val = (q - starts[hu - 1] - index) as u16;
                    table.codes[starts[hu - 1] + index] = r;
                }
            }

            let wu = w as usize;
            r.bits = (k - wu) as u8;
            if p >= n_values {
                r.op = OP_INVALID;
            } else if (values[p] as usize) < simple {
                r.op = if values[p] < 256 { 0 } else { OP_END + OP_TERMINAL };
                r.val = values[p];
                p += 1;
            } else {
                let index = values[p] as usize - simple;
                r.op = extra[index] + OP_BASE + OP_TERMINAL;
                r.val = base[index];
                p += 1;
            }

            // Replicate the entry over every index sharing its low bits.
            let step = 1usize << (k - wu);
            let mut index = code >> wu;
            while index < z {
                table.codes[q + index] = r;
                index += step;
            }

            // Increment the bit-reversed code.
            let mut bit = 1usize << (k - 1);
            while code & bit != 0 {
                code ^= bit;
                bit >>= 1;
            }
            code ^= bit;

            // Close tables this code has finished.
            while h >= 0 && code & ((1usize << w) - 1) != prefixes[h as usize] {
                h -= 1;
                w -= l as isize;
            }
        }
    }

    if dummies != 0 && max_len != 1 {
        return Err(TableError::Incomplete(table));
    }
    Ok(table)
}

/// Build the table for the 19-symbol code-length alphabet.
pub(crate) fn build_bit_length_table(lengths: &[u8; 19]) -> Result<HuffmanTable> {
    let mut used = 0;
    match build_table(lengths, 19, &[], &[], BIT_LENGTH_ROOT_BITS, &mut used) {
        Ok(table) if table.root_bits != 0 => Ok(table),
        Err(TableError::Oversubscribed) => Err(OxiflateError::data(
            "oversubscribed dynamic bit lengths tree",
        )),
        _ => Err(OxiflateError::data("incomplete dynamic bit lengths tree")),
    }
}

/// Build the literal/length and distance tables of a dynamic block.
///
/// `lengths` holds `nlen` literal/length code lengths followed by the
/// distance code lengths.
pub(crate) fn build_dynamic_tables(
    lengths: &[u8],
    nlen: usize,
) -> Result<(HuffmanTable, HuffmanTable)> {
    let (lit_lengths, dist_lengths) = lengths.split_at(nlen);
    let mut used = 0;

    let litlen = match build_table(
        lit_lengths,
        257,
        &LENGTH_BASE,
        &LENGTH_EXTRA,
        LITLEN_ROOT_BITS,
        &mut used,
    ) {
        Ok(table) if table.root_bits != 0 => table,
        Err(TableError::Oversubscribed) => {
            return Err(OxiflateError::data("oversubscribed literal/length tree"));
        }
        _ => return Err(OxiflateError::data("incomplete literal/length tree")),
    };

    let dist = match build_table(
        dist_lengths,
        0,
        &DIST_BASE,
        &DIST_EXTRA,
        DIST_ROOT_BITS,
        &mut used,
    ) {
        Ok(table) if table.root_bits == 0 && nlen > 257 => {
            return Err(OxiflateError::data("empty distance tree with lengths"));
        }
        Ok(table) => table,
        Err(TableError::Oversubscribed) => {
            return Err(OxiflateError::data("oversubscribed distance tree"));
        }
        Err(TableError::Incomplete(_)) => {
            return Err(OxiflateError::data("incomplete distance tree"));
        }
    };

    Ok((litlen, dist))
}

/// Tables for fixed-code blocks, built on first use.
pub(crate) fn fixed_tables() -> &'static (HuffmanTable, HuffmanTable) {
    static FIXED: OnceLock<(HuffmanTable, HuffmanTable)> = OnceLock::new();
    FIXED.get_or_init(|| {
        let mut used = 0;
        let litlen = build_table(
            &fixed_litlen_lengths(),
            257,
            &LENGTH_BASE,
            &LENGTH_EXTRA,
            FIXED_LITLEN_BITS,
            &mut used,
        )
        .unwrap_or_default();

        // The fixed distance code uses 30 of 32 five-bit patterns; the two
        // unused ones decode as invalid.
        let mut used = 0;
        let dist = match build_table(
            &fixed_distance_lengths(),
            0,
            &DIST_BASE,
            &DIST_EXTRA,
            FIXED_DIST_BITS,
            &mut used,
        ) {
            Ok(table) | Err(TableError::Incomplete(table)) => table,
            Err(TableError::Oversubscribed) => HuffmanTable::default(),
        };
        (litlen, dist)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Root-table index for the low bits of `bits`.
    fn root_index(table: &HuffmanTable, bits: u64) -> usize {
        (bits & ((1u64 << table.root_bits) - 1)) as usize
    }

    /// Decode one symbol from an LSB-first bit string.
    fn lookup(table: &HuffmanTable, bits: u64) -> Code {
        let mut index = root_index(table, bits);
        let mut entry = table.codes[index];
        let mut bits = bits;
        while !entry.is_literal() && !entry.is_base() && entry.is_link() {
            bits >>= entry.bits;
            index = index + entry.val as usize + (bits & ((1 << entry.op) - 1)) as usize;
            entry = table.codes[index];
        }
        entry
    }

    #[test]
    fn test_fixed_litlen_table() {
        let (litlen, _) = fixed_tables();
        assert_eq!(litlen.root_bits, 9);
        assert_eq!(litlen.codes.len(), 512);

        // End of block is the 7-bit code 0000000.
        let eob = lookup(litlen, 0);
        assert!(eob.is_end_of_block());
        assert_eq!(eob.bits, 7);

        // Literal 0 is the 8-bit code 00110000, sent MSB first.
        let bits = crate::trees::bi_reverse(0b0011_0000, 8) as u64;
        let lit = lookup(litlen, bits);
        assert!(lit.is_literal());
        assert_eq!((lit.val, lit.bits), (0, 8));

        // Symbol 257 (length 3) is the 7-bit code 0000001.
        let bits = crate::trees::bi_reverse(1, 7) as u64;
        let len = lookup(litlen, bits);
        assert!(len.is_base());
        assert_eq!((len.val, len.extra_bits(), len.bits), (3, 0, 7));
    }

    #[test]
    fn test_fixed_distance_table() {
        let (_, dist) = fixed_tables();
        assert_eq!(dist.root_bits, 5);
        assert_eq!(dist.codes.len(), 32);

        let code = lookup(dist, crate::trees::bi_reverse(29, 5) as u64);
        assert!(code.is_base());
        assert_eq!((code.val, code.extra_bits()), (24577, 13));

        // Codes 30 and 31 are invalid.
        let code = lookup(dist, crate::trees::bi_reverse(30, 5) as u64);
        assert!(!code.is_base() && !code.is_link() && !code.is_end_of_block());
    }

    #[test]
    fn test_sub_tables() {
        // Lengths up to 10 bits with a 9-bit root need a second level.
        let mut lengths = vec![0u8; 288];
        // Kraft-complete: 1 x 1 bit, 1 x 2 bits, ..., 2 x 10 bits.
        for (symbol, len) in (1..=10u8).enumerate() {
            lengths[symbol] = len;
        }
        lengths[10] = 10;
        let mut used = 0;
        let table = build_table(&lengths, 257, &LENGTH_BASE, &LENGTH_EXTRA, 9, &mut used).unwrap();
        assert_eq!(table.root_bits, 9);
        assert_eq!(table.codes.len(), 512 + 2);
        assert_eq!(used, 514);

        // The two 10-bit codes are 1111111110 and 1111111111 (MSB first).
        let first = lookup(&table, crate::trees::bi_reverse(0b11_1111_1110, 10) as u64);
        let second = lookup(&table, crate::trees::bi_reverse(0b11_1111_1111, 10) as u64);
        assert_eq!((first.val, second.val), (9, 10));
        assert_eq!(first.bits, 1);
    }

    #[test]
    fn test_oversubscribed() {
        let lengths = [1u8, 1, 1];
        let mut used = 0;
        assert_eq!(
            build_table(&lengths, 19, &[], &[], 7, &mut used),
            Err(TableError::Oversubscribed)
        );
    }

    #[test]
    fn test_incomplete() {
        let lengths = [2u8, 2, 2, 0];
        let mut used = 0;
        assert!(matches!(
            build_table(&lengths, 19, &[], &[], 7, &mut used),
            Err(TableError::Incomplete(_))
        ));
    }

    #[test]
    fn test_single_one_bit_code_allowed() {
        let mut lengths = [0u8; 19];
        lengths[4] = 1;
        let mut used = 0;
        let table = build_table(&lengths, 19, &[], &[], 7, &mut used).unwrap();
        assert_eq!(table.root_bits, 1);
        assert_eq!(table.codes[0].val, 4);
        // The unused pattern decodes as invalid.
        assert_eq!(table.codes[1].op, OP_INVALID);
    }

    #[test]
    fn test_empty_lengths() {
        let mut used = 0;
        let table = build_table(&[0u8; 30], 0, &DIST_BASE, &DIST_EXTRA, 6, &mut used).unwrap();
        assert_eq!(table.root_bits, 0);
        assert!(table.codes.is_empty());
    }

    #[test]
    fn test_dynamic_table_errors() {
        // Literal/length lengths: only EOB, which is incomplete.
        let mut lengths = vec![0u8; 258];
        lengths[256] = 2;
        let err = build_dynamic_tables(&lengths, 257).unwrap_err();
        assert_eq!(err, OxiflateError::data("incomplete literal/length tree"));

        // A length code present but no distance codes.
        let mut lengths = vec![0u8; 259];
        lengths[0] = 1;
        lengths[257] = 1;
        let err = build_dynamic_tables(&lengths, 258).unwrap_err();
        assert_eq!(err, OxiflateError::data("empty distance tree with lengths"));

        // Oversubscribed distance tree.
        let mut lengths = vec![0u8; 260];
        lengths[0] = 1;
        lengths[256] = 1;
        lengths[257] = 1;
        lengths[258] = 1;
        lengths[259] = 1;
        let err = build_dynamic_tables(&lengths, 257).unwrap_err();
        assert_eq!(err, OxiflateError::data("oversubscribed distance tree"));
    }

    #[test]
    fn test_bit_length_table() {
        let mut lengths = [0u8; 19];
        lengths[0] = 1;
        lengths[18] = 1;
        let table = build_bit_length_table(&lengths).unwrap();
        assert_eq!(table.root_bits, 1);

        let err = build_bit_length_table(&[0u8; 19]).unwrap_err();
        assert_eq!(err, OxiflateError::data("incomplete dynamic bit lengths tree"));
    }
}
