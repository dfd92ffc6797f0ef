//! Huffman encode-tree construction and block emission.
//!
//! For every block the compressor accumulates literal/length and distance
//! symbols, then builds length-limited Huffman trees for both alphabets plus
//! a third tree for the bit-length alphabet that describes the first two.
//! The cost of a dynamic block is compared with a fixed-code block and a
//! stored block, and the cheapest is emitted.
//!
//! Tree construction uses an array-backed binary heap keyed by frequency,
//! with subtree depth as tiebreak. Lengths above the limit are repaired by
//! moving overflowed leaves down the tree, after which canonical codes are
//! assigned and bit-reversed for LSB-first output.

use crate::bits::PendingBuf;
use crate::tables::{
    BASE_DIST, BASE_LENGTH, BL_CODES, BL_ORDER, D_CODES, DYN_TREES, END_BLOCK, EXTRA_BLBITS,
    EXTRA_DBITS, EXTRA_LBITS, HEAP_SIZE, L_CODES, LENGTH_CODE, LITERALS, MAX_BITS, MAX_BL_BITS,
    REP_3_6, REPZ_3_10, REPZ_11_138, STATIC_TREES, STORED_BLOCK, d_code, fixed_distance_lengths,
    fixed_litlen_lengths,
};
use oxiflate_core::error::{OxiflateError, Result};

/// One node of a Huffman tree.
///
/// Leaves use `freq`, `code` and `len`; `dad` links a node to its parent
/// while lengths are being generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TreeNode {
    pub(crate) freq: u32,
    pub(crate) code: u16,
    pub(crate) dad: u16,
    pub(crate) len: u16,
}

impl TreeNode {
    const ZERO: Self = Self {
        freq: 0,
        code: 0,
        dad: 0,
        len: 0,
    };
}

/// Reverse the low `len` bits of `code` (`len` in 1..=15).
#[inline]
pub(crate) const fn bi_reverse(code: u32, len: u32) -> u32 {
    code.reverse_bits() >> (32 - len)
}

/// Assign canonical codes to a set of lengths at compile time.
const fn canonical_tree<const N: usize>(lengths: [u8; N]) -> [TreeNode; N] {
    let mut bl_count = [0u16; MAX_BITS + 1];
    let mut n = 0;
    while n < N {
        bl_count[lengths[n] as usize] += 1;
        n += 1;
    }

    let mut next_code = [0u32; MAX_BITS + 1];
    let mut code = 0u32;
    let mut bits = 1;
    while bits <= MAX_BITS {
        code = (code + bl_count[bits - 1] as u32) << 1;
        next_code[bits] = code;
        bits += 1;
    }

    let mut tree = [TreeNode::ZERO; N];
    let mut n = 0;
    while n < N {
        let len = lengths[n] as usize;
        tree[n].len = len as u16;
        if len != 0 {
            tree[n].code = bi_reverse(next_code[len], len as u32) as u16;
            next_code[len] += 1;
        }
        n += 1;
    }
    tree
}

/// The fixed literal/length tree; codes 286 and 287 complete the code space.
pub(crate) const STATIC_LTREE: [TreeNode; L_CODES + 2] = canonical_tree(fixed_litlen_lengths());

/// The fixed distance tree.
pub(crate) const STATIC_DTREE: [TreeNode; D_CODES] = canonical_tree(fixed_distance_lengths());

/// Static parameters of one alphabet.
#[derive(Debug)]
pub(crate) struct StaticTreeDesc<'a> {
    /// Fixed tree used to cost the block, if the alphabet has one.
    static_tree: Option<&'a [TreeNode]>,
    /// Extra bits for each code past `extra_base`.
    extra_bits: &'a [u8],
    /// First code carrying extra bits.
    extra_base: usize,
    /// Number of leaves.
    elems: usize,
    /// Longest permitted code.
    max_length: usize,
}

static STATIC_L_DESC: StaticTreeDesc<'static> = StaticTreeDesc {
    static_tree: Some(&STATIC_LTREE),
    extra_bits: &EXTRA_LBITS,
    extra_base: LITERALS + 1,
    elems: L_CODES,
    max_length: MAX_BITS,
};

static STATIC_D_DESC: StaticTreeDesc<'static> = StaticTreeDesc {
    static_tree: Some(&STATIC_DTREE),
    extra_bits: &EXTRA_DBITS,
    extra_base: 0,
    elems: D_CODES,
    max_length: MAX_BITS,
};

static STATIC_BL_DESC: StaticTreeDesc<'static> = StaticTreeDesc {
    static_tree: None,
    extra_bits: &EXTRA_BLBITS,
    extra_base: 0,
    elems: BL_CODES,
    max_length: MAX_BL_BITS,
};

/// Index of the smallest element in the heap.
const SMALLEST: usize = 1;

/// Scratch space for building one tree at a time.
#[derive(Debug)]
struct TreeBuilder {
    /// Heap of node indices; `heap[0]` is unused.
    heap: [usize; HEAP_SIZE],
    heap_len: usize,
    /// Nodes from `heap_max` upward are sorted by decreasing frequency.
    heap_max: usize,
    /// Subtree depth, used as tiebreak between equal frequencies.
    depth: [u8; HEAP_SIZE],
    /// Number of codes at each bit length.
    bl_count: [u16; MAX_BITS + 1],
    /// Bit cost of the block with the trees being built.
    opt_len: u64,
    /// Bit cost of the block with the fixed trees.
    static_len: u64,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            heap: [0; HEAP_SIZE],
            heap_len: 0,
            heap_max: 0,
            depth: [0; HEAP_SIZE],
            bl_count: [0; MAX_BITS + 1],
            opt_len: 0,
            static_len: 0,
        }
    }

    #[inline]
    fn smaller(&self, tree: &[TreeNode], n: usize, m: usize) -> bool {
        tree[n].freq < tree[m].freq
            || (tree[n].freq == tree[m].freq && self.depth[n] <= self.depth[m])
    }

    /// Restore the heap property by moving down from node `k`.
    fn pqdownheap(&mut self, tree: &[TreeNode], mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1;
        while j <= self.heap_len {
            if j < self.heap_len && self.smaller(tree, self.heap[j + 1], self.heap[j]) {
                j += 1;
            }
            if self.smaller(tree, v, self.heap[j]) {
                break;
            }
            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }
        self.heap[k] = v;
    }

    /// Compute optimal lengths, bounded by `desc.max_length`, and update
    /// `opt_len`/`static_len`.
    fn gen_bitlen(&mut self, tree: &mut [TreeNode], max_code: usize, desc: &StaticTreeDesc<'_>) {
        let max_length = desc.max_length;
        self.bl_count = [0; MAX_BITS + 1];

        // The root has length zero; lengths then follow from parent to child.
        tree[self.heap[self.heap_max]].len = 0;

        let mut overflow = 0i32;
        let mut h = self.heap_max + 1;
        while h < HEAP_SIZE {
            let n = self.heap[h];
            let mut bits = tree[tree[n].dad as usize].len as usize + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            tree[n].len = bits as u16;

            h += 1;
            if n > max_code {
                continue;
            }

            self.bl_count[bits] += 1;
            let xbits = if n >= desc.extra_base {
                desc.extra_bits[n - desc.extra_base] as u64
            } else {
                0
            };
            let f = tree[n].freq as u64;
            self.opt_len = self.opt_len.wrapping_add(f * (bits as u64 + xbits));
            if let Some(stree) = desc.static_tree {
                self.static_len = self
                    .static_len
                    .wrapping_add(f * (stree[n].len as u64 + xbits));
            }
        }
        if overflow == 0 {
            return;
        }

        // Find the first bit length which could increase, move one leaf
        // from it down one level and pull one overflowed leaf up as sibling.
        loop {
            let mut bits = max_length - 1;
            while self.bl_count[bits] == 0 {
                bits -= 1;
            }
            self.bl_count[bits] -= 1;
            self.bl_count[bits + 1] += 2;
            self.bl_count[max_length] -= 1;
            overflow -= 2;
            if overflow <= 0 {
                break;
            }
        }

        // Reassign lengths to leaves in frequency order, longest first.
        let mut h = HEAP_SIZE;
        let mut bits = max_length;
        while bits != 0 {
            let mut n = self.bl_count[bits];
            while n != 0 {
                h -= 1;
                let m = self.heap[h];
                if m > max_code {
                    continue;
                }
                if tree[m].len as usize != bits {
                    let delta = (bits as i64 - tree[m].len as i64) * tree[m].freq as i64;
                    self.opt_len = self.opt_len.wrapping_add(delta as u64);
                    tree[m].len = bits as u16;
                }
                n -= 1;
            }
            bits -= 1;
        }
    }

    /// Build the Huffman tree for `tree[..desc.elems]` and assign codes.
    ///
    /// Returns the largest code with non-zero frequency.
    fn build_tree(&mut self, tree: &mut [TreeNode], desc: &StaticTreeDesc<'_>) -> usize {
        let elems = desc.elems;
        let mut max_code: isize = -1;

        self.heap_len = 0;
        self.heap_max = HEAP_SIZE;

        for n in 0..elems {
            if tree[n].freq != 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = n;
                max_code = n as isize;
                self.depth[n] = 0;
            } else {
                tree[n].len = 0;
            }
        }

        // At least two codes of non-zero frequency, so that even a single
        // used symbol gets one bit.
        while self.heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            self.heap_len += 1;
            self.heap[self.heap_len] = node;
            tree[node].freq = 1;
            self.depth[node] = 0;
            self.opt_len = self.opt_len.wrapping_sub(1);
            if let Some(stree) = desc.static_tree {
                self.static_len = self.static_len.wrapping_sub(stree[node].len as u64);
            }
        }
        let max_code = max_code as usize;

        for n in (1..=self.heap_len / 2).rev() {
            self.pqdownheap(tree, n);
        }

        // Repeatedly combine the two least frequent nodes.
        let mut node = elems;
        loop {
            let n = self.heap[SMALLEST];
            self.heap[SMALLEST] = self.heap[self.heap_len];
            self.heap_len -= 1;
            self.pqdownheap(tree, SMALLEST);

            let m = self.heap[SMALLEST];

            self.heap_max -= 1;
            self.heap[self.heap_max] = n;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m;

            tree[node].freq = tree[n].freq.saturating_add(tree[m].freq);
            self.depth[node] = self.depth[n].max(self.depth[m]) + 1;
            tree[n].dad = node as u16;
            tree[m].dad = node as u16;

            self.heap[SMALLEST] = node;
            node += 1;
            self.pqdownheap(tree, SMALLEST);

            if self.heap_len < 2 {
                break;
            }
        }

        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[SMALLEST];

        self.gen_bitlen(tree, max_code, desc);
        gen_codes(tree, max_code, &self.bl_count);
        max_code
    }
}

/// Assign bit-reversed canonical codes from the lengths in `tree`.
fn gen_codes(tree: &mut [TreeNode], max_code: usize, bl_count: &[u16; MAX_BITS + 1]) {
    let mut next_code = [0u32; MAX_BITS + 1];
    let mut code = 0u32;
    for bits in 1..=MAX_BITS {
        code = (code + bl_count[bits - 1] as u32) << 1;
        next_code[bits] = code;
    }

    for node in tree.iter_mut().take(max_code + 1) {
        let len = node.len as usize;
        if len == 0 {
            continue;
        }
        node.code = bi_reverse(next_code[len], len as u32) as u16;
        next_code[len] += 1;
    }
}

/// Walk the code lengths of `tree[..=max_code]` as the bit-length alphabet
/// sees them, calling `emit(symbol, extra_value, extra_bits)` for each
/// symbol: plain lengths 0-15, or the three repeat codes.
fn for_each_length_symbol(
    tree: &[TreeNode],
    max_code: usize,
    mut emit: impl FnMut(usize, u32, u32),
) {
    let mut prevlen: i32 = -1;
    let mut nextlen = tree[0].len as i32;
    let mut count = 0u32;
    let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

    for n in 0..=max_code {
        let curlen = nextlen;
        // Past the last code, a length no real code can have ends the run.
        nextlen = if n < max_code {
            tree[n + 1].len as i32
        } else {
            0xFFFF
        };
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        } else if count < min_count {
            for _ in 0..count {
                emit(curlen as usize, 0, 0);
            }
        } else if curlen != 0 {
            if curlen != prevlen {
                emit(curlen as usize, 0, 0);
                count -= 1;
            }
            emit(REP_3_6, count - 3, 2);
        } else if count <= 10 {
            emit(REPZ_3_10, count - 3, 3);
        } else {
            emit(REPZ_11_138, count - 11, 7);
        }

        count = 0;
        prevlen = curlen;
        (max_count, min_count) = if nextlen == 0 {
            (138, 3)
        } else if curlen == nextlen {
            (6, 3)
        } else {
            (7, 4)
        };
    }
}

/// Send one code of `tree`.
#[inline]
fn send_code(pending: &mut PendingBuf, symbol: usize, tree: &[TreeNode]) {
    pending.send_bits(tree[symbol].code as u32, tree[symbol].len as u32);
}

/// Emit buffered symbols with the given trees, then END_BLOCK.
///
/// Returns the bit length of the END_BLOCK code.
fn compress_block(
    pending: &mut PendingBuf,
    sym_lit: &[u8],
    sym_dist: &[u16],
    ltree: &[TreeNode],
    dtree: &[TreeNode],
) -> u32 {
    for (&lc, &dist) in sym_lit.iter().zip(sym_dist) {
        let lc = lc as usize;
        if dist == 0 {
            send_code(pending, lc, ltree);
            continue;
        }

        let code = LENGTH_CODE[lc] as usize;
        send_code(pending, code + LITERALS + 1, ltree);
        let extra = EXTRA_LBITS[code] as u32;
        if extra != 0 {
            pending.send_bits((lc - BASE_LENGTH[code] as usize) as u32, extra);
        }

        let dist = dist as usize - 1;
        let code = d_code(dist);
        send_code(pending, code, dtree);
        let extra = EXTRA_DBITS[code] as u32;
        if extra != 0 {
            pending.send_bits((dist - BASE_DIST[code] as usize) as u32, extra);
        }
    }
    send_code(pending, END_BLOCK, ltree);
    ltree[END_BLOCK].len as u32
}

/// Symbol buffers, trees and cost counters for the block being built.
#[derive(Debug)]
pub(crate) struct Trees {
    dyn_ltree: [TreeNode; HEAP_SIZE],
    dyn_dtree: [TreeNode; 2 * D_CODES + 1],
    bl_tree: [TreeNode; 2 * BL_CODES + 1],
    l_max_code: usize,
    d_max_code: usize,
    builder: TreeBuilder,
    /// Literal byte or normalized match length, per symbol.
    sym_lit: Vec<u8>,
    /// Match distance per symbol, 0 for literals.
    sym_dist: Vec<u16>,
    /// Number of symbols in the current block.
    last_lit: usize,
    lit_bufsize: usize,
    /// Number of matches in the current block.
    matches: usize,
    /// Bit length of the EOB code of the last block.
    last_eob_len: u32,
}

impl Trees {
    pub(crate) fn new(lit_bufsize: usize) -> Self {
        let mut trees = Self {
            dyn_ltree: [TreeNode::ZERO; HEAP_SIZE],
            dyn_dtree: [TreeNode::ZERO; 2 * D_CODES + 1],
            bl_tree: [TreeNode::ZERO; 2 * BL_CODES + 1],
            l_max_code: 0,
            d_max_code: 0,
            builder: TreeBuilder::new(),
            sym_lit: vec![0; lit_bufsize],
            sym_dist: vec![0; lit_bufsize],
            last_lit: 0,
            lit_bufsize,
            matches: 0,
            last_eob_len: 8,
        };
        trees.init_block();
        trees
    }

    /// Reset for a new stream.
    pub(crate) fn reset(&mut self) {
        self.last_eob_len = 8;
        self.init_block();
    }

    fn init_block(&mut self) {
        for node in &mut self.dyn_ltree[..L_CODES] {
            node.freq = 0;
        }
        for node in &mut self.dyn_dtree[..D_CODES] {
            node.freq = 0;
        }
        for node in &mut self.bl_tree[..BL_CODES] {
            node.freq = 0;
        }
        self.dyn_ltree[END_BLOCK].freq = 1;
        self.builder.opt_len = 0;
        self.builder.static_len = 0;
        self.last_lit = 0;
        self.matches = 0;
    }

    /// Number of symbols buffered for the current block.
    pub(crate) fn symbols(&self) -> usize {
        self.last_lit
    }

    /// Record a literal byte; returns true when the symbol buffer is full.
    #[inline]
    pub(crate) fn tally_lit(&mut self, c: u8) -> bool {
        self.sym_dist[self.last_lit] = 0;
        self.sym_lit[self.last_lit] = c;
        self.last_lit += 1;
        self.dyn_ltree[c as usize].freq += 1;
        self.last_lit == self.lit_bufsize - 1
    }

    /// Record a match of normalized length `lc` (length - 3) at `dist`;
    /// returns true when the symbol buffer is full.
    #[inline]
    pub(crate) fn tally_dist(&mut self, dist: usize, lc: usize) -> bool {
        self.sym_dist[self.last_lit] = dist as u16;
        self.sym_lit[self.last_lit] = lc as u8;
        self.last_lit += 1;
        self.matches += 1;
        self.dyn_ltree[LENGTH_CODE[lc] as usize + LITERALS + 1].freq += 1;
        self.dyn_dtree[d_code(dist - 1)].freq += 1;
        self.last_lit == self.lit_bufsize - 1
    }

    /// Whether the block so far compresses well enough that emitting it
    /// now is likely to pay off. `in_length` is the input size it covers.
    pub(crate) fn worth_truncating(&self, in_length: usize) -> bool {
        let mut out_length = self.last_lit as u64 * 8;
        for (dcode, node) in self.dyn_dtree[..D_CODES].iter().enumerate() {
            out_length += node.freq as u64 * (5 + EXTRA_DBITS[dcode] as u64);
        }
        out_length >>= 3;
        self.matches < self.last_lit / 2 && out_length < in_length as u64 / 2
    }

    /// Build the bit-length tree and return the index of the last
    /// bit-length code to send.
    fn build_bl_tree(&mut self) -> usize {
        let bl_tree = &mut self.bl_tree;
        for (tree, max_code) in [
            (&self.dyn_ltree[..], self.l_max_code),
            (&self.dyn_dtree[..], self.d_max_code),
        ] {
            for_each_length_symbol(tree, max_code, |symbol, _, _| {
                bl_tree[symbol].freq += 1;
            });
        }

        self.builder.build_tree(&mut self.bl_tree, &STATIC_BL_DESC);

        // Trailing zero bit-length codes in transmission order are not sent,
        // but at least four are.
        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3 {
            if self.bl_tree[BL_ORDER[max_blindex]].len != 0 {
                break;
            }
            max_blindex -= 1;
        }
        self.builder.opt_len = self
            .builder
            .opt_len
            .wrapping_add(3 * (max_blindex as u64 + 1) + 5 + 5 + 4);
        max_blindex
    }

    fn send_all_trees(
        &self,
        pending: &mut PendingBuf,
        lcodes: usize,
        dcodes: usize,
        blcodes: usize,
    ) {
        pending.send_bits((lcodes - 257) as u32, 5);
        pending.send_bits((dcodes - 1) as u32, 5);
        pending.send_bits((blcodes - 4) as u32, 4);
        for &symbol in BL_ORDER.iter().take(blcodes) {
            pending.send_bits(self.bl_tree[symbol].len as u32, 3);
        }
        for (tree, max_code) in [
            (&self.dyn_ltree[..], lcodes - 1),
            (&self.dyn_dtree[..], dcodes - 1),
        ] {
            for_each_length_symbol(tree, max_code, |symbol, extra, bits| {
                send_code(pending, symbol, &self.bl_tree);
                if bits != 0 {
                    pending.send_bits(extra, bits);
                }
            });
        }
    }

    /// Emit a stored block holding `buf`.
    pub(crate) fn stored_block(&mut self, pending: &mut PendingBuf, buf: &[u8], eof: bool) {
        pending.send_bits((STORED_BLOCK << 1) + eof as u32, 3);
        pending.bi_windup();
        self.last_eob_len = 8;
        let len = buf.len() as u16;
        pending.put_short(len);
        pending.put_short(!len);
        pending.put_bytes(buf);
    }

    /// Emit an empty fixed-code block so the decoder sees all bits of the
    /// previous block.
    pub(crate) fn align(&mut self, pending: &mut PendingBuf) {
        pending.send_bits(STATIC_TREES << 1, 3);
        send_code(pending, END_BLOCK, &STATIC_LTREE);
        pending.bi_flush();
        // An inflater reading 9 bits of lookahead needs the previous EOB plus
        // ten bits of this block; send a second empty block if short.
        if 1 + self.last_eob_len + 10 < pending.bits_valid() + 9 {
            pending.send_bits(STATIC_TREES << 1, 3);
            send_code(pending, END_BLOCK, &STATIC_LTREE);
            pending.bi_flush();
        }
        self.last_eob_len = 7;
    }

    /// Choose the cheapest encoding for the current block and emit it.
    ///
    /// `buf` holds the raw input the block covers when it is still in the
    /// window, which makes a stored block possible.
    pub(crate) fn flush_block(
        &mut self,
        pending: &mut PendingBuf,
        buf: Option<&[u8]>,
        stored_len: usize,
        eof: bool,
        level: u8,
    ) {
        let mut max_blindex = 0;
        let (opt_lenb, static_lenb);

        if level > 0 {
            self.l_max_code = self.builder.build_tree(&mut self.dyn_ltree, &STATIC_L_DESC);
            self.d_max_code = self.builder.build_tree(&mut self.dyn_dtree, &STATIC_D_DESC);
            max_blindex = self.build_bl_tree();

            let opt = (self.builder.opt_len + 3 + 7) >> 3;
            let stat = (self.builder.static_len + 3 + 7) >> 3;
            static_lenb = stat;
            opt_lenb = opt.min(stat);
        } else {
            opt_lenb = stored_len as u64 + 5;
            static_lenb = opt_lenb;
        }

        tracing::trace!(
            stored_len,
            opt_lenb,
            static_lenb,
            symbols = self.last_lit,
            eof,
            "flushing block"
        );

        match buf {
            Some(buf) if stored_len as u64 + 4 <= opt_lenb => {
                self.stored_block(pending, &buf[..stored_len], eof);
            }
            _ if static_lenb == opt_lenb => {
                pending.send_bits((STATIC_TREES << 1) + eof as u32, 3);
                self.last_eob_len = compress_block(
                    pending,
                    &self.sym_lit[..self.last_lit],
                    &self.sym_dist[..self.last_lit],
                    &STATIC_LTREE,
                    &STATIC_DTREE,
                );
            }
            _ => {
                pending.send_bits((DYN_TREES << 1) + eof as u32, 3);
                self.send_all_trees(
                    pending,
                    self.l_max_code + 1,
                    self.d_max_code + 1,
                    max_blindex + 1,
                );
                self.last_eob_len = compress_block(
                    pending,
                    &self.sym_lit[..self.last_lit],
                    &self.sym_dist[..self.last_lit],
                    &self.dyn_ltree,
                    &self.dyn_dtree,
                );
            }
        }

        self.init_block();
        if eof {
            pending.bi_windup();
        }
    }
}

/// Build a length-limited Huffman code for `freqs`.
///
/// Returns `(length, code)` per symbol; codes are bit-reversed for LSB-first
/// output and unused symbols get length 0. Fewer than two used symbols are
/// padded so every used symbol gets at least one bit.
pub fn build_huffman_code(freqs: &[u32], max_length: usize) -> Result<Vec<(u16, u16)>> {
    if freqs.is_empty() || freqs.len() > L_CODES {
        return Err(OxiflateError::stream(format!(
            "alphabet size {} outside 1..={}",
            freqs.len(),
            L_CODES
        )));
    }
    if max_length == 0 || max_length > MAX_BITS || (1usize << max_length) < freqs.len() {
        return Err(OxiflateError::stream(format!(
            "maximum code length {} cannot cover {} symbols",
            max_length,
            freqs.len()
        )));
    }

    let mut tree = [TreeNode::ZERO; HEAP_SIZE];
    for (node, &freq) in tree.iter_mut().zip(freqs) {
        node.freq = freq;
    }
    let desc = StaticTreeDesc {
        static_tree: None,
        extra_bits: &[],
        extra_base: freqs.len(),
        elems: freqs.len(),
        max_length,
    };

    let mut builder = TreeBuilder::new();
    builder.build_tree(&mut tree, &desc);
    Ok(tree[..freqs.len()]
        .iter()
        .map(|node| (node.len, if node.len == 0 { 0 } else { node.code }))
        .collect())
}

/// Run-length encode a code-length sequence with the bit-length alphabet.
///
/// Returns `(symbol, extra_value, extra_bits)` triples where symbols 0-15
/// are literal lengths, 16 repeats the previous length 3-6 times, 17 repeats
/// zero 3-10 times, and 18 repeats zero 11-138 times.
pub fn encode_code_lengths(lengths: &[u8]) -> Vec<(u8, u8, u8)> {
    if lengths.is_empty() {
        return Vec::new();
    }
    let tree: Vec<TreeNode> = lengths
        .iter()
        .map(|&len| TreeNode {
            len: len as u16,
            ..TreeNode::ZERO
        })
        .collect();
    let mut out = Vec::new();
    for_each_length_symbol(&tree, lengths.len() - 1, |symbol, extra, bits| {
        out.push((symbol as u8, extra as u8, bits as u8));
    });
    out
}
