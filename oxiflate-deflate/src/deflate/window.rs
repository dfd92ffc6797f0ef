//! Sliding window, hash chains and longest-match search.
//!
//! The window holds `2 * w_size` bytes. Input is appended at
//! `strstart + lookahead`; when `strstart` gets within `MIN_LOOKAHEAD` of the
//! end, the upper half is moved down and every hash-chain link is rebased by
//! `w_size` (links that fall off the bottom become [`NIL`]).
//!
//! Strings of [`MIN_MATCH`] bytes are hashed into `head`, and `prev` links
//! each window position to the previous one with the same hash. Links are
//! never followed further back than `max_dist()` bytes.

use oxiflate_core::adler32::Adler32;

use crate::buffers::StreamBuffers;
use crate::config::LevelParams;
use crate::tables::{MAX_MATCH, MIN_MATCH};

/// End of a hash chain. Position 0 is never a usable match start.
pub(crate) const NIL: usize = 0;

/// Minimum lookahead, except at the end of the input.
pub(crate) const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Matches of length 3 are discarded if their distance exceeds this.
pub(crate) const TOO_FAR: usize = 4096;

/// Zeroed slack past the window end, so match probes near the end of the
/// buffer stay in bounds. Slack bytes never count towards a match because
/// match lengths are clamped to `lookahead`.
const WINDOW_SLACK: usize = MIN_LOOKAHEAD;

#[derive(Debug)]
pub(crate) struct Window {
    pub(crate) w_bits: u8,
    pub(crate) w_size: usize,
    w_mask: usize,
    /// Usable window size: `2 * w_size`.
    window_size: usize,
    pub(crate) window: Vec<u8>,
    /// Previous position with the same hash, indexed by `pos & w_mask`.
    prev: Vec<u16>,
    /// Most recent position for each hash value.
    head: Vec<u16>,
    ins_h: usize,
    hash_mask: usize,
    hash_shift: u32,

    /// Start of the string to insert.
    pub(crate) strstart: usize,
    /// Window position where the current block starts. Goes negative when
    /// the block start has been slid out of the window.
    pub(crate) block_start: isize,
    /// Valid bytes ahead of `strstart`.
    pub(crate) lookahead: usize,
    pub(crate) match_start: usize,
    pub(crate) match_length: usize,
    pub(crate) prev_match: usize,
    pub(crate) prev_length: usize,
    pub(crate) match_available: bool,

    pub(crate) max_chain_length: usize,
    pub(crate) max_lazy_match: usize,
    pub(crate) good_match: usize,
    pub(crate) nice_match: usize,
}

impl Window {
    pub(crate) fn new(w_bits: u8, mem_level: u8, params: &LevelParams) -> Self {
        let w_size = 1usize << w_bits;
        let hash_bits = mem_level as u32 + 7;
        let hash_size = 1usize << hash_bits;
        let mut window = Self {
            w_bits,
            w_size,
            w_mask: w_size - 1,
            window_size: 2 * w_size,
            window: vec![0; 2 * w_size + WINDOW_SLACK],
            prev: vec![0; w_size],
            head: vec![0; hash_size],
            ins_h: 0,
            hash_mask: hash_size - 1,
            hash_shift: hash_bits.div_ceil(MIN_MATCH as u32),
            strstart: 0,
            block_start: 0,
            lookahead: 0,
            match_start: 0,
            match_length: MIN_MATCH - 1,
            prev_match: 0,
            prev_length: MIN_MATCH - 1,
            match_available: false,
            max_chain_length: 0,
            max_lazy_match: 0,
            good_match: 0,
            nice_match: 0,
        };
        window.set_params(params);
        window
    }

    /// Forget all input, keeping the allocation.
    pub(crate) fn reset(&mut self) {
        self.clear_hash();
        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.match_start = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_match = 0;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.ins_h = 0;
    }

    pub(crate) fn set_params(&mut self, params: &LevelParams) {
        self.max_chain_length = params.max_chain as usize;
        self.max_lazy_match = params.max_lazy as usize;
        self.good_match = params.good_length as usize;
        self.nice_match = params.nice_length as usize;
    }

    /// Empty every hash chain. Used by a full flush so later data never
    /// refers back across it.
    pub(crate) fn clear_hash(&mut self) {
        self.head.fill(NIL as u16);
    }

    /// Farthest distance a match may reach back.
    #[inline]
    pub(crate) fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    #[inline]
    fn update_hash(&self, h: usize, c: u8) -> usize {
        ((h << self.hash_shift) ^ c as usize) & self.hash_mask
    }

    /// Seed the rolling hash with the two bytes at `pos`.
    #[inline]
    pub(crate) fn init_hash(&mut self, pos: usize) {
        self.ins_h = self.window[pos] as usize;
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + 1]);
    }

    /// Insert the string at `pos` into its hash chain and return the
    /// previous head of that chain.
    #[inline]
    pub(crate) fn insert_string(&mut self, pos: usize) -> usize {
        self.ins_h = self.update_hash(self.ins_h, self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        head as usize
    }

    /// Load a preset dictionary at the start of an empty window.
    pub(crate) fn load_dictionary(&mut self, dictionary: &[u8]) {
        let len = dictionary.len();
        self.window[..len].copy_from_slice(dictionary);
        self.strstart = len;
        self.block_start = len as isize;
        if len < MIN_MATCH {
            return;
        }
        self.init_hash(0);
        for pos in 0..=len - MIN_MATCH {
            self.insert_string(pos);
        }
    }

    /// Move the upper half of the window down and rebase the chains.
    fn slide(&mut self) {
        let w_size = self.w_size;
        self.window.copy_within(w_size..2 * w_size, 0);
        self.match_start = self.match_start.wrapping_sub(w_size);
        self.strstart -= w_size;
        self.block_start -= w_size as isize;

        let rebase = |link: &mut u16| {
            *link = if *link as usize >= w_size {
                *link - w_size as u16
            } else {
                NIL as u16
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Fill the window when the lookahead becomes insufficient, sliding it
    /// first if needed.
    ///
    /// On return `lookahead >= MIN_LOOKAHEAD` unless the input is exhausted.
    /// `checksum` is updated over every byte read.
    pub(crate) fn fill_window(
        &mut self,
        strm: &mut StreamBuffers<'_>,
        mut checksum: Option<&mut Adler32>,
    ) {
        loop {
            if self.strstart >= self.w_size + self.max_dist() {
                self.slide();
            }
            if strm.avail_in() == 0 {
                return;
            }

            let start = self.strstart + self.lookahead;
            let more = self.window_size - start;
            let n = strm.read_buf(&mut self.window[start..start + more], checksum.as_deref_mut());
            self.lookahead += n;

            if self.lookahead >= MIN_MATCH {
                self.init_hash(self.strstart);
            }

            if self.lookahead >= MIN_LOOKAHEAD || strm.avail_in() == 0 {
                return;
            }
        }
    }

    /// Find the longest match starting at `strstart` along the hash chain
    /// beginning at `cur_match`.
    ///
    /// Only matches longer than `prev_length` are reported; `match_start` is
    /// updated when one is found. The result never exceeds `lookahead`.
    pub(crate) fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain_length = self.max_chain_length;
        let scan = self.strstart;
        let mut best_len = self.prev_length.max(1);
        let nice_match = self.nice_match.min(self.lookahead);
        let limit = self.strstart.saturating_sub(self.max_dist());

        if self.prev_length >= self.good_match {
            chain_length >>= 2;
        }

        let window = &self.window;
        let mut scan_end1 = window[scan + best_len - 1];
        let mut scan_end = window[scan + best_len];

        loop {
            let m = cur_match;
            // Reject on the bytes that would extend the best match, then on
            // the first two, before comparing the whole string.
            if window[m + best_len] == scan_end
                && window[m + best_len - 1] == scan_end1
                && window[m] == window[scan]
                && window[m + 1] == window[scan + 1]
            {
                let len = 2 + window[scan + 2..scan + MAX_MATCH]
                    .iter()
                    .zip(&window[m + 2..m + MAX_MATCH])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_match {
                        break;
                    }
                    scan_end1 = window[scan + best_len - 1];
                    scan_end = window[scan + best_len];
                }
            }

            cur_match = self.prev[cur_match & self.w_mask] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length = chain_length.saturating_sub(1);
            if chain_length == 0 {
                break;
            }
        }

        best_len.min(self.lookahead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIGURATION_TABLE;

    fn window_with(data: &[u8], level: usize) -> Window {
        let mut window = Window::new(15, 8, &CONFIGURATION_TABLE[level]);
        let mut output = [0u8; 0];
        let mut strm = StreamBuffers::new(data, &mut output);
        window.fill_window(&mut strm, None);
        window
    }

    #[test]
    fn test_fill_window_reads_input() {
        let window = window_with(b"hello world", 6);
        assert_eq!(window.lookahead, 11);
        assert_eq!(&window.window[..11], b"hello world");
    }

    #[test]
    fn test_fill_window_updates_checksum() {
        let mut window = Window::new(9, 1, &CONFIGURATION_TABLE[1]);
        let mut output = [0u8; 0];
        let mut strm = StreamBuffers::new(b"Wikipedia", &mut output);
        let mut adler = Adler32::new();
        window.fill_window(&mut strm, Some(&mut adler));
        assert_eq!(adler.finish(), 0x11E60398);
    }

    #[test]
    fn test_longest_match_finds_repeat() {
        let mut window = window_with(b"abcdefabcdefabcdef", 9);
        for pos in 0..6 {
            window.insert_string(pos);
        }
        // Position 0 doubles as NIL, so the chain ends there.
        assert_eq!(window.insert_string(6), NIL);

        window.strstart = 7;
        window.lookahead = 11;
        let head = window.insert_string(7);
        assert_eq!(head, 1);
        let len = window.longest_match(head);
        assert_eq!(len, 11);
        assert_eq!(window.match_start, 1);
    }

    #[test]
    fn test_longest_match_clamped_to_lookahead() {
        let data = vec![b'z'; 64];
        let mut window = window_with(&data, 9);
        window.init_hash(0);
        window.insert_string(0);
        window.insert_string(1);
        window.strstart = 2;
        window.lookahead = 62;
        let head = window.insert_string(2);
        assert_eq!(head, 1);
        let len = window.longest_match(head);
        assert_eq!(len, 62);
    }

    #[test]
    fn test_slide_rebases_chains() {
        let mut window = Window::new(9, 1, &CONFIGURATION_TABLE[6]);
        let w_size = window.w_size;
        window.head[3] = (w_size + 10) as u16;
        window.head[4] = 10;
        window.prev[0] = (w_size + 1) as u16;
        window.strstart = w_size + window.max_dist();
        window.block_start = 5;

        let mut output = [0u8; 0];
        let mut strm = StreamBuffers::new(&[], &mut output);
        window.fill_window(&mut strm, None);

        assert_eq!(window.head[3], 10);
        assert_eq!(window.head[4], NIL as u16);
        assert_eq!(window.prev[0], 1);
        assert_eq!(window.strstart, window.max_dist());
        assert_eq!(window.block_start, 5 - w_size as isize);
    }

    #[test]
    fn test_load_dictionary() {
        let mut window = Window::new(15, 8, &CONFIGURATION_TABLE[6]);
        window.load_dictionary(b"dictionary");
        assert_eq!(window.strstart, 10);
        assert_eq!(window.block_start, 10);
        assert_eq!(window.lookahead, 0);
        assert_eq!(&window.window[..10], b"dictionary");
    }
}
