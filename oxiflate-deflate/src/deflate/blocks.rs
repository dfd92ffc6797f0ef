//! Block functions: stored, greedy and lazy matching.
//!
//! Each function consumes window contents until it runs out of input or
//! output space, or until the requested flush is complete. Symbols are
//! tallied into [`crate::trees::Trees`]; a block is emitted whenever the
//! symbol buffer fills or the heuristic in `worth_truncating` says so.

use oxiflate_core::traits::{Flush, Strategy};

use super::window::{MIN_LOOKAHEAD, NIL, TOO_FAR};
use super::{BlockState, Deflater};
use crate::buffers::StreamBuffers;
use crate::tables::MIN_MATCH;

/// Check the early-flush heuristic every this many symbols.
const TRUNCATE_CHECK_MASK: usize = 0x1fff;

impl Deflater {
    fn fill_window(&mut self, strm: &mut StreamBuffers<'_>) {
        let checksum = if self.wrap {
            Some(&mut self.adler)
        } else {
            None
        };
        self.window.fill_window(strm, checksum);
    }

    /// Emit the current block and move `block_start` up to `strstart`.
    fn flush_block_only(&mut self, strm: &mut StreamBuffers<'_>, eof: bool) {
        let w = &self.window;
        let stored_len = (w.strstart as isize - w.block_start) as usize;
        let buf = (w.block_start >= 0).then(|| &w.window[w.block_start as usize..]);
        self.trees
            .flush_block(&mut self.pending, buf, stored_len, eof, self.level);
        self.window.block_start = self.window.strstart as isize;
        self.flush_pending(strm);
    }

    /// Emit the current block; true when the output buffer is now full.
    fn flush_block(&mut self, strm: &mut StreamBuffers<'_>, eof: bool) -> bool {
        self.flush_block_only(strm, eof);
        strm.avail_out() == 0
    }

    /// Close the block at the end of a block function.
    fn finish_block(&mut self, strm: &mut StreamBuffers<'_>, flush: Flush) -> BlockState {
        let eof = flush == Flush::Finish;
        if self.flush_block(strm, eof) {
            return if eof {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            };
        }
        if eof {
            BlockState::FinishDone
        } else {
            BlockState::BlockDone
        }
    }

    /// Whether the early-flush heuristic asks for the block to end here.
    fn truncate_block(&self) -> bool {
        let w = &self.window;
        self.level > 2
            && self.trees.symbols() & TRUNCATE_CHECK_MASK == 0
            && self
                .trees
                .worth_truncating((w.strstart as isize - w.block_start).max(0) as usize)
    }

    fn tally_lit(&mut self, c: u8) -> bool {
        self.trees.tally_lit(c) || self.truncate_block()
    }

    fn tally_dist(&mut self, dist: usize, lc: usize) -> bool {
        self.trees.tally_dist(dist, lc) || self.truncate_block()
    }

    /// Copy input into stored blocks without compression.
    ///
    /// A block is closed at 64K, or earlier when the staging area is
    /// smaller, and whenever the block start is about to leave the window.
    pub(super) fn deflate_stored(&mut self, strm: &mut StreamBuffers<'_>, flush: Flush) -> BlockState {
        let max_block_size = 0xFFFF_usize.min(self.pending_buf_size - 5);

        loop {
            if self.window.lookahead <= 1 {
                self.fill_window(strm);
                if self.window.lookahead == 0 {
                    if flush == Flush::None {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            let w = &mut self.window;
            w.strstart += w.lookahead;
            w.lookahead = 0;

            let block_start = w.block_start.max(0) as usize;
            let max_start = block_start + max_block_size;
            if w.strstart >= max_start {
                w.lookahead = w.strstart - max_start;
                w.strstart = max_start;
                if self.flush_block(strm, false) {
                    return BlockState::NeedMore;
                }
            }

            let w = &self.window;
            if w.strstart - w.block_start.max(0) as usize >= w.max_dist()
                && self.flush_block(strm, false)
            {
                return BlockState::NeedMore;
            }
        }

        self.finish_block(strm, flush)
    }

    /// Greedy matching: take the longest match at each position, with no
    /// lazy evaluation. Used by the fastest levels.
    pub(super) fn deflate_fast(&mut self, strm: &mut StreamBuffers<'_>, flush: Flush) -> BlockState {
        loop {
            // Keep MIN_LOOKAHEAD bytes ahead so a full match can be found.
            if self.window.lookahead < MIN_LOOKAHEAD {
                self.fill_window(strm);
                if self.window.lookahead < MIN_LOOKAHEAD && flush == Flush::None {
                    return BlockState::NeedMore;
                }
                if self.window.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL;
            if self.window.lookahead >= MIN_MATCH {
                hash_head = self.window.insert_string(self.window.strstart);
            }

            if hash_head != NIL
                && self.window.strstart - hash_head <= self.window.max_dist()
                && self.strategy != Strategy::HuffmanOnly
            {
                self.window.match_length = self.window.longest_match(hash_head);
            }

            let bflush;
            if self.window.match_length >= MIN_MATCH {
                let dist = self.window.strstart - self.window.match_start;
                bflush = self.tally_dist(dist, self.window.match_length - MIN_MATCH);

                let w = &mut self.window;
                w.lookahead -= w.match_length;

                // Insert new strings only for short matches; long ones are
                // skipped to save time.
                if w.match_length <= w.max_lazy_match && w.lookahead >= MIN_MATCH {
                    w.match_length -= 1;
                    while w.match_length != 0 {
                        w.strstart += 1;
                        w.insert_string(w.strstart);
                        w.match_length -= 1;
                    }
                    w.strstart += 1;
                } else {
                    w.strstart += w.match_length;
                    w.match_length = 0;
                    w.init_hash(w.strstart);
                }
            } else {
                let c = self.window.window[self.window.strstart];
                bflush = self.tally_lit(c);
                self.window.lookahead -= 1;
                self.window.strstart += 1;
            }

            if bflush && self.flush_block(strm, false) {
                return BlockState::NeedMore;
            }
        }

        self.finish_block(strm, flush)
    }

    /// Lazy matching: a match is only taken if the match starting at the
    /// next position is not better.
    pub(super) fn deflate_slow(&mut self, strm: &mut StreamBuffers<'_>, flush: Flush) -> BlockState {
        loop {
            if self.window.lookahead < MIN_LOOKAHEAD {
                self.fill_window(strm);
                if self.window.lookahead < MIN_LOOKAHEAD && flush == Flush::None {
                    return BlockState::NeedMore;
                }
                if self.window.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL;
            if self.window.lookahead >= MIN_MATCH {
                hash_head = self.window.insert_string(self.window.strstart);
            }

            let w = &mut self.window;
            w.prev_length = w.match_length;
            w.prev_match = w.match_start;
            w.match_length = MIN_MATCH - 1;

            if hash_head != NIL
                && w.prev_length < w.max_lazy_match
                && w.strstart - hash_head <= w.max_dist()
            {
                if self.strategy != Strategy::HuffmanOnly {
                    w.match_length = w.longest_match(hash_head);
                }
                if w.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (w.match_length == MIN_MATCH
                            && w.strstart.wrapping_sub(w.match_start) > TOO_FAR))
                {
                    // Not worth a match; emit literals instead.
                    w.match_length = MIN_MATCH - 1;
                }
            }

            if w.prev_length >= MIN_MATCH && w.match_length <= w.prev_length {
                // The previous match is at least as good: emit it.
                let max_insert = w.strstart + w.lookahead - MIN_MATCH;
                let dist = w.strstart - 1 - w.prev_match;
                let lc = w.prev_length - MIN_MATCH;
                let bflush = self.tally_dist(dist, lc);

                let w = &mut self.window;
                // strstart-1 and strstart are already inserted.
                w.lookahead -= w.prev_length - 1;
                w.prev_length -= 2;
                while w.prev_length != 0 {
                    w.strstart += 1;
                    if w.strstart <= max_insert {
                        w.insert_string(w.strstart);
                    }
                    w.prev_length -= 1;
                }
                w.match_available = false;
                w.match_length = MIN_MATCH - 1;
                w.strstart += 1;

                if bflush && self.flush_block(strm, false) {
                    return BlockState::NeedMore;
                }
            } else if w.match_available {
                // No better match here: emit the previous byte as a literal.
                let c = w.window[w.strstart - 1];
                if self.tally_lit(c) {
                    self.flush_block_only(strm, false);
                }
                self.window.strstart += 1;
                self.window.lookahead -= 1;
                if strm.avail_out() == 0 {
                    return BlockState::NeedMore;
                }
            } else {
                // Wait for the next step to decide.
                w.match_available = true;
                w.strstart += 1;
                w.lookahead -= 1;
            }
        }

        if self.window.match_available {
            let c = self.window.window[self.window.strstart - 1];
            self.tally_lit(c);
            self.window.match_available = false;
        }

        self.finish_block(strm, flush)
    }
}
