//! Dissector: recursive backtracking over the subre tree, used only when
//! the pattern needs backreference verification or non-greedy submatch
//! capture that the pure DFA path cannot resolve on its own
//! (`spec.md` §4.5).

use crate::colormap::Colormap;
use crate::dfa::{accepts_at, longest_with, shortest_with};
use crate::error::Result;
use crate::subre::{Prefer, Subre, SubreOp};

/// A single capture's recorded span, `(start, end)` in code-point
/// offsets, or `None` if the group never matched (`spec.md` §3, "subre
/// tree" and §4.5, "Capture recording").
pub(crate) type CaptureSlot = Option<(usize, usize)>;

/// Per-call dissection state: the input, the colormap (for literal-color
/// lookups the backreference check needs), and the capture vector sized
/// to the pattern's capture count (`spec.md` §3, "Lifecycle": "a pair of
/// small integer arrays sized to the subre node count").
pub(crate) struct Dissector<'a> {
    input: &'a [char],
    cm: &'a Colormap,
    icase: bool,
    pub captures: Vec<CaptureSlot>,
    /// Retry memory: last-tried midpoint (offset-from-begin + 1, 0 =
    /// clean slate) per subre node, indexed by `Subre::no`.
    retry: Vec<usize>,
}

impl<'a> Dissector<'a> {
    pub fn new(input: &'a [char], cm: &'a Colormap, icase: bool, ncapture: usize, ntree: usize) -> Self {
        Dissector {
            input,
            cm,
            icase,
            captures: vec![None; ncapture + 1],
            retry: vec![0; ntree + 1],
        }
    }

    /// Top-level entry: dissect `root` over `[begin, end)`, recording
    /// captures on success.
    pub fn dissect(&mut self, root: &Subre, begin: usize, end: usize) -> Result<bool> {
        let ok = self.dissect_node(root, begin, end)?;
        if ok {
            self.record(root, begin, end);
        }
        Ok(ok)
    }

    fn record(&mut self, node: &Subre, begin: usize, end: usize) {
        if node.subno > 0 {
            let idx = node.subno as usize;
            if idx >= self.captures.len() {
                self.captures.resize(idx + 1, None);
            }
            self.captures[idx] = Some((begin, end));
        }
    }

    fn dissect_node(&mut self, node: &Subre, begin: usize, end: usize) -> Result<bool> {
        let ok = match &node.op {
            SubreOp::Alt(branches) => self.dissect_alt(branches, begin, end)?,
            SubreOp::Concat { left, right: None } => {
                let _ = left;
                self.verify_leaf(node, begin, end)
            }
            SubreOp::Concat { left, right: Some(right) } => {
                self.dissect_concat(node.no, left, right, begin, end)?
            }
            SubreOp::Backref { group, min, max } => self.dissect_backref(*group, *min, *max, begin, end)?,
        };
        if ok {
            self.record(node, begin, end);
        }
        Ok(ok)
    }

    /// A leaf's own compacted automaton (attached post-optimize,
    /// `spec.md` §4.5) is the oracle: the leaf matches `[begin, end)`
    /// exactly when its longest match from `begin` lands precisely on
    /// `end`. Nodes with no attached automaton (shouldn't happen for a
    /// leaf with valid bounds) fall back to a bounds check.
    fn verify_leaf(&self, node: &Subre, begin: usize, end: usize) -> bool {
        match &node.cnfa {
            Some(cnfa) => accepts_at(cnfa, self.cm, self.input, begin, end, true, true),
            None => begin <= end,
        }
    }

    fn dissect_alt(&mut self, branches: &[Subre], begin: usize, end: usize) -> Result<bool> {
        for b in branches {
            if self.dissect_node(b, begin, end)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// `','`: pick a tentative midpoint with `longest` (or `shortest` if
    /// `left.prefer == Shorter`) over the left fragment, recursively
    /// dissect both halves, backing off the midpoint by one code point
    /// on failure (`spec.md` §4.5).
    fn dissect_concat(&mut self, no: u32, left: &Subre, right: &Subre, begin: usize, end: usize) -> Result<bool> {
        let shorter = left.resolved_prefer() == Prefer::Shorter;
        let slot = self.retry.get(no as usize).copied().unwrap_or(0);
        let mut mid = if slot > 0 {
            begin + slot - 1
        } else if let Some(cnfa) = &left.cnfa {
            // When the left subtree has its own compacted automaton, use
            // it as an oracle for the first midpoint guess instead of
            // starting at a range endpoint (`spec.md` §4.5).
            let probed = if shorter {
                probe_shortest(cnfa, self.cm, self.input, begin, begin)
            } else {
                probe_longest(cnfa, self.cm, self.input, begin)
            };
            probed.unwrap_or(if shorter { begin } else { end }).min(end)
        } else if shorter {
            begin
        } else {
            end
        };

        loop {
            if mid < begin || mid > end {
                break;
            }
            if self.dissect_node(left, begin, mid)? && self.dissect_node(right, mid, end)? {
                if no < self.retry.len() {
                    self.retry[no as usize] = mid - begin + 1;
                }
                return Ok(true);
            }
            if shorter {
                if mid >= end {
                    break;
                }
                mid += 1;
            } else {
                if mid <= begin {
                    break;
                }
                mid -= 1;
            }
        }
        if no < self.retry.len() {
            self.retry[no as usize] = 0;
        }
        Ok(false)
    }

    /// `'b'`: verify the input between `begin` and `end` is `i`
    /// repetitions (`min <= i <= max`) of the captured text for `group`.
    fn dissect_backref(&mut self, group: u32, min: u16, max: u16, begin: usize, end: usize) -> Result<bool> {
        let Some(Some((cbegin, cend))) = self.captures.get(group as usize).copied() else {
            return Ok(false);
        };
        let unit_len = cend - cbegin;
        let avail = end - begin;
        if unit_len == 0 {
            return Ok(min == 0 && begin == end || max >= 1);
        }
        if avail % unit_len != 0 {
            return Ok(false);
        }
        let reps = avail / unit_len;
        if (reps as u16) < min || (max != crate::nfa::build::INFINITE && reps as u16 > max) {
            return Ok(false);
        }
        for r in 0..reps {
            let chunk_start = begin + r * unit_len;
            for k in 0..unit_len {
                let a = self.input[chunk_start + k];
                let b = self.input[cbegin + k];
                let same = if self.icase {
                    a.to_lowercase().eq(b.to_lowercase())
                } else {
                    a == b
                };
                if !same {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

/// Drives a DFA-backed midpoint probe over `[begin, end)` for use by
/// concatenation dissection when a subtree has its own compacted
/// automaton (kept separate from [`Dissector`]'s methods since it needs
/// a `Cnfa` reference the generic leaf case above does not have).
pub(crate) fn probe_longest(
    cnfa: &crate::cnfa::Cnfa,
    cm: &Colormap,
    input: &[char],
    begin: usize,
) -> Option<usize> {
    longest_with(cnfa, cm, input, begin, true, true, true)
}

pub(crate) fn probe_shortest(
    cnfa: &crate::cnfa::Cnfa,
    cm: &Colormap,
    input: &[char],
    begin: usize,
    min_end: usize,
) -> Option<usize> {
    shortest_with(cnfa, cm, input, begin, min_end, true, true, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subre::Subre;

    #[test]
    fn backref_matches_repeated_capture() {
        let input: Vec<char> = "aaaa".chars().collect();
        let cm = Colormap::new();
        let mut d = Dissector::new(&input, &cm, false, 1, 1);
        d.captures[1] = Some((0, 2));
        assert!(d.dissect_backref(1, 1, 1, 2, 4).unwrap());
    }

    #[test]
    fn backref_rejects_mismatched_repetition() {
        let input: Vec<char> = "aaab".chars().collect();
        let cm = Colormap::new();
        let mut d = Dissector::new(&input, &cm, false, 1, 1);
        d.captures[1] = Some((0, 2));
        assert!(!d.dissect_backref(1, 1, 1, 2, 4).unwrap());
    }

    #[test]
    fn backref_to_unmatched_group_fails() {
        let input: Vec<char> = "aaaa".chars().collect();
        let cm = Colormap::new();
        let mut d = Dissector::new(&input, &cm, false, 1, 1);
        assert!(!d.dissect_backref(1, 1, 1, 0, 2).unwrap());
    }

    #[test]
    fn concat_records_contiguous_halves_on_success() {
        let input: Vec<char> = "ab".chars().collect();
        let cm = Colormap::new();
        let mut d = Dissector::new(&input, &cm, false, 2, 8);
        let mut left = Subre::leaf_concat(1, 0, 0);
        left.subno = 1;
        let mut right = Subre::leaf_concat(2, 0, 0);
        right.subno = 2;
        let root = Subre::concat(3, left, right);
        assert!(d.dissect(&root, 0, 2).unwrap());
        let (lb, le) = d.captures[1].unwrap();
        let (rb, re) = d.captures[2].unwrap();
        assert_eq!(lb, 0);
        assert_eq!(re, 2);
        assert_eq!(le, rb);
    }
}
