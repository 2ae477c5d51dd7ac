//! Compacted NFA: the immutable, flat representation produced at the end
//! of optimization (`spec.md` §3, "CNFA", and §4.3(e)/(f)).

use crate::color::Color;
use crate::nfa::{ArcKind, Nfa, StateId};

pub(crate) const COLORLESS: Color = crate::color::COLORLESS;

/// One compacted outgoing transition, `(color, to)`. A run of these per
/// state is terminated by a sentinel carrying `color == COLORLESS`
/// (`spec.md` §8 invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Carc {
    pub color: Color,
    pub to: StateId,
}

/// Flat, immutable automaton compacted from an optimized [`Nfa`].
#[derive(Debug, Clone)]
pub(crate) struct Cnfa {
    pub nstates: u32,
    pub ncolors: u32,
    pub pre: StateId,
    pub post: StateId,
    pub bos: [Color; 2],
    pub eos: [Color; 2],
    /// `states[i]` is the index into `arcs` where state `i`'s sorted,
    /// `COLORLESS`-terminated run begins.
    states: Vec<u32>,
    arcs: Vec<Carc>,
    pub haslacons: bool,
    pub leftanch: bool,
}

impl Cnfa {
    /// `compact`: renumber live states densely in arena order, flatten
    /// each state's out-arcs into a single `(color, to)` array sorted by
    /// `(color, to)` and terminated by `COLORLESS`. LACON arcs get their
    /// color remapped to `ncolors + lacon_index` (`spec.md` §3's "CNFA"
    /// bullet and §4.3(e)).
    pub fn compact(nfa: &Nfa, ncolors: u32) -> Self {
        Self::compact_between(nfa, ncolors, nfa.pre, nfa.post)
    }

    /// Like [`Cnfa::compact`], but anchors the resulting automaton at an
    /// arbitrary `(pre, post)` state pair instead of the whole NFA's
    /// sentinels. Used to give a subre node its own oracle automaton over
    /// just its `begin`/`end` fragment (`spec.md` §4.5, "Dissector...
    /// using DFAs as oracles").
    pub fn compact_between(nfa: &Nfa, ncolors: u32, pre: StateId, post: StateId) -> Self {
        let live: Vec<StateId> = nfa.iter_states().collect();
        let renumber: std::collections::HashMap<StateId, u32> =
            live.iter().enumerate().map(|(i, &s)| (s, i as u32)).collect();

        let mut states = Vec::with_capacity(live.len() + 1);
        let mut arcs = Vec::new();
        let mut haslacons = false;

        for &s in &live {
            states.push(arcs.len() as u32);
            let mut run: Vec<Carc> = nfa
                .outs(s)
                .filter_map(|a| {
                    let rec = nfa.arc(a);
                    let (color, to) = match rec.kind {
                        ArcKind::Plain(c) | ArcKind::Ahead(c) | ArcKind::Behind(c) => (c, rec.to),
                        ArcKind::Lacon { index, positive } => {
                            haslacons = true;
                            (encode_lacon(ncolors, index, positive), rec.to)
                        }
                        ArcKind::Empty | ArcKind::Caret { .. } | ArcKind::Dollar { .. } => {
                            return None;
                        }
                    };
                    Some(Carc { color, to: renumber[&to] })
                })
                .collect();
            carcsort(&mut run);
            arcs.extend(run);
            arcs.push(Carc { color: COLORLESS, to: 0 });
        }
        states.push(arcs.len() as u32); // sentinel end for the last state

        let renumbered_pre = renumber[&pre];
        let renumbered_post = renumber[&post];
        let leftanch = pre == nfa.pre && compute_leftanch(nfa, &nfa.bos);

        Cnfa {
            nstates: live.len() as u32,
            ncolors,
            pre: renumbered_pre,
            post: renumbered_post,
            bos: nfa.bos,
            eos: nfa.eos,
            states,
            arcs,
            haslacons,
            leftanch,
        }
    }

    /// The `(color, to)` run for `state`, not including the `COLORLESS`
    /// terminator.
    pub fn arcs_of(&self, state: StateId) -> &[Carc] {
        let start = self.states[state as usize] as usize;
        let mut end = start;
        while self.arcs[end].color != COLORLESS {
            end += 1;
        }
        &self.arcs[start..end]
    }
}

/// LACON arcs share the ordinary color space starting at `ncolors`, two
/// pseudo-colors per registered constraint (one for the positive sense,
/// one for the negative) so `decode_lacon` can recover both the table
/// index and the sense from a single `Color` (`spec.md` §3, "CNFA").
fn encode_lacon(ncolors: u32, index: u32, positive: bool) -> Color {
    ncolors as Color + (index as Color) * 2 + if positive { 0 } else { 1 }
}

/// Inverse of `encode_lacon`: recovers `(lacon table index, positive)`
/// from a compacted arc's color, given the caller already knows
/// `co >= ncolors`.
pub(crate) fn decode_lacon(co: Color, ncolors: u32) -> (u32, bool) {
    let raw = co - ncolors as Color;
    ((raw / 2) as u32, raw % 2 == 0)
}

/// `carcsort`: O(n^2) insertion sort over `(color, to)`. Arc lists per
/// state are short in practice, so the quadratic behavior is harmless
/// (`spec.md` §9).
fn carcsort(run: &mut [Carc]) {
    for i in 1..run.len() {
        let mut j = i;
        while j > 0 && (run[j - 1].color, run[j - 1].to) > (run[j].color, run[j].to) {
            run.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// `leftanch`: true iff every `pre.out` arc carries only a BOS/BOL
/// pseudocolor, meaning the pattern cannot match anywhere but the string
/// start (`spec.md` §4.3(f)).
fn compute_leftanch(nfa: &Nfa, bos: &[Color; 2]) -> bool {
    let outs: Vec<_> = nfa.outs(nfa.pre).collect();
    if outs.is_empty() {
        return false;
    }
    outs.iter().all(|&a| match nfa.arc(a).kind {
        ArcKind::Plain(c) => c == bos[0] || c == bos[1],
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;

    fn linear_nfa() -> Nfa {
        let mut nfa = Nfa::new();
        let arcs: Vec<_> = nfa.outs(nfa.pre).chain(nfa.ins(nfa.post)).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        nfa.newarc(ArcKind::Plain(WHITE), nfa.pre, nfa.init);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.init, nfa.r#final);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.r#final, nfa.post);
        nfa
    }

    #[test]
    fn compact_sorts_and_terminates_each_run() {
        let nfa = linear_nfa();
        let cnfa = Cnfa::compact(&nfa, 1);
        for s in 0..cnfa.nstates {
            let run = cnfa.arcs_of(s);
            for w in run.windows(2) {
                assert!((w[0].color, w[0].to) <= (w[1].color, w[1].to));
            }
        }
    }

    #[test]
    fn compact_remaps_lacon_color_above_ncolors() {
        let mut nfa = Nfa::new();
        let arcs: Vec<_> = nfa.outs(nfa.pre).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        nfa.newarc(ArcKind::Lacon { index: 2, positive: true }, nfa.pre, nfa.init);
        let cnfa = Cnfa::compact(&nfa, 5);
        assert!(cnfa.haslacons);
        let run = cnfa.arcs_of(cnfa.pre);
        assert_eq!(run[0].color, encode_lacon(5, 2, true));
        assert_eq!(decode_lacon(run[0].color, 5), (2, true));
    }

    #[test]
    fn leftanch_true_when_pre_only_has_bos_arcs() {
        let mut nfa = Nfa::new();
        let arcs: Vec<_> = nfa.outs(nfa.pre).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        nfa.bos = [7, 8];
        nfa.newarc(ArcKind::Plain(7), nfa.pre, nfa.init);
        let cnfa = Cnfa::compact(&nfa, 1);
        assert!(cnfa.leftanch);
    }
}
