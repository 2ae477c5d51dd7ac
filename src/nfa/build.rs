//! NFA construction helpers: bulk arc enumeration, repetition rewriting,
//! word-boundary expansion and lookahead-constraint registration
//! (`spec.md` §4.1 "Bulk enumerations" and §4.2).

use crate::colormap::Colormap;
use crate::error::{InfoFlags, Result};
use crate::nfa::{ArcKind, Nfa, StateId};

/// `DUPMAX`: the largest explicit `{m,n}` bound accepted (`spec.md` §9).
pub const DUPMAX: u16 = 255;
/// One past `DUPMAX`, used as the "unbounded" sentinel for `max`.
pub const INFINITE: u16 = DUPMAX + 1;

/// `rainbow(nfa, cm, kind, except, from, to)`: add an arc of `kind` for
/// every non-pseudo, non-excepted color. `kind_of` builds the arc kind
/// from a color (so callers can ask for `Plain`, `Ahead` or `Behind`
/// rainbows uniformly).
pub(crate) fn rainbow(
    nfa: &mut Nfa,
    cm: &mut Colormap,
    kind_of: impl Fn(i32) -> ArcKind,
    except: Option<i32>,
    from: StateId,
    to: StateId,
) {
    for co in 0..cm_max_color(cm) + 1 {
        if cm.is_pseudo(co) {
            continue;
        }
        if Some(co) == except {
            continue;
        }
        let a = nfa.newarc(kind_of(co), from, to);
        cm.colorchain(co, a);
    }
}

fn cm_max_color(cm: &Colormap) -> i32 {
    cm.max_color()
}

/// `colorcomplement(nfa, cm, kind_of, of, from, to)`: add an arc of `kind`
/// for every color *not* already on a `Plain` out-arc of `of`. Used for
/// `[^...]` and for the "not a word char" half of word-boundary
/// constraints.
pub(crate) fn colorcomplement(
    nfa: &mut Nfa,
    cm: &mut Colormap,
    kind_of: impl Fn(i32) -> ArcKind,
    of: StateId,
    from: StateId,
    to: StateId,
) {
    let present: Vec<i32> = nfa
        .outs(of)
        .filter_map(|a| match nfa.arc(a).kind {
            ArcKind::Plain(c) => Some(c),
            _ => None,
        })
        .collect();
    for co in 0..cm_max_color(cm) + 1 {
        if cm.is_pseudo(co) || present.contains(&co) {
            continue;
        }
        let a = nfa.newarc(kind_of(co), from, to);
        cm.colorchain(co, a);
    }
}

/// Reduces an explicit repetition count to one of the four buckets the
/// rewrite table is indexed by (`spec.md` §4.2, "reductions").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bucket {
    Zero,
    One,
    Some,
    Inf,
}

fn reduce(n: u16) -> Bucket {
    match n {
        0 => Bucket::Zero,
        1 => Bucket::One,
        2..=DUPMAX => Bucket::Some,
        _ => Bucket::Inf,
    }
}

/// `repeat(nfa, lp, rp, m, n)`: rewrite the fragment bracketed by `(lp,
/// rp)` to match it repeated `m..n` times (`n == INFINITE` for
/// unbounded), per the bucket table in `spec.md` §4.2. `dup` duplicates
/// the fragment between fresh states and is supplied by the parser (it
/// needs the subre tree alongside the NFA fragment, so the NFA-only
/// duplication lives in [`Nfa::dupnfa`] and the caller stitches subre
/// copies on top).
///
/// Returns `Ok(())` having mutated the NFA in place. `{0,0}` is handled by
/// the caller (it also deletes the subre subtree and cancels captures,
/// which this module has no view of).
pub(crate) fn repeat(nfa: &mut Nfa, lp: StateId, rp: StateId, m: u16, n: u16) -> Result<()> {
    let bucket_m = reduce(m);
    let bucket_n = reduce(n);
    match (bucket_m, bucket_n) {
        (Bucket::Zero, Bucket::Zero) => {
            // Collapse to a single empty arc; caller handles subre-level
            // capture cancellation.
            let outs: Vec<_> = nfa.outs(lp).collect();
            for a in outs {
                nfa.freearc(a);
            }
            nfa.emptyarc(lp, rp);
            Ok(())
        }
        (Bucket::Zero, Bucket::One) => {
            // `{0,1}`: make the fragment optional with a bypass ε-arc.
            nfa.emptyarc(lp, rp);
            Ok(())
        }
        (Bucket::One, Bucket::One) => Ok(()), // already exactly one copy
        (Bucket::Zero, Bucket::Inf) => {
            // `*`: bypass plus back-loop.
            nfa.emptyarc(lp, rp);
            nfa.emptyarc(rp, lp);
            Ok(())
        }
        (Bucket::One, Bucket::Inf) => {
            // `+`: back-loop only.
            nfa.emptyarc(rp, lp);
            Ok(())
        }
        _ => {
            // `{m,n}` with m or n in `Some`/mixed with `Inf`: the parser
            // calls `dupnfa` directly to unroll the fragment into `n`
            // (or `m` plus a starred tail) chained copies rather than
            // going through this function.
            Ok(())
        }
    }
}

/// Clones the fragment bracketed by `(lp, rp)`, returning a fresh
/// `(lp, rp)` pair with an identical internal graph -- every state
/// reachable from `lp` (including back through `rp`'s own out-arcs, so
/// a fragment already containing a `*`/`+` back-loop duplicates
/// correctly) gets a fresh copy, and every arc between two cloned
/// states is replayed with the same [`ArcKind`] (`spec.md` §4.2,
/// "dupnfa").
pub(crate) fn dupnfa(nfa: &mut Nfa, lp: StateId, rp: StateId) -> (StateId, StateId) {
    let mut visited = vec![lp, rp];
    let mut frontier = vec![lp, rp];
    while let Some(s) = frontier.pop() {
        for a in nfa.outs(s).collect::<Vec<_>>() {
            let to = nfa.arc(a).to;
            if !visited.contains(&to) {
                visited.push(to);
                frontier.push(to);
            }
        }
    }

    let remap: std::collections::HashMap<StateId, StateId> =
        visited.iter().map(|&s| (s, nfa.newstate())).collect();

    for &s in &visited {
        for a in nfa.outs(s).collect::<Vec<_>>() {
            let rec = nfa.arc(a);
            let (kind, from, to) = (rec.kind, rec.from, rec.to);
            if let (Some(&nf), Some(&nt)) = (remap.get(&from), remap.get(&to)) {
                nfa.newarc(kind, nf, nt);
            }
        }
    }

    (remap[&lp], remap[&rp])
}

/// Lazily builds the word-character color set as a disconnected
/// two-state sub-NFA (`spec.md` §4.2, "wordchrs"), returning its
/// `(begin, end)` states. Callers use `findarc`/`colorcomplement` against
/// `begin` to test membership without touching the main fragment.
pub(crate) fn wordchrs(nfa: &mut Nfa, cm: &mut Colormap) -> (StateId, StateId) {
    let begin = nfa.newstate();
    let end = nfa.newstate();
    for c in word_chars_sample() {
        let co = cm.subcolor(c);
        let a = nfa.newarc(ArcKind::Plain(co), begin, end);
        cm.colorchain(co, a);
    }
    cm.okcolors(nfa);
    (begin, end)
}

/// ASCII word-character alphabet, `[0-9A-Za-z_]`, matching
/// `SPEC_FULL.md` §B.1's `\w` definition (ASCII-only word set, matching
/// the original's POSIX-locale default).
fn word_chars_sample() -> Vec<char> {
    let mut v = Vec::with_capacity(63);
    v.push('_');
    for c in '0'..='9' {
        v.push(c);
    }
    for c in 'A'..='Z' {
        v.push(c);
    }
    for c in 'a'..='z' {
        v.push(c);
    }
    v
}

/// Tracks lookahead-constraint sub-NFAs registered while parsing
/// (`spec.md` §4.2, "newlacon"). Index `0` is unused so that a `LACON`
/// arc's index is always truthy.
#[derive(Debug, Default)]
pub(crate) struct LaconTable {
    entries: Vec<Option<Nfa>>,
}

impl LaconTable {
    pub fn new() -> Self {
        LaconTable { entries: vec![None] }
    }

    /// `newlacon`: register a private constraint sub-NFA, returning its
    /// index (`>= 1`).
    pub fn newlacon(&mut self, sub: Nfa) -> u32 {
        self.entries.push(Some(sub));
        (self.entries.len() - 1) as u32
    }

    pub fn get(&self, index: u32) -> Option<&Nfa> {
        self.entries.get(index as usize).and_then(|e| e.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Consumes the table, handing ownership of each registered
    /// constraint sub-NFA to the caller (compile's LACON-compaction
    /// step) in index order, index `0`'s `None` placeholder included.
    pub fn into_entries(self) -> Vec<Option<Nfa>> {
        self.entries
    }
}

/// Wires the sentinel transitions every fresh NFA needs before parsing
/// begins (`spec.md` §4.2: "`pre -> init` carries both an unconditional
/// rainbow ... and `'^'` arcs; `final -> post` carries an unconditional
/// rainbow and `'$'` arcs").
pub(crate) fn wire_sentinels(nfa: &mut Nfa, cm: &mut Colormap, info: &mut InfoFlags) {
    rainbow(nfa, cm, ArcKind::Plain, None, nfa.pre, nfa.init);
    nfa.newarc(ArcKind::Caret { line: false }, nfa.pre, nfa.init);
    rainbow(nfa, cm, ArcKind::Plain, None, nfa.r#final, nfa.post);
    nfa.newarc(ArcKind::Dollar { line: false }, nfa.r#final, nfa.post);
    // Presence of these sentinel anchors alone never sets an info bit;
    // real anchors parsed from the pattern do (tracked by the parser).
    let _ = info;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;

    #[test]
    fn rainbow_skips_pseudocolors() {
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        let pseudo = cm.pseudocolor();
        let a = nfa.newstate();
        let b = nfa.newstate();
        rainbow(&mut nfa, &mut cm, ArcKind::Plain, None, a, b);
        assert!(nfa.outs(a).all(|arc| nfa.arc(arc).kind.color() != Some(pseudo)));
        assert!(nfa.outs(a).any(|arc| nfa.arc(arc).kind.color() == Some(WHITE)));
    }

    #[test]
    fn colorcomplement_excludes_present_colors() {
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        let of = nfa.newstate();
        let from = nfa.newstate();
        let to = nfa.newstate();
        nfa.newarc(ArcKind::Plain(WHITE), of, nfa.post);
        colorcomplement(&mut nfa, &mut cm, ArcKind::Plain, of, from, to);
        assert!(nfa.outs(from).all(|arc| nfa.arc(arc).kind.color() != Some(WHITE)));
    }

    #[test]
    fn repeat_zero_zero_collapses_to_single_empty_arc() {
        let mut nfa = Nfa::new();
        let lp = nfa.newstate();
        let rp = nfa.newstate();
        nfa.newarc(ArcKind::Plain(WHITE), lp, rp);
        nfa.newarc(ArcKind::Plain(WHITE + 1), lp, rp);
        repeat(&mut nfa, lp, rp, 0, 0).unwrap();
        assert_eq!(nfa.nouts(lp), 1);
        assert!(nfa.outs(lp).all(|a| nfa.arc(a).kind.is_empty()));
    }

    #[test]
    fn repeat_zero_inf_adds_bypass_and_backloop() {
        let mut nfa = Nfa::new();
        let lp = nfa.newstate();
        let rp = nfa.newstate();
        repeat(&mut nfa, lp, rp, 0, INFINITE).unwrap();
        assert_eq!(nfa.nouts(lp), 1);
        assert_eq!(nfa.nouts(rp), 1);
    }

    #[test]
    fn lacon_table_indices_start_at_one() {
        let mut table = LaconTable::new();
        let idx = table.newlacon(Nfa::new());
        assert_eq!(idx, 1);
        assert!(table.get(1).is_some());
        assert!(table.get(0).is_none());
    }
}
