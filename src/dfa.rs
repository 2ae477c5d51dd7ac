//! DFA engine: on-the-fly subset construction over a [`Cnfa`] with a
//! bounded LRU state-set cache (`spec.md` §4.4).

use std::collections::HashMap;

use crate::cnfa::{Carc, Cnfa};
use crate::color::Color;
use crate::nfa::StateId;

const DEFAULT_CACHE_SIZE: usize = 200;
const SMALL_CACHE_SIZE: usize = 5;

/// A cached NFA state-set (`sset`, `spec.md` §4.4).
#[derive(Debug, Clone)]
struct Sset {
    states: Vec<bool>,
    hash: u64,
    is_starter: bool,
    is_poststate: bool,
    outs: Vec<Option<usize>>,
    lastseen: usize,
}

impl Sset {
    fn new(nstates: usize, ncolors: usize) -> Self {
        Sset {
            states: vec![false; nstates],
            hash: 0,
            is_starter: false,
            is_poststate: false,
            outs: vec![None; ncolors],
            lastseen: 0,
        }
    }

    fn recompute_hash(&mut self) {
        let mut h: u64 = 0;
        for (i, &b) in self.states.iter().enumerate() {
            if b {
                h ^= (i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
            }
        }
        self.hash = h;
    }
}

/// A bounded pool of [`Sset`]s plus the hash-keyed index used by `miss`
/// to find or create the successor of `(css, color)`.
pub(crate) struct Dfa<'a> {
    cnfa: &'a Cnfa,
    cache_size: usize,
    pool: Vec<Sset>,
    index: HashMap<u64, Vec<usize>>,
    now: usize,
}

impl<'a> Dfa<'a> {
    pub fn new(cnfa: &'a Cnfa, small: bool) -> Self {
        Dfa {
            cnfa,
            cache_size: if small { SMALL_CACHE_SIZE } else { DEFAULT_CACHE_SIZE },
            pool: Vec::new(),
            index: HashMap::new(),
            now: 0,
        }
    }

    fn ncolors_total(&self) -> usize {
        // Ordinary colors plus one slot per registered LACON index; the
        // caller sizing `outs` by this avoids a resize on the first
        // LACON-color transition (`spec.md` §3, "CNFA").
        self.cnfa.ncolors as usize + 1
    }

    /// The start set: `pre` alone, epsilon-closed over whichever BOS/BOL
    /// pseudocolor arcs hold at `start` (`spec.md` §4.3(c)'s pullback
    /// target, consumed here the way `miss`'s LACON closure consumes
    /// lookahead arcs -- zero-width, decided by position instead of by
    /// a sub-automaton).
    fn start_set(&mut self, start: usize, input: &[char], notbol: bool) -> usize {
        let mut states = vec![false; self.cnfa.nstates as usize];
        states[self.cnfa.pre as usize] = true;
        let fire_string = start == 0 && !notbol;
        let fire_line = fire_string || (start > 0 && input[start - 1] == '\n');
        let mut colors = Vec::with_capacity(2);
        if fire_string {
            colors.push(self.cnfa.bos[0]);
        }
        if fire_line {
            colors.push(self.cnfa.bos[1]);
        }
        close_pseudo(&mut states, self.cnfa, &colors);

        let mut s = Sset::new(0, self.ncolors_total());
        s.states = states;
        s.is_starter = true;
        s.is_poststate = s.states[self.cnfa.post as usize];
        s.recompute_hash();
        self.insert(s)
    }

    /// Whether `css`'s raw state set, or that set epsilon-closed over
    /// whichever EOS/EOL pseudocolor arcs hold at `pos`, reaches `post`.
    /// Never cached on the `Sset` itself: unlike an ordinary transition,
    /// this answer depends on `pos`, not just on which states are live
    /// (`spec.md` §4.3(c)).
    fn accepts_here(&self, css: usize, pos: usize, input: &[char], noteol: bool) -> bool {
        if self.pool[css].is_poststate {
            return true;
        }
        let fire_string = pos == input.len() && !noteol;
        let fire_line = fire_string || (pos < input.len() && input[pos] == '\n');
        if !fire_string && !fire_line {
            return false;
        }
        let mut colors = Vec::with_capacity(2);
        if fire_string {
            colors.push(self.cnfa.eos[0]);
        }
        if fire_line {
            colors.push(self.cnfa.eos[1]);
        }
        let mut states = self.pool[css].states.clone();
        close_pseudo(&mut states, self.cnfa, &colors);
        states[self.cnfa.post as usize]
    }

    fn insert(&mut self, s: Sset) -> usize {
        if self.pool.len() >= self.cache_size {
            self.evict_oldest();
        }
        self.pool.push(s);
        let id = self.pool.len() - 1;
        self.index.entry(self.pool[id].hash).or_default().push(id);
        id
    }

    fn evict_oldest(&mut self) {
        let Some((pos, _)) = self
            .pool
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.lastseen)
        else {
            return;
        };
        let evicted_hash = self.pool[pos].hash;
        self.pool.remove(pos);
        if let Some(bucket) = self.index.get_mut(&evicted_hash) {
            bucket.retain(|&i| i != pos);
        }
        for bucket in self.index.values_mut() {
            for slot in bucket.iter_mut() {
                if *slot > pos {
                    *slot -= 1;
                }
            }
        }
        for s in &mut self.pool {
            for o in &mut s.outs {
                if let Some(t) = *o {
                    if t == pos {
                        *o = None;
                    } else if t > pos {
                        *o = Some(t - 1);
                    }
                }
            }
        }
    }

    fn find_or_insert(&mut self, work: Vec<bool>) -> (usize, bool) {
        let mut s = Sset::new(0, 0);
        s.states = work;
        s.recompute_hash();
        s.is_poststate = s.states[self.cnfa.post as usize];
        if let Some(bucket) = self.index.get(&s.hash) {
            for &cand in bucket {
                if self.pool[cand].states == s.states {
                    return (cand, false);
                }
            }
        }
        s.outs = vec![None; self.ncolors_total()];
        (self.insert(s), true)
    }

    /// `miss`: compute the successor state-set of `css` on `color`,
    /// caching the transition unless a LACON closure made the result
    /// position-dependent (`spec.md` §4.4).
    ///
    /// LACON arcs are zero-width: before consuming `color`, `css`'s
    /// state set is epsilon-closed over every LACON arc whose
    /// constraint automaton actually holds at `pos` (evaluated against
    /// `lacons`, looked ahead over `input` from `pos`). That closure is
    /// position-dependent, so a transition that crossed one is never
    /// cached on `css`.
    fn miss(
        &mut self,
        css: usize,
        color: i32,
        pos: usize,
        cm: &crate::colormap::Colormap,
        input: &[char],
        lacons: &[Option<Cnfa>],
    ) -> Option<usize> {
        if let Some(cached) = self.pool[css].outs.get(color as usize).copied().flatten() {
            return Some(cached);
        }
        let ncolors = self.cnfa.ncolors as i32;

        let mut closed = self.pool[css].states.clone();
        let mut used_lacon = false;
        loop {
            let mut added = false;
            let snapshot = closed.clone();
            for (s, &present) in snapshot.iter().enumerate() {
                if !present {
                    continue;
                }
                for &Carc { color: co, to } in self.cnfa.arcs_of(s as StateId) {
                    if co < ncolors || closed[to as usize] {
                        continue;
                    }
                    used_lacon = true;
                    let (index, positive) = crate::cnfa::decode_lacon(co, ncolors as u32);
                    let holds = lacons
                        .get(index as usize)
                        .and_then(|e| e.as_ref())
                        .is_some_and(|sub| lacon_holds(sub, cm, input, pos, positive));
                    if holds {
                        closed[to as usize] = true;
                        added = true;
                    }
                }
            }
            if !added {
                break;
            }
        }

        let mut work = vec![false; self.cnfa.nstates as usize];
        let mut any = false;
        for (s, &present) in closed.iter().enumerate() {
            if !present {
                continue;
            }
            for &Carc { color: co, to } in self.cnfa.arcs_of(s as StateId) {
                if co == color {
                    work[to as usize] = true;
                    any = true;
                }
            }
        }

        if !any {
            return None;
        }

        let (id, _fresh) = self.find_or_insert(work);
        if !used_lacon {
            self.pool[css].outs[color as usize] = Some(id);
        }
        Some(id)
    }
}

/// Epsilon-closes `states` over any arc whose color is in `fire`,
/// fixpoint style -- the same shape as `miss`'s LACON closure, but over
/// a short fixed list of pseudocolors instead of a decoded LACON table
/// index.
fn close_pseudo(states: &mut [bool], cnfa: &Cnfa, fire: &[Color]) {
    if fire.is_empty() {
        return;
    }
    loop {
        let mut added = false;
        let snapshot = states.to_vec();
        for (s, &present) in snapshot.iter().enumerate() {
            if !present {
                continue;
            }
            for &Carc { color, to } in cnfa.arcs_of(s as StateId) {
                if fire.contains(&color) && !states[to as usize] {
                    states[to as usize] = true;
                    added = true;
                }
            }
        }
        if !added {
            break;
        }
    }
}

/// Evaluates a lookahead constraint at `pos`: a positive constraint
/// holds iff its automaton matches some (possibly empty) prefix of
/// `input[pos..]`; a negative one holds iff it does not.
fn lacon_holds(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    pos: usize,
    positive: bool,
) -> bool {
    let matches = longest_with(cnfa, cm, input, pos, true, true, true).is_some();
    if positive {
        matches
    } else {
        !matches
    }
}

/// Colormap-aware entry points, used by `exec`/`dissect` which always
/// have a real [`crate::colormap::Colormap`] on hand to resolve input
/// characters to colors before stepping the DFA.
pub(crate) fn longest_with(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    start: usize,
    notbol: bool,
    noteol: bool,
    small: bool,
) -> Option<usize> {
    longest_with_lacons(cnfa, cm, input, start, notbol, noteol, small, &[])
}

pub(crate) fn shortest_with(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    start: usize,
    min_end: usize,
    notbol: bool,
    noteol: bool,
    small: bool,
) -> Option<usize> {
    shortest_with_lacons(cnfa, cm, input, start, min_end, notbol, noteol, small, &[])
}

/// Like [`longest_with`], but also resolving lookahead-constraint arcs
/// against their registered constraint automata (`lacons[index]`)
/// instead of treating them as perpetually unsatisfied.
pub(crate) fn longest_with_lacons(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    start: usize,
    notbol: bool,
    noteol: bool,
    small: bool,
    lacons: &[Option<Cnfa>],
) -> Option<usize> {
    let mut dfa = Dfa::new(cnfa, small);
    run_scan(&mut dfa, cm, input, start, None, notbol, noteol, lacons)
}

pub(crate) fn shortest_with_lacons(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    start: usize,
    min_end: usize,
    notbol: bool,
    noteol: bool,
    small: bool,
    lacons: &[Option<Cnfa>],
) -> Option<usize> {
    let mut dfa = Dfa::new(cnfa, small);
    run_scan(&mut dfa, cm, input, start, Some(min_end), notbol, noteol, lacons)
}

/// `accepts_at`: does the automaton accept exactly `[begin, end)`,
/// independent of whether a longer or shorter run from `begin` would
/// also be accepted? Used by the dissector to verify a tentative
/// capture span against a subtree's own oracle automaton (`spec.md`
/// §4.5), where "is this the longest/shortest match" is the wrong
/// question -- the span to check is already fixed by an enclosing
/// concatenation's midpoint search.
pub(crate) fn accepts_at(
    cnfa: &Cnfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    begin: usize,
    end: usize,
    notbol: bool,
    noteol: bool,
) -> bool {
    if end < begin || end > input.len() {
        return false;
    }
    let mut dfa = Dfa::new(cnfa, true);
    let mut css = dfa.start_set(begin, input, notbol);
    for (i, &ch) in input[begin..end].iter().enumerate() {
        let co = cm.getcolor(ch);
        match dfa.miss(css, co, begin + i, cm, input, &[]) {
            Some(next) => css = next,
            None => return false,
        }
    }
    dfa.accepts_here(css, end, input, noteol)
}

fn run_scan(
    dfa: &mut Dfa,
    cm: &crate::colormap::Colormap,
    input: &[char],
    start: usize,
    min_end: Option<usize>,
    notbol: bool,
    noteol: bool,
    lacons: &[Option<Cnfa>],
) -> Option<usize> {
    let mut css = dfa.start_set(start, input, notbol);
    dfa.pool[css].lastseen = dfa.now;
    dfa.now += 1;
    let mut best = if dfa.accepts_here(css, start, input, noteol) {
        match min_end {
            Some(me) if start < me => None,
            _ => Some(start),
        }
    } else {
        None
    };
    if best.is_some() && min_end.is_some() {
        return best;
    }

    for (i, &ch) in input[start..].iter().enumerate() {
        let co = cm.getcolor(ch);
        let Some(next) = dfa.miss(css, co, start + i, cm, input, lacons) else { break };
        css = next;
        dfa.pool[css].lastseen = dfa.now;
        dfa.now += 1;
        let pos = start + i + 1;
        if dfa.accepts_here(css, pos, input, noteol) {
            match min_end {
                Some(me) if pos >= me => return Some(pos),
                Some(_) => {}
                None => best = Some(pos),
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;
    use crate::colormap::Colormap;
    use crate::nfa::{ArcKind, Nfa};

    fn literal_cnfa(lit: char) -> (Cnfa, Colormap) {
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        let arcs: Vec<_> = nfa.outs(nfa.pre).chain(nfa.ins(nfa.post)).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        let co = cm.subcolor(lit);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.pre, nfa.init);
        nfa.newarc(ArcKind::Plain(co), nfa.init, nfa.r#final);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.r#final, nfa.post);
        let cnfa = Cnfa::compact(&nfa, cm.max_color() as u32 + 1);
        (cnfa, cm)
    }

    #[test]
    fn longest_finds_single_literal_match() {
        let (cnfa, cm) = literal_cnfa('a');
        let input: Vec<char> = "xax".chars().collect();
        let co_a = cm.getcolor('a');
        let co_x = cm.getcolor('x');
        assert_ne!(co_a, co_x);
        let end = longest_with(&cnfa, &cm, &input, 0, false, false, true);
        assert!(end.is_some());
    }

    #[test]
    fn miss_returns_none_on_dead_end() {
        let (cnfa, cm) = literal_cnfa('a');
        let input: Vec<char> = vec!['z'];
        let end = longest_with(&cnfa, &cm, &input, 0, false, false, true);
        assert_eq!(end, None);
    }

    #[test]
    fn cache_eviction_does_not_panic_under_small_cache() {
        let (cnfa, cm) = literal_cnfa('a');
        let input: Vec<char> = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".chars().collect();
        let _ = longest_with(&cnfa, &cm, &input, 0, false, false, true);
    }
}
