//! Top-level execute driver (`spec.md` §4.6).

use crate::cnfa::Cnfa;
use crate::colormap::Colormap;
use crate::dfa::{longest_with_lacons, shortest_with_lacons};
use crate::dissect::Dissector;
use crate::error::Result;
use crate::subre::Subre;

bitflags::bitflags! {
    /// Execute-time flags (`spec.md` §6, "Execute entry").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ExecFlags: u32 {
        const NOTBOL = 1 << 0;
        const NOTEOL = 1 << 1;
    }
}

/// A completed search: the whole-match span plus every capture span
/// (`spec.md` §6, "Match vector"). `None` entries are unmatched
/// captures.
#[derive(Debug, Clone)]
pub(crate) struct ExecMatch {
    pub whole: (usize, usize),
    pub captures: Vec<Option<(usize, usize)>>,
}

/// Everything `exec` needs read-only access to from the compiled pattern
/// (`spec.md` §3, "Lifecycle": compiled state is immutable after
/// compile).
pub(crate) struct ExecCtx<'a> {
    pub cnfa: &'a Cnfa,
    pub cm: &'a Colormap,
    pub root: &'a Subre,
    pub ncapture: u32,
    pub ntree: u32,
    pub needs_dissector: bool,
    pub icase: bool,
    /// Whether the pattern's resolved match-length preference is
    /// `Shorter` (a non-greedy quantifier somewhere with no more
    /// specific preference overriding it), in which case the whole
    /// match itself must be the leftmost-shortest, not longest
    /// (`spec.md` §4.2, "the first concrete LONGER or SHORTER wins").
    pub prefer_shorter: bool,
    /// Compacted constraint automaton per registered LACON, indexed the
    /// same way `ArcKind::Lacon { index, .. }` is (`spec.md` §4.2).
    pub lacons: &'a [Option<Cnfa>],
}

/// `exec`: drive the engines, fill in the match-range vector
/// (`spec.md` §4.6). Runs the shortcut pure-DFA path when possible, and
/// falls back to the dissector when the pattern has backreferences or
/// shortest-preferring capturing groups.
pub(crate) fn exec(ctx: &ExecCtx, input: &[char], flags: ExecFlags) -> Result<Option<ExecMatch>> {
    let notbol = flags.contains(ExecFlags::NOTBOL);
    let noteol = flags.contains(ExecFlags::NOTEOL);
    let leftanch = ctx.cnfa.leftanch;

    let mut start = 0usize;
    loop {
        if start > input.len() {
            return Ok(None);
        }
        let found = if ctx.prefer_shorter {
            shortest_with_lacons(ctx.cnfa, ctx.cm, input, start, start, notbol, noteol, false, ctx.lacons)
        } else {
            longest_with_lacons(ctx.cnfa, ctx.cm, input, start, notbol, noteol, false, ctx.lacons)
        };
        let Some(end) = found else {
            if leftanch {
                return Ok(None);
            }
            if start >= input.len() {
                return Ok(None);
            }
            start += 1;
            continue;
        };

        if !ctx.needs_dissector {
            return Ok(Some(ExecMatch { whole: (start, end), captures: Vec::new() }));
        }

        let mut dissector = Dissector::new(input, ctx.cm, ctx.icase, ctx.ncapture as usize, ctx.ntree as usize);
        if dissector.dissect(ctx.root, start, end)? {
            let mut captures = vec![None; ctx.ncapture as usize + 1];
            for (i, c) in dissector.captures.iter().enumerate() {
                if i < captures.len() {
                    captures[i] = *c;
                }
            }
            return Ok(Some(ExecMatch { whole: (start, end), captures }));
        }

        // Zero-length match with no progress: terminate to avoid looping
        // forever at the same position (`spec.md` §4.6 step 5, §8
        // invariant 12).
        if leftanch {
            return Ok(None);
        }
        if start >= input.len() {
            return Ok(None);
        }
        start += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;
    use crate::nfa::{ArcKind, Nfa};
    use crate::subre::Subre;

    fn literal_ctx(lit: &str) -> (Cnfa, Colormap, Subre) {
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        let arcs: Vec<_> = nfa.outs(nfa.pre).chain(nfa.ins(nfa.post)).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        nfa.newarc(ArcKind::Plain(WHITE), nfa.pre, nfa.init);
        let mut cur = nfa.init;
        for c in lit.chars() {
            let co = cm.subcolor(c);
            let next = nfa.newstate();
            nfa.newarc(ArcKind::Plain(co), cur, next);
            cur = next;
        }
        nfa.newarc(ArcKind::Empty, cur, nfa.r#final);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.r#final, nfa.post);
        crate::nfa::optimize::fixempties(&mut nfa);
        let cnfa = Cnfa::compact(&nfa, cm.max_color() as u32 + 1);
        let root = Subre::leaf_concat(1, nfa.init, nfa.r#final);
        (cnfa, cm, root)
    }

    #[test]
    fn finds_literal_match_mid_string() {
        let (cnfa, cm, root) = literal_ctx("abc");
        let ctx = ExecCtx { cnfa: &cnfa, cm: &cm, root: &root, ncapture: 0, ntree: 1, needs_dissector: false, icase: false, prefer_shorter: false, lacons: &[] };
        let input: Vec<char> = "xxabcyy".chars().collect();
        let m = exec(&ctx, &input, ExecFlags::empty()).unwrap().unwrap();
        assert_eq!(m.whole, (2, 5));
    }

    #[test]
    fn returns_none_when_no_match_exists() {
        let (cnfa, cm, root) = literal_ctx("abc");
        let ctx = ExecCtx { cnfa: &cnfa, cm: &cm, root: &root, ncapture: 0, ntree: 1, needs_dissector: false, icase: false, prefer_shorter: false, lacons: &[] };
        let input: Vec<char> = "xyz".chars().collect();
        assert!(exec(&ctx, &input, ExecFlags::empty()).unwrap().is_none());
    }
}
