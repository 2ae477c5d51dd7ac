//! Public compiled-pattern type and builder (`spec.md` §6, "Compile
//! entry"; `SPEC_FULL.md` §A.2, §B).

use std::collections::HashMap;

use crate::captures::Captures;
use crate::cnfa::Cnfa;
use crate::colormap::Colormap;
use crate::error::{InfoFlags, Result};
use crate::exec::{exec, ExecCtx, ExecFlags};
use crate::lexer::{CompFlags, Dialect};
use crate::nfa::optimize::optimize;
use crate::nfa::Nfa;
use crate::parser::parse;
use crate::subre::{Subre, SubreOp};

/// A compiled pattern: the CNFA, colormap, subre tree and info bits
/// carried forward from compile (`spec.md` §3, "Lifecycle" — this is the
/// `guts` handle the `vars` struct's ownership transfers into on
/// success).
pub struct Regex {
    cnfa: Cnfa,
    cm: Colormap,
    root: Subre,
    ntree: u32,
    ncapture: u32,
    info: InfoFlags,
    flags: CompFlags,
    needs_dissector: bool,
    group_names: HashMap<String, usize>,
    /// One compacted constraint automaton per registered LACON, indexed
    /// the same way `ArcKind::Lacon { index, .. }` is (index `0` unused,
    /// `spec.md` §4.2, "newlacon"). Built once at compile time so `exec`
    /// never has to touch the raw NFA again.
    lacon_cnfas: Vec<Option<Cnfa>>,
}

#[bon::bon]
impl Regex {
    pub fn new(pattern: &str) -> Result<Regex> {
        Regex::builder().build(pattern)
    }

    /// Entry point for the `bon` builder (`SPEC_FULL.md` §A.2):
    /// `Regex::builder().icase(true).dialect(Dialect::Advanced).build("a(b+)c")`.
    #[builder]
    fn builder(
        #[builder(finish_fn)] pattern: &str,
        #[builder(default = Dialect::Advanced)] dialect: Dialect,
        #[builder(default)] icase: bool,
        #[builder(default)] nosub: bool,
        #[builder(default)] expanded: bool,
        #[builder(default)] newline: bool,
        #[builder(default)] nlstop: bool,
        #[builder(default)] nlanch: bool,
        #[builder(default)] quote: bool,
        #[builder(default)] advf: bool,
    ) -> Result<Regex> {
        let mut flags = CompFlags::empty();
        flags.set(CompFlags::ICASE, icase);
        flags.set(CompFlags::NOSUB, nosub);
        flags.set(CompFlags::EXPANDED, expanded);
        flags.set(CompFlags::NEWLINE, newline);
        flags.set(CompFlags::NLSTOP, nlstop);
        flags.set(CompFlags::NLANCH, nlanch);
        flags.set(CompFlags::QUOTE, quote);
        flags.set(CompFlags::ADVF, advf);
        Regex::compile(pattern, dialect, flags)
    }
}

impl Regex {
    fn compile(pattern: &str, dialect: Dialect, flags: CompFlags) -> Result<Regex> {
        let flags = flags.normalized();
        let parsed = parse(pattern, dialect, flags)?;
        let crate::parser::ParseResult { mut nfa, mut cm, mut root, lacons, ncapture, mut info } = parsed;
        optimize(&mut nfa, &mut cm, &mut info);
        let ncolors = cm.max_color() as u32 + 1;
        let cnfa = Cnfa::compact(&nfa, ncolors);
        attach_cnfas(&mut root, &nfa, ncolors);
        let lacon_cnfas = compact_lacons(lacons, ncolors);

        let ncapture = if flags.contains(CompFlags::NOSUB) { 0 } else { ncapture };
        let needs_dissector =
            info.contains(InfoFlags::UBACKREF) || ncapture > 0 || has_shorter_capturing(&root);
        let ntree = root.count_nodes();

        Ok(Regex {
            cnfa,
            cm,
            root,
            ntree,
            ncapture,
            info,
            flags,
            needs_dissector,
            group_names: HashMap::new(),
            lacon_cnfas,
        })
    }

    pub fn info(&self) -> InfoFlags {
        self.info
    }

    fn ctx(&self) -> ExecCtx<'_> {
        ExecCtx {
            cnfa: &self.cnfa,
            cm: &self.cm,
            root: &self.root,
            ncapture: self.ncapture,
            ntree: self.ntree,
            needs_dissector: self.needs_dissector,
            icase: self.flags.contains(CompFlags::ICASE),
            prefer_shorter: self.root.resolved_prefer() == crate::subre::Prefer::Shorter,
            lacons: &self.lacon_cnfas,
        }
    }

    /// `is_match`: does the pattern match anywhere in `input`?
    pub fn is_match(&self, input: &str) -> Result<bool> {
        let chars: Vec<char> = input.chars().collect();
        Ok(exec(&self.ctx(), &chars, ExecFlags::empty())?.is_some())
    }

    /// `find`: the first match's whole span, as byte-free code-point
    /// offsets converted back to a [`crate::captures::Span`].
    pub fn find(&self, input: &str) -> Result<Option<crate::captures::Span>> {
        let chars: Vec<char> = input.chars().collect();
        let m = exec(&self.ctx(), &chars, ExecFlags::empty())?;
        Ok(m.map(|m| crate::captures::Span { start: m.whole.0, end: m.whole.1 }))
    }

    /// `find_iter`: every non-overlapping match in `input`, left to
    /// right.
    pub fn find_iter<'r, 's>(&'r self, input: &'s str) -> FindIter<'r, 's> {
        FindIter { re: self, chars: input.chars().collect(), pos: 0, done: false }
    }

    /// `captures`: the first match plus its capture groups.
    pub fn captures(&self, input: &str) -> Result<Option<Captures>> {
        let chars: Vec<char> = input.chars().collect();
        let m = exec(&self.ctx(), &chars, ExecFlags::empty())?;
        Ok(m.map(|m| Captures::new(m.whole, m.captures, self.group_names.clone())))
    }

    /// `captures_iter`: every non-overlapping match with its captures.
    pub fn captures_iter<'r, 's>(&'r self, input: &'s str) -> CapturesIter<'r, 's> {
        CapturesIter { re: self, chars: input.chars().collect(), pos: 0, done: false }
    }
}

/// Gives every subre node with known NFA bounds its own compacted
/// automaton, so the dissector can use it as a midpoint/verification
/// oracle instead of guessing blindly (`spec.md` §4.5).
fn attach_cnfas(node: &mut Subre, nfa: &Nfa, ncolors: u32) {
    if let (Some(b), Some(e)) = (node.begin, node.end) {
        node.cnfa = Some(Cnfa::compact_between(nfa, ncolors, b, e));
    }
    match &mut node.op {
        SubreOp::Alt(branches) => {
            for b in branches {
                attach_cnfas(b, nfa, ncolors);
            }
        }
        SubreOp::Concat { left, right } => {
            attach_cnfas(left, nfa, ncolors);
            if let Some(r) = right {
                attach_cnfas(r, nfa, ncolors);
            }
        }
        SubreOp::Backref { .. } => {}
    }
}

/// Compacts every registered LACON's private sub-NFA into its own
/// oracle automaton, anchored at `init`/`final` rather than `pre`/`post`
/// since `parser::parse` never wires sentinels for a LACON's inner NFA
/// (`spec.md` §4.2, "LACON"). Only `fixempties` runs on it, not the full
/// `optimize` pipeline -- `optimize`'s `cleanup` pass sweeps by
/// `pre`-reachability and would discard everything, since `pre` carries
/// no arcs here.
fn compact_lacons(lacons: crate::nfa::build::LaconTable, ncolors: u32) -> Vec<Option<Cnfa>> {
    lacons
        .into_entries()
        .into_iter()
        .map(|entry| {
            entry.map(|mut sub| {
                crate::nfa::optimize::fixempties(&mut sub);
                Cnfa::compact_between(&sub, ncolors, sub.init, sub.r#final)
            })
        })
        .collect()
}

fn has_shorter_capturing(node: &Subre) -> bool {
    use crate::subre::{Prefer, SubreOp};
    if node.subno > 0 && node.prefer == Prefer::Shorter {
        return true;
    }
    match &node.op {
        SubreOp::Alt(branches) => branches.iter().any(has_shorter_capturing),
        SubreOp::Concat { left, right } => {
            has_shorter_capturing(left) || right.as_ref().is_some_and(|r| has_shorter_capturing(r))
        }
        SubreOp::Backref { .. } => false,
    }
}

pub struct FindIter<'r, 's> {
    re: &'r Regex,
    chars: Vec<char>,
    pos: usize,
    done: bool,
}

impl<'r, 's> Iterator for FindIter<'r, 's> {
    type Item = crate::captures::Span;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos > self.chars.len() {
            return None;
        }
        let m = exec(&self.re.ctx(), &self.chars[self.pos..], ExecFlags::empty()).ok().flatten()?;
        let start = self.pos + m.whole.0;
        let end = self.pos + m.whole.1;
        self.pos = if end > start { end } else { end + 1 };
        if self.pos > self.chars.len() {
            self.done = true;
        }
        Some(crate::captures::Span { start, end })
    }
}

pub struct CapturesIter<'r, 's> {
    re: &'r Regex,
    chars: Vec<char>,
    pos: usize,
    done: bool,
}

impl<'r, 's> Iterator for CapturesIter<'r, 's> {
    type Item = Captures;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos > self.chars.len() {
            return None;
        }
        let m = exec(&self.re.ctx(), &self.chars[self.pos..], ExecFlags::empty()).ok().flatten()?;
        let whole = (self.pos + m.whole.0, self.pos + m.whole.1);
        let captures = m
            .captures
            .into_iter()
            .map(|c| c.map(|(s, e)| (self.pos + s, self.pos + e)))
            .collect();
        self.pos = if whole.1 > whole.0 { whole.1 } else { whole.1 + 1 };
        if self.pos > self.chars.len() {
            self.done = true;
        }
        Some(Captures::new(whole, captures, self.re.group_names.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_matches_simple_literal() {
        let re = Regex::new("abc").unwrap();
        assert!(re.is_match("xxabcyy").unwrap());
        assert!(!re.is_match("xyz").unwrap());
    }

    #[test]
    fn find_returns_correct_span() {
        let re = Regex::new("bc").unwrap();
        let span = re.find("abcd").unwrap().unwrap();
        assert_eq!((span.start, span.end), (1, 3));
    }

    #[test]
    fn captures_group_with_quantifier() {
        let re = Regex::builder().dialect(Dialect::Advanced).build("a(b+)c").unwrap();
        let caps = re.captures("xxabbbbcyy").unwrap().unwrap();
        let whole = caps.get_match();
        assert_eq!((whole.start, whole.end), (2, 8));
    }

    #[test]
    fn find_iter_yields_nonoverlapping_matches() {
        let re = Regex::new("ab").unwrap();
        let spans: Vec<_> = re.find_iter("abXabXab").map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 2), (3, 5), (6, 8)]);
    }

    #[test]
    fn icase_flag_folds_case() {
        let re = Regex::builder().icase(true).build("abc").unwrap();
        assert!(re.is_match("ABC").unwrap());
    }
}
