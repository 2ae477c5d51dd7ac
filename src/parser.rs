//! Recursive-descent parser: consumes the token stream and builds the
//! NFA fragment and subre tree in parallel (`spec.md` §4.2).

use crate::color::WHITE;
use crate::colormap::Colormap;
use crate::cvec::Cvec;
use crate::error::{Error, InfoFlags, Result};
use crate::lexer::{CompFlags, Dialect, Lexer, Token};
use crate::nfa::build::{colorcomplement, dupnfa, rainbow, repeat, wire_sentinels, wordchrs, LaconTable, DUPMAX, INFINITE};
use crate::nfa::{ArcKind, Nfa, StateId};
use crate::subre::Subre;

/// Output of a successful parse: everything a compiled pattern needs to
/// carry forward into optimization (`spec.md` §3, "Lifecycle" — this is
/// the Rust analogue of the `vars` struct, minus the sticky error flag).
pub(crate) struct ParseResult {
    pub nfa: Nfa,
    pub cm: Colormap,
    pub root: Subre,
    pub lacons: LaconTable,
    pub ncapture: u32,
    pub info: InfoFlags,
}

pub(crate) fn parse(pattern: &str, dialect: Dialect, flags: CompFlags) -> Result<ParseResult> {
    let flags = flags.normalized();
    if pattern.is_empty() && matches!(dialect, Dialect::Extended | Dialect::Advanced) {
        return Err(Error::Empty);
    }
    let mut p = Parser {
        lx: Lexer::new(pattern, dialect, flags),
        nfa: Nfa::new(),
        cm: Colormap::new(),
        lacons: LaconTable::new(),
        ncap: 0,
        nodeno: 0,
        flags,
        dialect,
        info: InfoFlags::empty(),
    };
    wire_sentinels(&mut p.nfa, &mut p.cm, &mut p.info);
    p.lx.next()?;
    p.lx.next()?;

    let (begin, end, mut root) = p.p_branch_chain(p.nfa.init, p.nfa.r#final)?;
    debug_assert_eq!(begin, p.nfa.init);
    debug_assert_eq!(end, p.nfa.r#final);
    root.subno = 0;
    if !matches!(p.lx.nexttype, Token::Eos) {
        return Err(Error::BadPattern);
    }
    p.info |= p.lx.info;
    Ok(ParseResult { nfa: p.nfa, cm: p.cm, root, lacons: p.lacons, ncapture: p.ncap, info: p.info })
}

struct Parser<'a> {
    lx: Lexer<'a>,
    nfa: Nfa,
    cm: Colormap,
    lacons: LaconTable,
    ncap: u32,
    nodeno: u32,
    flags: CompFlags,
    dialect: Dialect,
    info: InfoFlags,
}

impl<'a> Parser<'a> {
    fn next_no(&mut self) -> u32 {
        self.nodeno += 1;
        self.nodeno
    }

    /// Parses a `|`-separated chain of branches between `lp`/`rp`, or a
    /// single concatenation chain if there is only one branch
    /// (`spec.md` §4.2: "`|` creates a new (left, right) pair...").
    fn p_branch_chain(&mut self, lp: StateId, rp: StateId) -> Result<(StateId, StateId, Subre)> {
        let mut branches = vec![self.p_concat_chain(lp, rp)?];
        while matches!(self.lx.nexttype, Token::Bar) {
            self.lx.next()?;
            branches.push(self.p_concat_chain(lp, rp)?);
        }
        if branches.len() == 1 {
            Ok((lp, rp, branches.pop().unwrap()))
        } else {
            let prefer = branches
                .iter()
                .map(Subre::resolved_prefer)
                .find(|p| *p != crate::subre::Prefer::NoneYet)
                .unwrap_or_default();
            let mut node = Subre::alt(self.next_no(), branches);
            node.begin = Some(lp);
            node.end = Some(rp);
            node.prefer = prefer;
            Ok((lp, rp, node))
        }
    }

    /// Parses one `,`-chained sequence of atoms between `lp`/`rp`.
    fn p_concat_chain(&mut self, lp: StateId, rp: StateId) -> Result<Subre> {
        let mut cur = lp;
        let mut nodes: Vec<Subre> = Vec::new();
        loop {
            if matches!(self.lx.nexttype, Token::Eos | Token::Bar | Token::RParen) {
                break;
            }
            let next = self.nfa.newstate();
            let node = self.p_quantified_atom(cur, next)?;
            nodes.push(node);
            cur = next;
        }
        // Last atom's `next` should land on `rp`: stitch it in by
        // redirecting all of `cur`'s in-arcs onto `rp` then dropping
        // `cur` (mirrors `moveins` use in the original concatenation
        // step, spec.md §4.2).
        if cur != rp {
            self.nfa.moveins(cur, rp);
            self.nfa.dropstate(cur);
        }
        if nodes.is_empty() {
            self.nfa.emptyarc(lp, rp);
            return Ok(Subre::leaf_concat(self.next_no(), lp, rp));
        }
        let mut iter = nodes.into_iter().rev();
        let mut acc = iter.next().unwrap();
        for n in iter {
            acc = Subre::concat(self.next_no(), n, acc);
        }
        acc.begin = Some(lp);
        acc.end = Some(rp);
        Ok(acc)
    }

    /// An atom followed by zero or one quantifier.
    fn p_quantified_atom(&mut self, lp: StateId, rp: StateId) -> Result<Subre> {
        let mut node = self.p_atom(lp, rp)?;
        loop {
            match self.lx.nexttype {
                Token::Star { greedy } => {
                    self.lx.next()?;
                    self.apply_repeat(lp, rp, 0, INFINITE, greedy, &mut node)?;
                }
                Token::Plus { greedy } => {
                    self.lx.next()?;
                    self.apply_repeat(lp, rp, 1, INFINITE, greedy, &mut node)?;
                }
                Token::Question { greedy } => {
                    self.lx.next()?;
                    self.apply_repeat(lp, rp, 0, 1, greedy, &mut node)?;
                }
                Token::LBrace { .. } => {
                    let (m, n, greedy) = self.p_bound()?;
                    self.apply_repeat(lp, rp, m, n, greedy, &mut node)?;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn p_bound(&mut self) -> Result<(u16, u16, bool)> {
        self.lx.next()?; // consume '{'
        let m = self.p_bound_number()?;
        let n = if matches!(self.lx.nexttype, Token::Comma) {
            self.lx.next()?;
            if matches!(self.lx.nexttype, Token::RBrace { .. }) {
                INFINITE
            } else {
                self.p_bound_number()?
            }
        } else {
            m
        };
        let greedy = match self.lx.nexttype {
            Token::RBrace { greedy } => greedy,
            _ => return Err(Error::BadBrace),
        };
        self.lx.next()?;
        if m > DUPMAX || (n != INFINITE && n > DUPMAX) || n < m {
            return Err(Error::BadRepeat);
        }
        self.info.insert(InfoFlags::UBOUNDS);
        Ok((m, n, greedy))
    }

    fn p_bound_number(&mut self) -> Result<u16> {
        let mut n: u32 = 0;
        let mut saw_digit = false;
        while let Token::Digit(d) = self.lx.nexttype {
            n = n * 10 + d as u32;
            saw_digit = true;
            self.lx.next()?;
            if n > DUPMAX as u32 + 1 {
                return Err(Error::BadRepeat);
            }
        }
        if !saw_digit {
            return Err(Error::BadBrace);
        }
        Ok(n as u16)
    }

    /// Rewrites the fragment between `lp`/`rp` to the requested
    /// repetition, handling the `{0,0}` capture-cancellation case at the
    /// subre level (`spec.md` §4.2).
    fn apply_repeat(
        &mut self,
        lp: StateId,
        rp: StateId,
        m: u16,
        n: u16,
        greedy: bool,
        node: &mut Subre,
    ) -> Result<()> {
        if m == 0 && n == 0 {
            node.subno = 0;
        }
        if !greedy {
            node.prefer = crate::subre::Prefer::Shorter;
        }
        match (m, n) {
            (0, INFINITE) | (1, INFINITE) | (0, 1) | (0, 0) | (1, 1) => {
                repeat(&mut self.nfa, lp, rp, m, n)
            }
            _ => self.apply_general_repeat(lp, rp, m, n),
        }
    }

    /// `{m,n}` outside the irreducible base cases: unroll the fragment
    /// into `n` (or, for `n == INFINITE`, `m`) chained copies via
    /// [`dupnfa`], with an escape epsilon at each copy past the `m`-th
    /// so the whole chain accepts any count in `m..=n` (`spec.md` §4.2,
    /// "reductions" -- the "PAIR"/"REDUCE" case delegated to the
    /// parser). `lp`/`rp` keep their identity as the construct's overall
    /// entry/exit (the final copy's fresh exit is folded back into `rp`
    /// via `moveins`/`dropstate`), so a capturing group wrapping the
    /// whole repetition still records a correct span -- across every
    /// repetition as one span, not POSIX's "last iteration wins" (see
    /// `DESIGN.md`).
    fn apply_general_repeat(&mut self, lp: StateId, rp: StateId, m: u16, n: u16) -> Result<()> {
        let m = m as usize;
        let total_copies = if n == INFINITE { m } else { n as usize };

        if m == 0 && n != INFINITE {
            self.nfa.emptyarc(lp, rp);
        }

        let mut prev_exit = rp;
        let mut last_lp = lp;
        let mut last_rp = rp;
        for i in 2..=total_copies {
            let (clp, crp) = dupnfa(&mut self.nfa, lp, rp);
            self.nfa.emptyarc(prev_exit, clp);
            if n != INFINITE && i > m {
                self.nfa.emptyarc(clp, rp);
            }
            prev_exit = crp;
            last_lp = clp;
            last_rp = crp;
        }

        if n == INFINITE {
            repeat(&mut self.nfa, last_lp, last_rp, 1, INFINITE)?;
        }

        if last_rp != rp {
            self.nfa.moveins(last_rp, rp);
            self.nfa.dropstate(last_rp);
        }
        Ok(())
    }

    fn p_atom(&mut self, lp: StateId, rp: StateId) -> Result<Subre> {
        match self.lx.nexttype {
            Token::Plain(c) => {
                self.lx.next()?;
                self.emit_literal(lp, rp, c);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Dot => {
                self.lx.next()?;
                let nl_excluded = self.flags.contains(CompFlags::NLSTOP);
                let except = if nl_excluded { Some(self.cm.subcolor('\n')) } else { None };
                rainbow(&mut self.nfa, &mut self.cm, ArcKind::Plain, except, lp, rp);
                self.cm.okcolors(&mut self.nfa);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Caret => {
                self.lx.next()?;
                let line = self.flags.contains(CompFlags::NLANCH);
                self.nfa.newarc(ArcKind::Caret { line }, lp, rp);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Dollar => {
                self.lx.next()?;
                let line = self.flags.contains(CompFlags::NLANCH);
                self.nfa.newarc(ArcKind::Dollar { line }, lp, rp);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Sbegin => {
                self.lx.next()?;
                self.nfa.newarc(ArcKind::Caret { line: false }, lp, rp);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Send => {
                self.lx.next()?;
                self.nfa.newarc(ArcKind::Dollar { line: false }, lp, rp);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Wbdry | Token::Nwbdry => {
                let positive = matches!(self.lx.nexttype, Token::Wbdry);
                self.lx.next()?;
                self.emit_word_boundary(lp, rp, positive, true, true);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::WordStart => {
                self.lx.next()?;
                self.emit_word_boundary(lp, rp, true, false, true);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::WordEnd => {
                self.lx.next()?;
                self.emit_word_boundary(lp, rp, true, true, false);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::EscClass(ec) => {
                self.lx.next()?;
                self.emit_escaped_class(lp, rp, ec)?;
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Backref(k) => {
                self.lx.next()?;
                if k == 0 || k > self.ncap {
                    return Err(Error::BadBackref);
                }
                self.nfa.emptyarc(lp, rp);
                self.info.insert(InfoFlags::UBACKREF);
                Ok(Subre::backref(self.next_no(), lp, rp, k, 1, 1))
            }
            Token::LBracket { negated } => {
                self.lx.next()?;
                self.p_bracket(lp, rp, negated)?;
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::LParen { capturing } => {
                self.lx.next()?;
                let subno = if capturing && !self.flags.contains(CompFlags::NOSUB) {
                    self.ncap += 1;
                    self.ncap
                } else {
                    0
                };
                let (_, _, mut inner) = self.p_branch_chain(lp, rp)?;
                if !matches!(self.lx.nexttype, Token::RParen) {
                    return Err(Error::UnmatchedParen);
                }
                self.lx.next()?;
                inner.subno = subno;
                Ok(inner)
            }
            Token::Lacon { positive } => {
                self.lx.next()?;
                // Parse the constraint body into a private NFA of its
                // own (`spec.md` §4.2, "registers it with newlacon").
                let mut inner_nfa = Nfa::new();
                std::mem::swap(&mut self.nfa, &mut inner_nfa);
                let parse_result = self.p_branch_chain(self.nfa.init, self.nfa.r#final);
                std::mem::swap(&mut self.nfa, &mut inner_nfa);
                parse_result?;
                if !matches!(self.lx.nexttype, Token::RParen) {
                    return Err(Error::UnmatchedParen);
                }
                self.lx.next()?;
                let index = self.lacons.newlacon(inner_nfa);
                self.nfa.newarc(ArcKind::Lacon { index, positive }, lp, rp);
                Ok(Subre::leaf_concat(self.next_no(), lp, rp))
            }
            Token::Prefer { long } => {
                self.lx.next()?;
                self.nfa.emptyarc(lp, rp);
                let mut n = Subre::leaf_concat(self.next_no(), lp, rp);
                n.prefer = if long { crate::subre::Prefer::Longer } else { crate::subre::Prefer::Shorter };
                Ok(n)
            }
            Token::Eos | Token::Bar | Token::RParen => Err(Error::Empty),
            _ => Err(Error::BadPattern),
        }
    }

    fn emit_literal(&mut self, lp: StateId, rp: StateId, c: char) {
        if self.flags.contains(CompFlags::ICASE) {
            let upper: Vec<char> = c.to_uppercase().collect();
            let lower: Vec<char> = c.to_lowercase().collect();
            let a = self.cm.subcolor(c);
            let arc = self.nfa.newarc(ArcKind::Plain(a), lp, rp);
            self.cm.colorchain(a, arc);
            for u in upper.into_iter().chain(lower) {
                if u == c {
                    continue;
                }
                let b = self.cm.subcolor(u);
                self.cm.set_fold_partner(a, b);
                let arc = self.nfa.newarc(ArcKind::Plain(b), lp, rp);
                self.cm.colorchain(b, arc);
            }
        } else {
            let co = self.cm.subcolor(c);
            let arc = self.nfa.newarc(ArcKind::Plain(co), lp, rp);
            self.cm.colorchain(co, arc);
        }
        self.cm.okcolors(&mut self.nfa);
    }

    fn emit_escaped_class(&mut self, lp: StateId, rp: StateId, ec: crate::lexer::EscClass) -> Result<()> {
        let (pc, negated) = ec.polarity();
        if negated {
            let tmp = self.nfa.newstate();
            for v in 0u32..=0x7F {
                if let Some(c) = char::from_u32(v) {
                    if pc.matches(c) {
                        let co = self.cm.subcolor(c);
                        let a = self.nfa.newarc(ArcKind::Plain(co), lp, tmp);
                        self.cm.colorchain(co, a);
                    }
                }
            }
            self.cm.okcolors(&mut self.nfa);
            colorcomplement(&mut self.nfa, &mut self.cm, ArcKind::Plain, tmp, lp, rp);
        } else {
            for v in 0u32..=0x7F {
                if let Some(c) = char::from_u32(v) {
                    if pc.matches(c) {
                        let co = self.cm.subcolor(c);
                        let a = self.nfa.newarc(ArcKind::Plain(co), lp, rp);
                        self.cm.colorchain(co, a);
                    }
                }
            }
            self.cm.okcolors(&mut self.nfa);
        }
        Ok(())
    }

    fn emit_word_boundary(&mut self, lp: StateId, rp: StateId, positive: bool, check_left: bool, check_right: bool) {
        let (wbegin, _wend) = wordchrs(&mut self.nfa, &mut self.cm);
        let word_colors: Vec<i32> = self
            .nfa
            .outs(wbegin)
            .filter_map(|a| match self.nfa.arc(a).kind {
                ArcKind::Plain(c) => Some(c),
                _ => None,
            })
            .collect();

        let mid = self.nfa.newstate();
        // A boundary holds where exactly one side is a word character.
        // Implemented as: (Behind word AND NOT Ahead word) OR (NOT Behind
        // word AND Ahead word) for `\b`; negated for `\B`.
        let left_word = self.nfa.newstate();
        let left_nonword = self.nfa.newstate();
        for &co in &word_colors {
            let a = self.nfa.newarc(ArcKind::Behind(co), lp, left_word);
            self.cm.colorchain(co, a);
        }
        colorcomplement(&mut self.nfa, &mut self.cm, ArcKind::Behind, wbegin, lp, left_nonword);

        if positive {
            colorcomplement(&mut self.nfa, &mut self.cm, ArcKind::Ahead, wbegin, left_word, mid);
            for &co in &word_colors {
                let a = self.nfa.newarc(ArcKind::Ahead(co), left_nonword, mid);
                self.cm.colorchain(co, a);
            }
        } else {
            for &co in &word_colors {
                let a = self.nfa.newarc(ArcKind::Ahead(co), left_word, mid);
                self.cm.colorchain(co, a);
            }
            colorcomplement(&mut self.nfa, &mut self.cm, ArcKind::Ahead, wbegin, left_nonword, mid);
        }
        self.nfa.emptyarc(mid, rp);
        let _ = check_right;
    }

    fn p_bracket(&mut self, lp: StateId, rp: StateId, negated: bool) -> Result<()> {
        let mut cvec = Cvec::new();
        loop {
            match self.lx.nexttype {
                Token::End => {
                    self.lx.next()?;
                    break;
                }
                Token::Plain(c) => {
                    self.lx.next()?;
                    if matches!(self.lx.nexttype, Token::Range) {
                        self.lx.next()?;
                        let hi = match self.lx.nexttype {
                            Token::Plain(h) => h,
                            _ => return Err(Error::BadRange),
                        };
                        self.lx.next()?;
                        if hi < c {
                            return Err(Error::BadRange);
                        }
                        cvec.add_range(c, hi);
                    } else if self.flags.contains(CompFlags::ICASE) {
                        cvec.add_chr_allcases(c);
                    } else {
                        cvec.add_chr(c);
                    }
                }
                Token::Cclass(pc) => {
                    self.lx.next()?;
                    self.lx.cclass(pc, &mut cvec)?;
                }
                Token::Eclass(c) | Token::Collel(c) => {
                    self.lx.next()?;
                    cvec.add_chr(c);
                }
                Token::Eos => return Err(Error::UnmatchedBracket),
                _ => {
                    self.lx.next()?;
                }
            }
        }
        if negated {
            let tmp = self.nfa.newstate();
            for &c in &cvec.chrs {
                let co = self.cm.subcolor(c);
                let a = self.nfa.newarc(ArcKind::Plain(co), lp, tmp);
                self.cm.colorchain(co, a);
            }
            self.cm.okcolors(&mut self.nfa);
            colorcomplement(&mut self.nfa, &mut self.cm, ArcKind::Plain, tmp, lp, rp);
            if self.flags.contains(CompFlags::NLSTOP) {
                // `[^...]` never matches newline regardless of whether it
                // was explicitly excluded.
                let nlco = self.cm.subcolor('\n');
                let bad: Vec<_> = self
                    .nfa
                    .outs(lp)
                    .filter(|&a| self.nfa.arc(a).kind.color() == Some(nlco) && self.nfa.arc(a).to == rp)
                    .collect();
                for a in bad {
                    self.nfa.freearc(a);
                }
            }
        } else {
            for &c in &cvec.chrs {
                let co = self.cm.subcolor(c);
                let a = self.nfa.newarc(ArcKind::Plain(co), lp, rp);
                self.cm.colorchain(co, a);
            }
            self.cm.okcolors(&mut self.nfa);
            for ce in &cvec.ces {
                let mut cur = lp;
                for (i, &c) in ce.iter().enumerate() {
                    let co = self.cm.subcolor(c);
                    let next = if i + 1 == ce.len() { rp } else { self.nfa.newstate() };
                    let a = self.nfa.newarc(ArcKind::Plain(co), cur, next);
                    self.cm.colorchain(co, a);
                    cur = next;
                }
            }
        }
        if cvec.chrs.is_empty() && cvec.ces.is_empty() && !negated {
            return Err(Error::BadPattern);
        }
        let _ = WHITE;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_concatenation_parses() {
        let r = parse("abc", Dialect::Advanced, CompFlags::empty()).unwrap();
        assert_eq!(r.ncapture, 0);
    }

    #[test]
    fn capturing_group_increments_ncapture() {
        let r = parse("a(b)c", Dialect::Advanced, CompFlags::empty()).unwrap();
        assert_eq!(r.ncapture, 1);
    }

    #[test]
    fn noncapturing_group_does_not_increment() {
        let r = parse("a(?:b)c", Dialect::Advanced, CompFlags::empty()).unwrap();
        assert_eq!(r.ncapture, 0);
    }

    #[test]
    fn alternation_parses_both_branches() {
        let r = parse("^(?:foo|bar)$", Dialect::Advanced, CompFlags::empty()).unwrap();
        assert_eq!(r.ncapture, 0);
    }

    #[test]
    fn backref_requires_prior_capture() {
        let err = parse("\\1", Dialect::Advanced, CompFlags::empty()).unwrap_err();
        assert_eq!(err, Error::BadBackref);
    }

    #[test]
    fn bound_rejects_values_past_dupmax() {
        let err = parse("a{300}", Dialect::Advanced, CompFlags::empty()).unwrap_err();
        assert_eq!(err, Error::BadRepeat);
    }

    #[test]
    fn empty_pattern_rejected_in_extended() {
        let err = parse("", Dialect::Extended, CompFlags::empty()).unwrap_err();
        assert_eq!(err, Error::Empty);
    }

    #[test]
    fn lookahead_constraint_registers_lacon() {
        let r = parse("(?=abc)a", Dialect::Advanced, CompFlags::empty()).unwrap();
        assert_eq!(r.lacons.len(), 2); // index 0 unused + our one entry
    }
}
