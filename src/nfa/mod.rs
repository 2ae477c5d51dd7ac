//! NFA graph: a state/arc arena with in-chains, out-chains and color
//! chains, per `spec.md` §3 ("NFA state", "NFA arc") and §4.2.
//!
//! The original links states and arcs with raw pointers and three
//! intrusive doubly linked chains per arc (`from.outs`, `to.ins`, the
//! color chain). Per §9's design note ("Cycles and back-pointers"), this
//! is reimplemented with arena indices: `states`/`arcs` are `Vec`s, chain
//! links are `Option<ArcId>`/`Option<StateId>`, and freeing an arc or
//! state is an O(1) unlink plus a push onto a free list for reuse.

pub mod build;
pub mod optimize;

use crate::color::Color;

pub type StateId = u32;
pub type ArcId = u32;

/// Arc payload, mirroring `spec.md` §3's arc `type` enumeration. Caret/
/// Dollar and Lacon carry their value/polarity directly instead of
/// overloading the `color` field the way the original does, since our arc
/// type is already a Rust sum type (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcKind {
    /// Consumes one code point of the given color.
    Plain(Color),
    /// Zero-width: the next code point must have this color.
    Ahead(Color),
    /// Zero-width: the previous code point must have this color.
    Behind(Color),
    /// Unrestricted epsilon transition.
    Empty,
    /// `^`; `line == true` means "also after a newline", `false` means
    /// string-start only.
    Caret { line: bool },
    /// `$`; `line == true` means "also before a newline".
    Dollar { line: bool },
    /// References lookahead-constraint sub-NFA `index` (`spec.md` §4.2,
    /// "Lookahead constraint"). `positive == true` for `(?=...)`.
    Lacon { index: u32, positive: bool },
}

impl ArcKind {
    pub fn is_empty(&self) -> bool {
        matches!(self, ArcKind::Empty)
    }

    pub fn color(&self) -> Option<Color> {
        match *self {
            ArcKind::Plain(c) | ArcKind::Ahead(c) | ArcKind::Behind(c) => Some(c),
            _ => None,
        }
    }

    /// Same variant, recolored to `co`. A no-op on uncolored kinds.
    pub fn with_color(&self, co: Color) -> ArcKind {
        match *self {
            ArcKind::Plain(_) => ArcKind::Plain(co),
            ArcKind::Ahead(_) => ArcKind::Ahead(co),
            ArcKind::Behind(_) => ArcKind::Behind(co),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateFlag {
    PreInitial,
    PostFinal,
    Ordinary,
}

#[derive(Debug, Clone)]
pub(crate) struct StateRec {
    pub flag: StateFlag,
    pub ins: Option<ArcId>,
    pub outs: Option<ArcId>,
    /// Marks this as the capture-region's `init` endpoint.
    pub is_init: bool,
    /// Marks this as the capture-region's `final` endpoint.
    pub is_final: bool,
}

impl StateRec {
    fn fresh(flag: StateFlag) -> Self {
        StateRec { flag, ins: None, outs: None, is_init: false, is_final: false }
    }

    pub fn nouts(&self, arcs: &[ArcSlot]) -> usize {
        chain_len(arcs, self.outs, Dir::Out)
    }

    pub fn nins(&self, arcs: &[ArcSlot]) -> usize {
        chain_len(arcs, self.ins, Dir::In)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ArcRec {
    pub kind: ArcKind,
    pub from: StateId,
    pub to: StateId,
    pub out_next: Option<ArcId>,
    pub out_prev: Option<ArcId>,
    pub in_next: Option<ArcId>,
    pub in_prev: Option<ArcId>,
    pub color_next: Option<ArcId>,
    pub color_prev: Option<ArcId>,
}

#[derive(Debug, Clone)]
pub(crate) enum StateSlot {
    Live(StateRec),
    Free,
}

#[derive(Debug, Clone)]
pub(crate) enum ArcSlot {
    Live(ArcRec),
    Free,
}

#[derive(Clone, Copy)]
enum Dir {
    In,
    Out,
}

fn chain_len(arcs: &[ArcSlot], head: Option<ArcId>, dir: Dir) -> usize {
    let mut n = 0;
    let mut cur = head;
    while let Some(id) = cur {
        n += 1;
        cur = match &arcs[id as usize] {
            ArcSlot::Live(a) => match dir {
                Dir::In => a.in_next,
                Dir::Out => a.out_next,
            },
            ArcSlot::Free => None,
        };
    }
    n
}

/// The NFA graph under construction. Owns states, arcs, and the four
/// sentinel states (`spec.md` §4.2: "A fresh NFA starts with four states
/// in order: post, pre, init, final").
#[derive(Debug, Clone)]
pub struct Nfa {
    pub(crate) states: Vec<StateSlot>,
    pub(crate) arcs: Vec<ArcSlot>,
    free_states: Vec<StateId>,
    free_arcs: Vec<ArcId>,
    pub post: StateId,
    pub pre: StateId,
    pub init: StateId,
    pub r#final: StateId,
    /// Colors assigned to BOS/BOL (index 0/1), filled in by `specialcolors`
    /// during optimization (`spec.md` §3, "CNFA").
    pub bos: [Color; 2],
    pub eos: [Color; 2],
}

impl Nfa {
    pub fn new() -> Self {
        let mut nfa = Nfa {
            states: Vec::new(),
            arcs: Vec::new(),
            free_states: Vec::new(),
            free_arcs: Vec::new(),
            post: 0,
            pre: 0,
            init: 0,
            r#final: 0,
            bos: [-1, -1],
            eos: [-1, -1],
        };
        nfa.post = nfa.alloc_state(StateFlag::PostFinal);
        nfa.pre = nfa.alloc_state(StateFlag::PreInitial);
        nfa.init = nfa.alloc_state(StateFlag::Ordinary);
        nfa.r#final = nfa.alloc_state(StateFlag::Ordinary);
        nfa.state_mut(nfa.init).is_init = true;
        nfa.state_mut(nfa.r#final).is_final = true;
        nfa
    }

    fn alloc_state(&mut self, flag: StateFlag) -> StateId {
        if let Some(id) = self.free_states.pop() {
            self.states[id as usize] = StateSlot::Live(StateRec::fresh(flag));
            return id;
        }
        self.states.push(StateSlot::Live(StateRec::fresh(flag)));
        (self.states.len() - 1) as StateId
    }

    pub fn newstate(&mut self) -> StateId {
        self.alloc_state(StateFlag::Ordinary)
    }

    pub(crate) fn state(&self, s: StateId) -> &StateRec {
        match &self.states[s as usize] {
            StateSlot::Live(r) => r,
            StateSlot::Free => panic!("use of freed NFA state {s}"),
        }
    }

    pub(crate) fn state_mut(&mut self, s: StateId) -> &mut StateRec {
        match &mut self.states[s as usize] {
            StateSlot::Live(r) => r,
            StateSlot::Free => panic!("use of freed NFA state {s}"),
        }
    }

    pub fn is_live_state(&self, s: StateId) -> bool {
        matches!(self.states[s as usize], StateSlot::Live(_))
    }

    pub fn is_live_arc(&self, a: ArcId) -> bool {
        matches!(self.arcs[a as usize], ArcSlot::Live(_))
    }

    /// Recolors a `Plain`/`Ahead`/`Behind` arc in place (`okcolors`'
    /// "parent empty, retarget" case).
    pub fn recolor_arc(&mut self, a: ArcId, co: Color) {
        let kind = self.arc(a).kind.with_color(co);
        self.arc_mut(a).kind = kind;
    }

    pub(crate) fn arc(&self, a: ArcId) -> &ArcRec {
        match &self.arcs[a as usize] {
            ArcSlot::Live(r) => r,
            ArcSlot::Free => panic!("use of freed NFA arc {a}"),
        }
    }

    fn arc_mut(&mut self, a: ArcId) -> &mut ArcRec {
        match &mut self.arcs[a as usize] {
            ArcSlot::Live(r) => r,
            ArcSlot::Free => panic!("use of freed NFA arc {a}"),
        }
    }

    /// All states currently live, in arena order (stands in for the
    /// original's `nfa->states` traversal chain; order doesn't matter for
    /// correctness, only that every live state is visited once).
    pub fn iter_states(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.states.len() as StateId).filter(move |&s| self.is_live_state(s))
    }

    pub fn outs(&self, s: StateId) -> ArcChainIter<'_> {
        ArcChainIter { nfa: self, cur: self.state(s).outs, dir: Dir::Out }
    }

    pub fn ins(&self, s: StateId) -> ArcChainIter<'_> {
        ArcChainIter { nfa: self, cur: self.state(s).ins, dir: Dir::In }
    }

    pub fn nouts(&self, s: StateId) -> usize {
        self.state(s).nouts(&self.arcs)
    }

    pub fn nins(&self, s: StateId) -> usize {
        self.state(s).nins(&self.arcs)
    }

    /// `newarc`: allocate an arc `(from, to, kind)` and link it onto
    /// `from`'s out-chain and `to`'s in-chain. Color chain linkage (for
    /// `Plain`/`Ahead`/`Behind`) is the caller's job via
    /// [`Nfa::link_color_chain`], since the color descriptor lives in the
    /// colormap, not the NFA.
    pub fn newarc(&mut self, kind: ArcKind, from: StateId, to: StateId) -> ArcId {
        let id = if let Some(id) = self.free_arcs.pop() {
            id
        } else {
            self.arcs.push(ArcSlot::Free);
            (self.arcs.len() - 1) as ArcId
        };
        self.arcs[id as usize] = ArcSlot::Live(ArcRec {
            kind,
            from,
            to,
            out_next: None,
            out_prev: None,
            in_next: None,
            in_prev: None,
            color_next: None,
            color_prev: None,
        });

        // push-front onto from's outs
        let old_out_head = self.state(from).outs;
        self.arc_mut(id).out_next = old_out_head;
        if let Some(h) = old_out_head {
            self.arc_mut(h).out_prev = Some(id);
        }
        self.state_mut(from).outs = Some(id);

        // push-front onto to's ins
        let old_in_head = self.state(to).ins;
        self.arc_mut(id).in_next = old_in_head;
        if let Some(h) = old_in_head {
            self.arc_mut(h).in_prev = Some(id);
        }
        self.state_mut(to).ins = Some(id);

        id
    }

    /// Unlinks `a` from both its chains and frees it (`freearc`). Does
    /// *not* touch the color chain -- see [`Nfa::unlink_color_chain`],
    /// which callers invoke first when the arc is colored.
    pub fn freearc(&mut self, a: ArcId) {
        let (from, to, out_next, out_prev, in_next, in_prev) = {
            let r = self.arc(a);
            (r.from, r.to, r.out_next, r.out_prev, r.in_next, r.in_prev)
        };
        match out_prev {
            Some(p) => self.arc_mut(p).out_next = out_next,
            None => self.state_mut(from).outs = out_next,
        }
        if let Some(n) = out_next {
            self.arc_mut(n).out_prev = out_prev;
        }
        match in_prev {
            Some(p) => self.arc_mut(p).in_next = in_next,
            None => self.state_mut(to).ins = in_next,
        }
        if let Some(n) = in_next {
            self.arc_mut(n).in_prev = in_prev;
        }
        self.arcs[a as usize] = ArcSlot::Free;
        self.free_arcs.push(a);
    }

    /// `findarc`: first out-arc of `state` matching this discriminant and
    /// (for colored kinds) color.
    pub fn findarc(&self, state: StateId, want: &ArcKind) -> Option<ArcId> {
        self.outs(state).find(|&a| arc_kind_matches(&self.arc(a).kind, want))
    }

    /// `moveins`: every in-arc of `from` is redirected to land on `to`
    /// instead (used by `fixempties`/`repeat`'s "absorb" cases).
    pub fn moveins(&mut self, from: StateId, to: StateId) {
        let mut cur = self.state(from).ins;
        self.state_mut(from).ins = None;
        while let Some(a) = cur {
            let next = self.arc(a).in_next;
            self.arc_mut(a).to = to;
            // relink onto to's ins, front
            self.arc_mut(a).in_prev = None;
            let old_head = self.state(to).ins;
            self.arc_mut(a).in_next = old_head;
            if let Some(h) = old_head {
                self.arc_mut(h).in_prev = Some(a);
            }
            self.state_mut(to).ins = Some(a);
            cur = next;
        }
    }

    /// `moveouts`: every out-arc of `from` is redirected to originate at
    /// `to` instead.
    pub fn moveouts(&mut self, from: StateId, to: StateId) {
        let mut cur = self.state(from).outs;
        self.state_mut(from).outs = None;
        while let Some(a) = cur {
            let next = self.arc(a).out_next;
            self.arc_mut(a).from = to;
            self.arc_mut(a).out_prev = None;
            let old_head = self.state(to).outs;
            self.arc_mut(a).out_next = old_head;
            if let Some(h) = old_head {
                self.arc_mut(h).out_prev = Some(a);
            }
            self.state_mut(to).outs = Some(a);
            cur = next;
        }
    }

    /// `copyins`: like `moveins` but `from` keeps its in-arcs too.
    pub fn copyins(&mut self, from: StateId, to: StateId) {
        let kinds: Vec<(ArcKind, StateId)> =
            self.ins(from).map(|a| (self.arc(a).kind, self.arc(a).from)).collect();
        for (kind, src) in kinds {
            self.newarc(kind, src, to);
        }
    }

    /// `copyouts`: like `moveouts` but `from` keeps its out-arcs too.
    pub fn copyouts(&mut self, from: StateId, to: StateId) {
        let kinds: Vec<(ArcKind, StateId)> =
            self.outs(from).map(|a| (self.arc(a).kind, self.arc(a).to)).collect();
        for (kind, dst) in kinds {
            self.newarc(kind, to, dst);
        }
    }

    /// `cparc`: clone the type/color of `tmpl` onto a fresh arc `from ->
    /// to`.
    pub fn cparc(&mut self, tmpl: ArcId, from: StateId, to: StateId) -> ArcId {
        let kind = self.arc(tmpl).kind;
        self.newarc(kind, from, to)
    }

    /// `freestate`: release a state back to the free list. Debug-asserts
    /// it has no remaining arcs, matching §7's assertion policy ("state is
    /// reachable in compacted NFA" and friends).
    pub fn freestate(&mut self, s: StateId) {
        debug_assert!(self.state(s).ins.is_none(), "freeing state with live in-arcs");
        debug_assert!(self.state(s).outs.is_none(), "freeing state with live out-arcs");
        self.states[s as usize] = StateSlot::Free;
        self.free_states.push(s);
    }

    /// `dropstate`: free every remaining arc touching `s`, then the state
    /// itself.
    pub fn dropstate(&mut self, s: StateId) {
        let outs: Vec<ArcId> = self.outs(s).collect();
        for a in outs {
            self.freearc(a);
        }
        let ins: Vec<ArcId> = self.ins(s).collect();
        for a in ins {
            self.freearc(a);
        }
        self.freestate(s);
    }

    /// `emptyarc`: an unrestricted epsilon transition.
    pub fn emptyarc(&mut self, from: StateId, to: StateId) -> ArcId {
        self.newarc(ArcKind::Empty, from, to)
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}

fn arc_kind_matches(have: &ArcKind, want: &ArcKind) -> bool {
    std::mem::discriminant(have) == std::mem::discriminant(want)
        && have.color() == want.color()
}

pub struct ArcChainIter<'a> {
    nfa: &'a Nfa,
    cur: Option<ArcId>,
    dir: Dir,
}

impl<'a> Iterator for ArcChainIter<'a> {
    type Item = ArcId;

    fn next(&mut self) -> Option<ArcId> {
        let id = self.cur?;
        let a = self.nfa.arc(id);
        self.cur = match self.dir {
            Dir::In => a.in_next,
            Dir::Out => a.out_next,
        };
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_nfa_has_four_sentinel_states() {
        let nfa = Nfa::new();
        assert_eq!(nfa.iter_states().count(), 4);
        assert!(nfa.state(nfa.pre).flag == StateFlag::PreInitial);
        assert!(nfa.state(nfa.post).flag == StateFlag::PostFinal);
        assert!(nfa.state(nfa.init).is_init);
        assert!(nfa.state(nfa.r#final).is_final);
    }

    #[test]
    fn newarc_links_both_chains() {
        let mut nfa = Nfa::new();
        let a = nfa.newarc(ArcKind::Plain(0), nfa.init, nfa.r#final);
        assert_eq!(nfa.nouts(nfa.init), 1);
        assert_eq!(nfa.nins(nfa.r#final), 1);
        assert_eq!(nfa.outs(nfa.init).next(), Some(a));
    }

    #[test]
    fn freearc_unlinks_cleanly() {
        let mut nfa = Nfa::new();
        let s1 = nfa.newstate();
        let s2 = nfa.newstate();
        let a1 = nfa.newarc(ArcKind::Plain(0), s1, s2);
        let _a2 = nfa.newarc(ArcKind::Plain(1), s1, s2);
        assert_eq!(nfa.nouts(s1), 2);
        nfa.freearc(a1);
        assert_eq!(nfa.nouts(s1), 1);
        assert_eq!(nfa.nins(s2), 1);
    }

    #[test]
    fn moveins_redirects_all_inarcs() {
        let mut nfa = Nfa::new();
        let a = nfa.newstate();
        let b = nfa.newstate();
        let c = nfa.newstate();
        nfa.newarc(ArcKind::Plain(0), a, b);
        nfa.newarc(ArcKind::Plain(1), a, b);
        nfa.moveins(b, c);
        assert_eq!(nfa.nins(b), 0);
        assert_eq!(nfa.nins(c), 2);
    }

    #[test]
    fn copyouts_preserves_source_arcs() {
        let mut nfa = Nfa::new();
        let a = nfa.newstate();
        let b = nfa.newstate();
        let c = nfa.newstate();
        nfa.newarc(ArcKind::Plain(0), a, b);
        nfa.copyouts(a, c);
        assert_eq!(nfa.nouts(a), 2);
        assert_eq!(nfa.nouts(c), 1);
    }

    #[test]
    fn dropstate_frees_all_touching_arcs() {
        let mut nfa = Nfa::new();
        let a = nfa.newstate();
        let b = nfa.newstate();
        let c = nfa.newstate();
        nfa.newarc(ArcKind::Plain(0), a, b);
        nfa.newarc(ArcKind::Plain(0), b, c);
        nfa.dropstate(b);
        assert_eq!(nfa.nouts(a), 0);
        assert_eq!(nfa.nins(c), 0);
    }
}
