//! The subexpression tree: a decorated tree describing concatenation,
//! alternation, capture and backreference, used by the dissector to direct
//! sub-match dissection (`spec.md` §3, "Subre tree", and §9's "Tagged union
//! for subre").
//!
//! The original's `struct subre` is a flat struct with an operator tag
//! (`'|'`, `','`, `'b'`) and fields that only make sense for some of the
//! three operators. Per §9's design note we instead make the operator a
//! proper Rust sum type and push the per-operator fields (the alternation
//! branch list, the concatenation halves, the backreference target/bounds)
//! into their variants. Fields genuinely shared by every node -- the NFA
//! bracket, match-length preference, capture number and compacted automaton
//! -- stay on the common `Subre` struct.

use crate::cnfa::Cnfa;
use crate::nfa::StateId;

/// Match-length preference for a subexpression (`spec.md` §3, §4.2's
/// "State machine for the parser's subre context").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Prefer {
    #[default]
    NoneYet,
    Longer,
    Shorter,
}

/// Tag of [`SubreOp`] used by the dissector to dispatch without matching on
/// the full enum (kept for parity with `spec.md`'s glossary terminology).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubreKind {
    Alt,
    Concat,
    Backref,
}

#[derive(Debug)]
pub(crate) enum SubreOp {
    /// `'|'`: a chain of alternation branches, tried in order.
    Alt(Vec<Subre>),
    /// `','`: concatenation of two halves. `right` is `None` for a
    /// "singleton" subtree fully absorbed by `left` (§4.5, "with empty
    /// right subtree").
    Concat { left: Box<Subre>, right: Option<Box<Subre>> },
    /// `'b'`: backreference leaf. `group` is the target capture number
    /// (`-subno` in the original).
    Backref { group: u32, min: u16, max: u16 },
}

impl SubreOp {
    pub fn kind(&self) -> SubreKind {
        match self {
            SubreOp::Alt(_) => SubreKind::Alt,
            SubreOp::Concat { .. } => SubreKind::Concat,
            SubreOp::Backref { .. } => SubreKind::Backref,
        }
    }
}

/// A node of the subexpression tree.
#[derive(Debug)]
pub(crate) struct Subre {
    /// Node numbering, assigned during parse; used to size the dissector's
    /// retry-memory arrays (`spec.md` §4.5, "Retry memory").
    pub no: u32,
    pub op: SubreOp,
    /// NFA states bracketing this subexpression. `None` once the subtree
    /// has been fully absorbed by optimization and only the `cnfa` below
    /// remains meaningful.
    pub begin: Option<StateId>,
    pub end: Option<StateId>,
    pub prefer: Prefer,
    /// `0` = no capture, `> 0` = capture group number. Backreference
    /// targets are carried directly in `SubreOp::Backref::group` rather
    /// than as a signed `subno`, since the sum type already disambiguates
    /// "is this a backref" from "what capture number is this".
    pub subno: u32,
    /// Compacted automaton for this subtree; empty/`None` if the subtree is
    /// fully handled by its children's CNFAs.
    pub cnfa: Option<Cnfa>,
}

impl Subre {
    pub fn leaf_concat(no: u32, begin: StateId, end: StateId) -> Self {
        Subre {
            no,
            op: SubreOp::Concat { left: Box::new(Subre::placeholder(no)), right: None },
            begin: Some(begin),
            end: Some(end),
            prefer: Prefer::NoneYet,
            subno: 0,
            cnfa: None,
        }
    }

    /// An atomic leaf: a subtree with no further structure, i.e. a `subre`
    /// whose `tree == NULL` in the original. Modeled as a degenerate
    /// `Concat` with no right half and a dummy left half that is never
    /// dissected into (checked by `is_leaf`).
    fn placeholder(no: u32) -> Self {
        Subre {
            no,
            op: SubreOp::Backref { group: 0, min: 0, max: 0 },
            begin: None,
            end: None,
            prefer: Prefer::NoneYet,
            subno: 0,
            cnfa: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(&self.op, SubreOp::Concat { right: None, .. })
    }

    pub fn backref(no: u32, begin: StateId, end: StateId, group: u32, min: u16, max: u16) -> Self {
        Subre {
            no,
            op: SubreOp::Backref { group, min, max },
            begin: Some(begin),
            end: Some(end),
            prefer: Prefer::NoneYet,
            subno: 0,
            cnfa: None,
        }
    }

    pub fn alt(no: u32, branches: Vec<Subre>) -> Self {
        Subre {
            no,
            op: SubreOp::Alt(branches),
            begin: None,
            end: None,
            prefer: Prefer::NoneYet,
            subno: 0,
            cnfa: None,
        }
    }

    pub fn concat(no: u32, left: Subre, right: Subre) -> Self {
        Subre {
            no,
            op: SubreOp::Concat { left: Box::new(left), right: Some(Box::new(right)) },
            begin: None,
            end: None,
            prefer: Prefer::NoneYet,
            subno: 0,
            cnfa: None,
        }
    }

    /// Counts this node and every descendant; used to size the dissector's
    /// retry-memory arrays (`ntree` in the original's `guts`).
    pub fn count_nodes(&self) -> u32 {
        1 + match &self.op {
            SubreOp::Alt(branches) => branches.iter().map(Subre::count_nodes).sum(),
            SubreOp::Concat { left, right } => {
                left.count_nodes() + right.as_ref().map_or(0, |r| r.count_nodes())
            }
            SubreOp::Backref { .. } => 0,
        }
    }

    /// The first concrete preference found walking this subtree, or
    /// `NoneYet` if none is set anywhere (§4.2: "the first concrete LONGER
    /// or SHORTER wins").
    pub fn resolved_prefer(&self) -> Prefer {
        if self.prefer != Prefer::NoneYet {
            return self.prefer;
        }
        match &self.op {
            SubreOp::Alt(branches) => {
                branches.iter().map(Subre::resolved_prefer).find(|p| *p != Prefer::NoneYet).unwrap_or(Prefer::NoneYet)
            }
            SubreOp::Concat { left, right } => {
                let lp = left.resolved_prefer();
                if lp != Prefer::NoneYet {
                    return lp;
                }
                right.as_ref().map_or(Prefer::NoneYet, |r| r.resolved_prefer())
            }
            SubreOp::Backref { .. } => Prefer::NoneYet,
        }
    }
}
