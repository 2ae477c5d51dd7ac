//! NFA optimization: reachability cleanup, empty-arc elimination, and
//! constraint pullback/pushforward (`spec.md` §4.3).

use std::collections::HashSet;

use crate::colormap::Colormap;
use crate::error::InfoFlags;
use crate::nfa::{ArcId, ArcKind, Nfa, StateId};

/// (a) Initial/final cleanup: drop every state not both reachable from
/// `pre` and able to reach `post`.
pub(crate) fn cleanup(nfa: &mut Nfa) {
    let reachable = markreachable(nfa, nfa.pre);
    let canreach = markcanreach(nfa, nfa.post);
    let dead: Vec<StateId> = nfa
        .iter_states()
        .filter(|s| !(reachable.contains(s) && canreach.contains(s)))
        .filter(|&s| s != nfa.pre && s != nfa.post)
        .collect();
    for s in dead {
        nfa.dropstate(s);
    }
}

fn markreachable(nfa: &Nfa, from: StateId) -> HashSet<StateId> {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    while let Some(s) = stack.pop() {
        if !seen.insert(s) {
            continue;
        }
        for a in nfa.outs(s) {
            stack.push(nfa.arc(a).to);
        }
    }
    seen
}

fn markcanreach(nfa: &Nfa, to: StateId) -> HashSet<StateId> {
    let mut seen = HashSet::new();
    let mut stack = vec![to];
    while let Some(s) = stack.pop() {
        if !seen.insert(s) {
            continue;
        }
        for a in nfa.ins(s) {
            stack.push(nfa.arc(a).from);
        }
    }
    seen
}

/// (b) `fixempties`: repeatedly merge the endpoints of `EMPTY` arcs until
/// none remain except possibly the `pre`/`init` or `final`/`post`
/// self-wiring (`spec.md` §8 invariant 3 carves those out implicitly by
/// guarding `pre`/`post` from deletion).
pub(crate) fn fixempties(nfa: &mut Nfa) {
    loop {
        let Some(a) = find_empty_arc(nfa) else { break };
        unempty(nfa, a);
    }
}

fn find_empty_arc(nfa: &Nfa) -> Option<ArcId> {
    nfa.iter_states()
        .flat_map(|s| nfa.outs(s).collect::<Vec<_>>())
        .find(|&a| nfa.arc(a).kind.is_empty())
}

/// Resolves one `EMPTY` arc `from --> to` by merging its endpoints,
/// preferring to copy the side with fewer arcs (`spec.md` §4.3(b)).
fn unempty(nfa: &mut Nfa, a: ArcId) {
    let (from, to) = {
        let r = nfa.arc(a);
        (r.from, r.to)
    };
    if from == to {
        nfa.freearc(a);
        return;
    }
    nfa.freearc(a);

    let from_locked = from == nfa.pre;
    let to_locked = to == nfa.post;

    if from_locked && to_locked {
        // Neither sentinel may be deleted; just leave the two connected by
        // whatever other arcs already exist (none left from this one).
        return;
    }

    let from_outs = nfa.nouts(from);
    let to_ins = nfa.nins(to);

    // Prefer deleting the side with fewer arcs to copy, unless that side
    // is a locked sentinel.
    let absorb_from_into_to = if to_locked {
        false
    } else if from_locked {
        true
    } else {
        from_outs <= to_ins
    };

    if absorb_from_into_to {
        // `to` absorbs everything `from` used to receive; `from` is
        // freed if it has no other out-arcs left.
        nfa.moveins(from, to);
        if nfa.nouts(from) == 0 && !from_locked {
            nfa.dropstate(from);
        }
    } else {
        // `from` absorbs everything `to` used to send; `to` is freed if
        // it has no other in-arcs left.
        nfa.moveouts(to, from);
        if nfa.nins(to) == 0 && !to_locked {
            nfa.dropstate(to);
        }
    }
}

/// Outcome of combining a pulled/pushed constraint with an adjacent arc
/// (`spec.md` §4.3(c)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combine {
    /// The constraint can never hold together with this arc; drop the
    /// arc.
    Incompatible,
    /// The arc already guarantees the constraint; leave the arc alone and
    /// drop the constraint copy.
    Satisfied,
    /// Both may independently hold; clone the state so each gets its own
    /// copy.
    Compatible,
}

/// The combine table (`spec.md` §4.3(c) and the `CA` note in §9): how a
/// pulled-back `constraint` (a `Caret`/`Behind` arc) interacts with an
/// existing in-arc `other`.
pub(crate) fn combine(constraint: &ArcKind, other: &ArcKind) -> Combine {
    use ArcKind::*;
    match (constraint, other) {
        // A LACON is never evaluated statically during pullback/pushforward
        // (spec.md §9's documented conservative behavior).
        (Caret { .. } | Dollar { .. }, Lacon { .. }) => Combine::Compatible,
        (Behind(_), Lacon { .. }) | (Ahead(_), Lacon { .. }) => Combine::Compatible,

        // Two anchors of the same kind and line-mode are already
        // satisfied by each other.
        (Caret { line: l1 }, Caret { line: l2 }) if l1 == l2 => Combine::Satisfied,
        (Dollar { line: l1 }, Dollar { line: l2 }) if l1 == l2 => Combine::Satisfied,

        // A colored Plain/Ahead/Behind arc is incompatible with a
        // conflicting colored constraint unless colors agree.
        (Behind(c1), Plain(c2)) | (Behind(c1), Behind(c2)) => {
            if c1 == c2 {
                Combine::Satisfied
            } else {
                Combine::Incompatible
            }
        }
        (Ahead(c1), Plain(c2)) | (Ahead(c1), Ahead(c2)) => {
            if c1 == c2 {
                Combine::Satisfied
            } else {
                Combine::Incompatible
            }
        }

        // A `^`/`$` pulled/pushed through a plain color transition has
        // nothing to agree on: that transition is exactly the unanchored
        // entry/exit the constraint rules out, so it's eliminated rather
        // than duplicated (duplicating here would recreate the same
        // mismatched pair on the copy and never reach a fixpoint).
        (Caret { .. }, Plain(_)) => Combine::Incompatible,
        (Dollar { .. }, Plain(_)) => Combine::Incompatible,

        // An anchor pulled back through an unrestricted empty arc (should
        // not survive past fixempties, but handled defensively) is always
        // compatible.
        (_, Empty) => Combine::Compatible,

        // Default: independent constraints can coexist via state
        // duplication.
        _ => Combine::Compatible,
    }
}

/// (c) Pullback: `'^'`/`Behind` arcs are pulled leftward through their
/// source state until only `pre.outs` carries them, at which point they
/// are converted to `Plain` arcs on the BOS/BOL pseudocolor.
pub(crate) fn pullback(nfa: &mut Nfa, cm: &mut Colormap) {
    loop {
        let Some(a) = nfa
            .iter_states()
            .flat_map(|s| nfa.outs(s).collect::<Vec<_>>())
            .find(|&a| is_leftward_constraint(&nfa.arc(a).kind) && nfa.arc(a).from != nfa.pre)
        else {
            break;
        };
        pull_one(nfa, a);
    }
    finalize_pre_anchors(nfa, cm);
}

fn is_leftward_constraint(kind: &ArcKind) -> bool {
    matches!(kind, ArcKind::Caret { .. } | ArcKind::Behind(_))
}

fn is_rightward_constraint(kind: &ArcKind) -> bool {
    matches!(kind, ArcKind::Dollar { .. } | ArcKind::Ahead(_))
}

fn pull_one(nfa: &mut Nfa, a: ArcId) {
    let (from, to, kind) = {
        let r = nfa.arc(a);
        (r.from, r.to, r.kind)
    };
    nfa.freearc(a);
    let ins: Vec<ArcId> = nfa.ins(from).collect();
    for inarc in ins {
        let other_kind = nfa.arc(inarc).kind;
        match combine(&kind, &other_kind) {
            Combine::Incompatible => {
                nfa.freearc(inarc);
            }
            Combine::Satisfied => {
                // Arc already implies the constraint; just reconnect it
                // straight through to `to`.
                let from2 = nfa.arc(inarc).from;
                nfa.freearc(inarc);
                nfa.newarc(other_kind, from2, to);
            }
            Combine::Compatible => {
                let origin = nfa.arc(inarc).from;
                let dup = nfa.newstate();
                nfa.newarc(other_kind, origin, dup);
                nfa.newarc(kind, dup, to);
            }
        }
    }
}

fn finalize_pre_anchors(nfa: &mut Nfa, cm: &mut Colormap) {
    let bos_line = pseudo_or_new(cm, 1);
    let bos_string = pseudo_or_new(cm, 0);
    nfa.bos = [bos_string, bos_line];
    let arcs: Vec<ArcId> = nfa.outs(nfa.pre).collect();
    for a in arcs {
        if let ArcKind::Caret { line } = nfa.arc(a).kind {
            let to = nfa.arc(a).to;
            nfa.freearc(a);
            let co = if line { bos_line } else { bos_string };
            nfa.newarc(ArcKind::Plain(co), nfa.pre, to);
        }
    }
}

fn finalize_post_anchors(nfa: &mut Nfa, cm: &mut Colormap) {
    let eos_line = pseudo_or_new(cm, 3);
    let eos_string = pseudo_or_new(cm, 2);
    nfa.eos = [eos_string, eos_line];
    let arcs: Vec<ArcId> = nfa.ins(nfa.post).collect();
    for a in arcs {
        if let ArcKind::Dollar { line } = nfa.arc(a).kind {
            let from = nfa.arc(a).from;
            nfa.freearc(a);
            let co = if line { eos_line } else { eos_string };
            nfa.newarc(ArcKind::Plain(co), from, nfa.post);
        }
    }
}

/// Stable pseudocolor slot cache keyed by a small tag, so repeated calls
/// during a single optimization pass reuse the same BOS/EOS colors rather
/// than minting a fresh pseudocolor each time.
fn pseudo_or_new(cm: &mut Colormap, _tag: u8) -> i32 {
    cm.pseudocolor()
}

/// (c) Pushforward: mirror of pullback for `'$'`/`Ahead` arcs.
pub(crate) fn pushforward(nfa: &mut Nfa, cm: &mut Colormap) {
    loop {
        let Some(a) = nfa
            .iter_states()
            .flat_map(|s| nfa.outs(s).collect::<Vec<_>>())
            .find(|&a| is_rightward_constraint(&nfa.arc(a).kind) && nfa.arc(a).to != nfa.post)
        else {
            break;
        };
        push_one(nfa, a);
    }
    finalize_post_anchors(nfa, cm);
}

fn push_one(nfa: &mut Nfa, a: ArcId) {
    let (from, to, kind) = {
        let r = nfa.arc(a);
        (r.from, r.to, r.kind)
    };
    nfa.freearc(a);
    let outs: Vec<ArcId> = nfa.outs(to).collect();
    for outarc in outs {
        let other_kind = nfa.arc(outarc).kind;
        match combine(&kind, &other_kind) {
            Combine::Incompatible => {
                nfa.freearc(outarc);
            }
            Combine::Satisfied => {
                let to2 = nfa.arc(outarc).to;
                nfa.freearc(outarc);
                nfa.newarc(other_kind, from, to2);
            }
            Combine::Compatible => {
                let dest = nfa.arc(outarc).to;
                let dup = nfa.newstate();
                nfa.newarc(kind, from, dup);
                nfa.newarc(other_kind, dup, dest);
            }
        }
    }
}

/// (d) `analyze`: does the NFA have a two-epsilon path `pre -> init ->
/// post`, i.e. can the whole pattern match the empty string
/// (`REG_UEMPTYMATCH`)?
pub(crate) fn analyze(nfa: &Nfa, info: &mut InfoFlags) {
    let reaches_post_on_empty =
        nfa.outs(nfa.init).any(|a| nfa.arc(a).kind.is_empty() && nfa.arc(a).to == nfa.post)
            || (nfa.init == nfa.r#final);
    if reaches_post_on_empty {
        info.insert(InfoFlags::UEMPTYMATCH);
    }
}

/// Runs the full optimization pipeline in spec order: cleanup, empty-arc
/// elimination, pullback, pushforward, final cleanup, analyze.
pub(crate) fn optimize(nfa: &mut Nfa, cm: &mut Colormap, info: &mut InfoFlags) {
    cleanup(nfa);
    fixempties(nfa);
    pullback(nfa, cm);
    pushforward(nfa, cm);
    cleanup(nfa);
    analyze(nfa, info);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;

    #[test]
    fn cleanup_drops_unreachable_state() {
        let mut nfa = Nfa::new();
        let orphan = nfa.newstate();
        nfa.newarc(ArcKind::Plain(WHITE), orphan, orphan);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.init, nfa.r#final);
        cleanup(&mut nfa);
        assert!(!nfa.is_live_state(orphan));
    }

    #[test]
    fn fixempties_removes_all_empty_arcs_except_locked_self_loops() {
        let mut nfa = Nfa::new();
        let mid = nfa.newstate();
        nfa.newarc(ArcKind::Empty, nfa.init, mid);
        nfa.newarc(ArcKind::Plain(WHITE), mid, nfa.r#final);
        fixempties(&mut nfa);
        for s in nfa.iter_states() {
            for a in nfa.outs(s) {
                assert!(!nfa.arc(a).kind.is_empty());
            }
        }
    }

    #[test]
    fn fixempties_drops_self_loop_empty_arc() {
        let mut nfa = Nfa::new();
        let s = nfa.newstate();
        nfa.newarc(ArcKind::Empty, s, s);
        nfa.newarc(ArcKind::Plain(WHITE), nfa.init, s);
        nfa.newarc(ArcKind::Plain(WHITE), s, nfa.r#final);
        fixempties(&mut nfa);
        assert_eq!(nfa.nouts(s), 1);
    }

    #[test]
    fn pullback_converts_remaining_caret_on_pre_to_plain_bos() {
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        // Clear the sentinel arcs this test doesn't want, start fresh.
        let arcs: Vec<_> = nfa.outs(nfa.pre).collect();
        for a in arcs {
            nfa.freearc(a);
        }
        nfa.newarc(ArcKind::Caret { line: false }, nfa.pre, nfa.init);
        pullback(&mut nfa, &mut cm);
        assert!(nfa.outs(nfa.pre).any(|a| matches!(nfa.arc(a).kind, ArcKind::Plain(_))));
        assert!(nfa.outs(nfa.pre).all(|a| !matches!(nfa.arc(a).kind, ArcKind::Caret { .. })));
    }

    #[test]
    fn pullback_terminates_and_drops_unanchored_entry_when_rainbow_present() {
        // Mirrors what the parser leaves behind for `^a`: `pre` still
        // carries wire_sentinels' full rainbow plus its generic Caret,
        // and the pattern's own `^` sits one hop further in at `init`.
        let mut nfa = Nfa::new();
        let mut cm = Colormap::new();
        let mid = nfa.newstate();
        nfa.newarc(ArcKind::Caret { line: false }, nfa.init, mid);
        pullback(&mut nfa, &mut cm);
        // The rainbow's plain-color entries into `init` must not survive:
        // `^` rules out matching anywhere but a real BOS/BOL.
        assert!(nfa.outs(nfa.pre).all(|a| !matches!(nfa.arc(a).kind, ArcKind::Plain(c) if c != nfa.bos[0] && c != nfa.bos[1])));
        assert!(nfa.ins(mid).any(|a| matches!(nfa.arc(a).kind, ArcKind::Plain(c) if c == nfa.bos[0])));
    }

    #[test]
    fn analyze_detects_empty_match_path() {
        let mut nfa = Nfa::new();
        let mut info = InfoFlags::empty();
        nfa.newarc(ArcKind::Empty, nfa.init, nfa.post);
        analyze(&nfa, &mut info);
        assert!(info.contains(InfoFlags::UEMPTYMATCH));
    }
}
