//! Public match/capture types (`SPEC_FULL.md` §B, "Captures
//! ergonomics").

use std::collections::HashMap;
use std::ops::Range;

/// A single match span, in code-point offsets into the searched input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A whole-pattern match with its capture groups.
#[derive(Debug, Clone)]
pub struct Captures {
    whole: Span,
    groups: Vec<Option<Span>>,
    names: HashMap<String, usize>,
}

impl Captures {
    pub(crate) fn new(whole: (usize, usize), groups: Vec<Option<(usize, usize)>>, names: HashMap<String, usize>) -> Self {
        Captures {
            whole: Span { start: whole.0, end: whole.1 },
            groups: groups.into_iter().map(|g| g.map(|(s, e)| Span { start: s, end: e })).collect(),
            names,
        }
    }

    /// The whole-match span (group 0).
    pub fn get_match(&self) -> Span {
        self.whole
    }

    /// `get_group(n)`: span of capture group `n` (`1..=ngroups`), or
    /// `None` if it did not participate in the match.
    pub fn get_group(&self, n: usize) -> Option<Span> {
        if n == 0 {
            return Some(self.whole);
        }
        self.groups.get(n).copied().flatten()
    }

    /// `get_group_by_name(name)`: looks up a named group's index first.
    pub fn get_group_by_name(&self, name: &str) -> Option<Span> {
        let n = *self.names.get(name)?;
        self.get_group(n)
    }

    pub fn len(&self) -> usize {
        self.groups.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_zero_is_the_whole_match() {
        let caps = Captures::new((0, 5), vec![], HashMap::new());
        assert_eq!(caps.get_group(0), Some(Span { start: 0, end: 5 }));
    }

    #[test]
    fn unmatched_group_is_none() {
        let caps = Captures::new((0, 5), vec![None, Some((1, 3))], HashMap::new());
        assert_eq!(caps.get_group(1), None);
        assert_eq!(caps.get_group(2), Some(Span { start: 1, end: 3 }));
    }

    #[test]
    fn named_group_resolves_through_table() {
        let mut names = HashMap::new();
        names.insert("year".to_string(), 1);
        let caps = Captures::new((0, 4), vec![Some((0, 4))], names);
        assert_eq!(caps.get_group_by_name("year"), Some(Span { start: 0, end: 4 }));
        assert_eq!(caps.get_group_by_name("missing"), None);
    }
}
