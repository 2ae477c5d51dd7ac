//! End-to-end scenarios spanning the dialects, the pure-DFA fast path
//! and the dissector fallback (`spec.md` §8).

use unire::{Dialect, Regex};

#[test]
fn capturing_group_with_quantifier() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("a(b+)c").unwrap();
    let caps = re.captures("xxabbbbcyy").unwrap().unwrap();
    let whole = caps.get_match();
    assert_eq!((whole.start, whole.end), (2, 8));
    let g1 = caps.get_group(1).unwrap();
    assert_eq!((g1.start, g1.end), (3, 7));
}

#[test]
fn anchored_noncapturing_alternation() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("^(?:foo|bar)$").unwrap();
    let caps = re.captures("bar").unwrap().unwrap();
    let whole = caps.get_match();
    assert_eq!((whole.start, whole.end), (0, 3));
    assert_eq!(caps.len(), 1);
}

#[test]
fn backreference_matches_repeated_group() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("(a+)\\1").unwrap();
    let caps = re.captures("aaaa").unwrap().unwrap();
    let whole = caps.get_match();
    assert_eq!((whole.start, whole.end), (0, 4));
    let g1 = caps.get_group(1).unwrap();
    assert_eq!((g1.start, g1.end), (0, 2));
}

#[test]
fn non_greedy_quantifier_stops_at_first_match() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("a.*?b").unwrap();
    let span = re.find("aXXbYYb").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 4));
}

#[test]
fn word_class_with_icase() {
    let re = Regex::builder().dialect(Dialect::Advanced).icase(true).build("\\w+").unwrap();
    let span = re.find("___Foo123 bar").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 9));
}

#[test]
fn positive_lookahead_gates_the_match() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("(?=abc)a").unwrap();
    let span = re.find("abcd").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 1));
}

#[test]
fn negative_lookahead_rejects_the_match() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("(?!abc)a").unwrap();
    assert!(re.find("abcd").unwrap().is_none());
    let span = re.find("axyz").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 1));
}

#[test]
fn leftmost_match_wins_over_later_alternatives() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("cat|category").unwrap();
    let span = re.find("category").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 3));
}

#[test]
fn empty_pattern_matches_at_every_position_without_looping() {
    let re = Regex::new("").unwrap();
    let spans: Vec<_> = re.find_iter("ab").map(|s| (s.start, s.end)).collect();
    assert_eq!(spans, vec![(0, 0), (1, 1), (2, 2)]);
}

#[test]
fn nosub_suppresses_capture_recording() {
    let re = Regex::builder().dialect(Dialect::Advanced).nosub(true).build("a(b+)c").unwrap();
    let caps = re.captures("abbc").unwrap().unwrap();
    assert_eq!(caps.get_group(1), None);
    assert_eq!((caps.get_match().start, caps.get_match().end), (0, 4));
}

#[test]
fn find_iter_does_not_overlap_adjacent_matches() {
    let re = Regex::new("aa").unwrap();
    let spans: Vec<_> = re.find_iter("aaaa").map(|s| (s.start, s.end)).collect();
    assert_eq!(spans, vec![(0, 2), (2, 4)]);
}

#[test]
fn no_match_returns_none() {
    let re = Regex::new("xyz").unwrap();
    assert!(re.find("abc").unwrap().is_none());
    assert!(!re.is_match("abc").unwrap());
}

#[test]
fn bounded_repetition_respects_upper_bound() {
    let re = Regex::builder().dialect(Dialect::Advanced).build("a{2,3}").unwrap();
    let span = re.find("aaaa").unwrap().unwrap();
    assert_eq!((span.start, span.end), (0, 3));
}
