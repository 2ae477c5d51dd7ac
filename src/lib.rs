/*!
A Unicode-aware regular expression engine built around a compact
color-mapped NFA, a bounded-cache DFA and a backtracking dissector for
the constructs a pure DFA cannot resolve on its own (backreferences,
non-greedy capturing groups).

## Features
- POSIX-family dialects: Basic, Extended and an Advanced dialect adding
  non-capturing groups, lazy quantifiers, lookahead constraints, word
  boundaries and backreferences.
- Unicode code points throughout; no byte-oriented fast path.
- Compile-time colormap construction collapses the input alphabet down
  to the handful of equivalence classes the pattern actually
  distinguishes, keeping the automaton small regardless of alphabet
  size.
- A compiled [`Regex`] is immutable and `Sync`; searching does not
  mutate it.

## Usage
```
use unire::Regex;

let re = Regex::new("a(b+)c").unwrap();
assert!(re.is_match("xxabbbbcyy").unwrap());

let caps = re.captures("xxabbbbcyy").unwrap().unwrap();
let whole = caps.get_match();
assert_eq!((whole.start, whole.end), (2, 8));
```

Dialect and compile-time options go through the builder:
```
use unire::{Regex, Dialect};

let re = Regex::builder()
    .dialect(Dialect::Advanced)
    .icase(true)
    .build("foo|bar")
    .unwrap();
assert!(re.is_match("FOO").unwrap());
```
*/

mod captures;
mod cnfa;
mod color;
mod colormap;
mod compile;
mod cvec;
mod dfa;
mod dissect;
mod error;
mod exec;
mod lexer;
mod nfa;
mod parser;
mod subre;

pub use captures::{Captures, Span};
pub use compile::{CapturesIter, FindIter, Regex};
pub use error::{Error, InfoFlags, Result};
pub use lexer::{CompFlags, Dialect};

#[cfg(test)]
mod tests {
    use crate::{Dialect, Regex};

    #[test]
    fn literal_match_and_captures() {
        let re = Regex::new("a(b+)c").unwrap();
        assert!(re.is_match("xxabbbbcyy").unwrap());

        let caps = re.captures("xxabbbbcyy").unwrap().unwrap();
        let whole = caps.get_match();
        assert_eq!((whole.start, whole.end), (2, 8));
        let g1 = caps.get_group(1).unwrap();
        assert_eq!((g1.start, g1.end), (3, 7));
    }

    #[test]
    fn alternation_and_icase() {
        let re = Regex::builder().dialect(Dialect::Advanced).icase(true).build("foo|bar").unwrap();
        assert!(re.is_match("FOO").unwrap());
        assert!(re.is_match("bar").unwrap());
        assert!(!re.is_match("baz").unwrap());
    }

    #[test]
    fn find_iter_walks_all_matches() {
        let re = Regex::new("ab").unwrap();
        let spans: Vec<_> = re.find_iter("abXabXab").map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 2), (3, 5), (6, 8)]);
    }
}
