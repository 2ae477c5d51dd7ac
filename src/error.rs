//! Compile- and execute-time error types.
//!
//! Mirrors the error kinds of `spec.md` §7: a closed, enumerable set of
//! syntactic/semantic/resource failures, represented as a single
//! `thiserror`-derived enum rather than the original's sticky-flag-in-`vars`
//! pattern (see §9, "Exceptions vs. sticky error").

use thiserror::Error;

/// Everything that can go wrong compiling or running a pattern.
///
/// `REG_NOMATCH` is deliberately *not* a variant here: a failed search is a
/// normal `Ok(None)`, not an error (§7, "mid-scan failures... are not
/// errors").
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Pattern is not a valid regular expression of the requested dialect.
    #[error("invalid regular expression")]
    BadPattern,
    /// Unmatched `(` or extra `)`.
    #[error("unmatched parenthesis")]
    UnmatchedParen,
    /// Bad `{m,n}` bound syntax.
    #[error("invalid repetition bound syntax")]
    BadBrace,
    /// Unmatched `[` in a bracket expression.
    #[error("unmatched bracket")]
    UnmatchedBracket,
    /// `{m,n}` bound out of range, or `m > n`.
    #[error("invalid repetition count")]
    BadRepeat,
    /// Invalid range endpoints inside a bracket expression (e.g. `[z-a]`).
    #[error("invalid character range")]
    BadRange,
    /// Invalid collating element.
    #[error("invalid collating element")]
    BadCollate,
    /// Invalid character class name (`[[:bogus:]]`).
    #[error("invalid character class")]
    BadClass,
    /// Invalid backslash escape.
    #[error("invalid escape sequence")]
    BadEscape,
    /// Backreference to a group that was never opened, or `\0`.
    #[error("invalid backreference number")]
    BadBackref,
    /// Empty pattern with `REG_EXTENDED`/ARE (empty (sub)expression).
    #[error("empty expression")]
    Empty,
    /// Invalid compile-time flag combination.
    #[error("invalid option")]
    BadOption,
    /// Optimization proved the pattern can never match.
    #[error("pattern can never match")]
    Impossible,
    /// Caller passed buffers of mismatched code point width.
    #[error("mismatched input width")]
    Mixed,
    /// Invalid argument to an API entry point (e.g. out-of-range `Input`).
    #[error("invalid argument")]
    InvalidArgument,
    /// An internal allocation/arena budget was exhausted.
    #[error("out of space")]
    Space,
    /// An internal invariant was violated. Should never happen; see §7's
    /// assertion policy — in debug builds the responsible invariant is also
    /// checked with `debug_assert!` closer to the violation.
    #[error("internal assertion failed: {0}")]
    Assert(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

bitflags::bitflags! {
    /// Non-error information bits reported alongside a successful compile
    /// (`re_info` in §6/§7). Not folded into [`Error`] since these are not
    /// failures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InfoFlags: u32 {
        /// Pattern contains a backreference.
        const UBACKREF    = 1 << 0;
        /// Pattern uses a bounded repetition `{m,n}`.
        const UBOUNDS     = 1 << 1;
        /// Pattern depends on locale-specific collation.
        const ULOCALE     = 1 << 2;
        /// Pattern can match the empty string.
        const UEMPTYMATCH = 1 << 3;
        /// Pattern uses non-POSIX (ARE) syntax.
        const UNONPOSIX   = 1 << 4;
        /// Pattern relies on `\b`-alnum-style word semantics.
        const UBSALNUM    = 1 << 5;
        /// Pattern uses a construct whose portability is doubtful.
        const UUNPORT     = 1 << 6;
        /// Pattern uses an unspecified-behavior construct.
        const UUNSPEC     = 1 << 7;
        /// Pattern uses `\`-before-ordinary-char (backslash-before-self).
        const UBBS        = 1 << 8;
        /// Pattern botches `{` handling in a POSIX-undefined way.
        const UPBOTCH     = 1 << 9;
        /// Pattern uses literal unescaped braces.
        const UBRACES     = 1 << 10;
        /// Pattern uses a lookahead constraint.
        const ULOOKAHEAD  = 1 << 11;
    }
}
