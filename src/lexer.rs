//! Token stream consumed by the parser (`spec.md` §6, "Token interface
//! consumed from the lexer"). Nominally an external collaborator per
//! §1's scope note, but since no such lexer exists to delegate to, this
//! module implements it directly so the in-scope parser has something
//! real to drive.

use crate::cvec::Cvec;
use crate::error::{Error, InfoFlags, Result};

/// Pattern dialect, the primary axis of lexer behavior (`SPEC_FULL.md`
/// §A.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Basic,
    Extended,
    Advanced,
}

bitflags::bitflags! {
    /// Compile-time flags (`spec.md` §6, "Compile entry").
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompFlags: u32 {
        const ICASE    = 1 << 0;
        const NOSUB    = 1 << 1;
        const EXPANDED = 1 << 2;
        const NEWLINE  = 1 << 3;
        const NLSTOP   = 1 << 4;
        const NLANCH   = 1 << 5;
        const QUOTE    = 1 << 6;
        const ADVF     = 1 << 7;
    }
}

impl CompFlags {
    /// `REG_NEWLINE` is shorthand for both `NLSTOP` and `NLANCH`.
    pub fn normalized(self) -> Self {
        if self.contains(CompFlags::NEWLINE) {
            self | CompFlags::NLSTOP | CompFlags::NLANCH
        } else {
            self
        }
    }
}

/// A POSIX named character class, `[[:name:]]` (`SPEC_FULL.md` §B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PosixClass {
    Alpha,
    Digit,
    Alnum,
    Space,
    Upper,
    Lower,
    Punct,
    Cntrl,
    Graph,
    Print,
    Blank,
    Word,
}

impl PosixClass {
    fn by_name(name: &str) -> Option<PosixClass> {
        Some(match name {
            "alpha" => PosixClass::Alpha,
            "digit" => PosixClass::Digit,
            "alnum" => PosixClass::Alnum,
            "space" => PosixClass::Space,
            "upper" => PosixClass::Upper,
            "lower" => PosixClass::Lower,
            "punct" => PosixClass::Punct,
            "cntrl" => PosixClass::Cntrl,
            "graph" => PosixClass::Graph,
            "print" => PosixClass::Print,
            "blank" => PosixClass::Blank,
            "word" => PosixClass::Word,
            _ => return None,
        })
    }

    pub(crate) fn matches(self, c: char) -> bool {
        match self {
            PosixClass::Alpha => c.is_alphabetic(),
            PosixClass::Digit => c.is_ascii_digit(),
            PosixClass::Alnum => c.is_alphanumeric(),
            PosixClass::Space => c.is_whitespace(),
            PosixClass::Upper => c.is_uppercase(),
            PosixClass::Lower => c.is_lowercase(),
            PosixClass::Punct => c.is_ascii_punctuation(),
            PosixClass::Cntrl => c.is_control(),
            PosixClass::Graph => !c.is_whitespace() && !c.is_control(),
            PosixClass::Print => !c.is_control(),
            PosixClass::Blank => c == ' ' || c == '\t',
            PosixClass::Word => c.is_alphanumeric() || c == '_',
        }
    }
}

/// A bare backslash shorthand class (`\d \D \s \S \w \W`), distinct from
/// a bracket-expression `[[:name:]]` (`Token::Cclass`) -- the two are
/// spelled differently and resolve differently (`SPEC_FULL.md` §B.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EscClass {
    Digit,
    NotDigit,
    Space,
    NotSpace,
    Word,
    NotWord,
}

impl EscClass {
    fn from_letter(c: char) -> EscClass {
        match c {
            'd' => EscClass::Digit,
            'D' => EscClass::NotDigit,
            's' => EscClass::Space,
            'S' => EscClass::NotSpace,
            'w' => EscClass::Word,
            'W' => EscClass::NotWord,
            _ => unreachable!("from_letter called on non-class escape"),
        }
    }

    /// The underlying positive class and whether this token negates it.
    pub fn polarity(self) -> (PosixClass, bool) {
        match self {
            EscClass::Digit => (PosixClass::Digit, false),
            EscClass::NotDigit => (PosixClass::Digit, true),
            EscClass::Space => (PosixClass::Space, false),
            EscClass::NotSpace => (PosixClass::Space, true),
            EscClass::Word => (PosixClass::Word, false),
            EscClass::NotWord => (PosixClass::Word, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Eos,
    Empty,
    Plain(char),
    Digit(u8),
    Backref(u32),
    LParen { capturing: bool },
    RParen,
    Bar,
    LBracket { negated: bool },
    Star { greedy: bool },
    Plus { greedy: bool },
    Question { greedy: bool },
    LBrace { greedy: bool },
    RBrace { greedy: bool },
    Comma,
    Dot,
    Caret,
    Dollar,
    Sbegin,
    Send,
    Wbdry,
    Nwbdry,
    WordStart,
    WordEnd,
    /// `[[.x.]]`, resolved at scan time to the single code point `x`
    /// names (the "C" locale has no multi-character collating
    /// elements).
    Collel(char),
    /// `[[=x=]]`, resolved at scan time the same way (the "C" locale's
    /// equivalence classes are singletons).
    Eclass(char),
    Cclass(PosixClass),
    EscClass(EscClass),
    End,
    Range,
    Lacon { positive: bool },
    Prefer { long: bool },
}

/// Lexer state. `lasttype`/`nexttype`/`nextvalue` mirror §6's
/// `{lasttype <- nexttype, nexttype, nextvalue}` contract; `next()`
/// advances the window by one token.
pub(crate) struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    dialect: Dialect,
    flags: CompFlags,
    pub lasttype: Token,
    pub nexttype: Token,
    in_bracket: bool,
    pub info: InfoFlags,
    _src: std::marker::PhantomData<&'a str>,
}

impl<'a> Lexer<'a> {
    pub fn new(pattern: &'a str, dialect: Dialect, flags: CompFlags) -> Self {
        let mut chars: Vec<char> = pattern.chars().collect();
        if flags.contains(CompFlags::EXPANDED) {
            chars = strip_expanded(&chars);
        }
        Lexer {
            chars,
            pos: 0,
            dialect,
            flags,
            lasttype: Token::Empty,
            nexttype: Token::Empty,
            in_bracket: false,
            info: InfoFlags::empty(),
            _src: std::marker::PhantomData,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// `next()`: fills `lasttype <- nexttype`, scans a fresh `nexttype`.
    pub fn next(&mut self) -> Result<()> {
        self.lasttype = self.nexttype;
        self.nexttype = self.scan()?;
        Ok(())
    }

    fn scan(&mut self) -> Result<Token> {
        if self.flags.contains(CompFlags::QUOTE) {
            return Ok(match self.advance() {
                Some(c) => Token::Plain(c),
                None => Token::Eos,
            });
        }
        if self.in_bracket {
            return self.scan_bracket();
        }
        let Some(c) = self.peek() else { return Ok(Token::Eos) };

        let advanced = matches!(self.dialect, Dialect::Extended | Dialect::Advanced);
        let are = matches!(self.dialect, Dialect::Advanced) || self.flags.contains(CompFlags::ADVF);

        match c {
            '(' if advanced => {
                self.advance();
                if are && self.peek() == Some('?') {
                    self.advance();
                    match self.peek() {
                        Some(':') => {
                            self.advance();
                            Ok(Token::LParen { capturing: false })
                        }
                        Some('=') => {
                            self.advance();
                            self.info.insert(InfoFlags::ULOOKAHEAD);
                            Ok(Token::Lacon { positive: true })
                        }
                        Some('!') => {
                            self.advance();
                            self.info.insert(InfoFlags::ULOOKAHEAD);
                            Ok(Token::Lacon { positive: false })
                        }
                        _ => Err(Error::BadEscape),
                    }
                } else {
                    Ok(Token::LParen { capturing: true })
                }
            }
            ')' if advanced => {
                self.advance();
                Ok(Token::RParen)
            }
            '|' if advanced => {
                self.advance();
                Ok(Token::Bar)
            }
            '[' => {
                self.advance();
                let negated = self.peek() == Some('^');
                if negated {
                    self.advance();
                }
                self.in_bracket = true;
                Ok(Token::LBracket { negated })
            }
            '*' => {
                self.advance();
                Ok(Token::Star { greedy: !self.eat_nongreedy(are) })
            }
            '+' if advanced => {
                self.advance();
                Ok(Token::Plus { greedy: !self.eat_nongreedy(are) })
            }
            '?' if advanced => {
                self.advance();
                Ok(Token::Question { greedy: !self.eat_nongreedy(are) })
            }
            '{' if advanced => {
                self.advance();
                Ok(Token::LBrace { greedy: true })
            }
            '}' if advanced => {
                self.advance();
                Ok(Token::RBrace { greedy: !self.eat_nongreedy(are) })
            }
            ',' if advanced => {
                self.advance();
                Ok(Token::Comma)
            }
            '.' => {
                self.advance();
                Ok(Token::Dot)
            }
            '^' => {
                self.advance();
                if are && self.lasttype == Token::Empty {
                    Ok(Token::Sbegin)
                } else {
                    Ok(Token::Caret)
                }
            }
            '$' => {
                self.advance();
                Ok(Token::Dollar)
            }
            '\\' => self.scan_escape(are, advanced),
            c if c.is_ascii_digit() && advanced => {
                self.advance();
                Ok(Token::Digit(c as u8 - b'0'))
            }
            _ => {
                self.advance();
                Ok(Token::Plain(c))
            }
        }
    }

    fn eat_nongreedy(&mut self, are: bool) -> bool {
        if are && self.peek() == Some('?') {
            self.advance();
            true
        } else {
            false
        }
    }

    fn scan_escape(&mut self, are: bool, advanced: bool) -> Result<Token> {
        self.advance(); // consume backslash
        let Some(c) = self.advance() else { return Err(Error::BadEscape) };
        match c {
            '1'..='9' if are => {
                let mut n = c as u32 - '0' as u32;
                while let Some(d) = self.peek() {
                    if d.is_ascii_digit() {
                        n = n * 10 + (d as u32 - '0' as u32);
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.info.insert(InfoFlags::UBACKREF);
                Ok(Token::Backref(n))
            }
            'm' if are => Ok(Token::Wbdry),
            'M' if are => Ok(Token::Nwbdry),
            'y' if are => Ok(Token::Wbdry),
            'Y' if are => Ok(Token::Nwbdry),
            '<' if are => Ok(Token::WordStart),
            '>' if are => Ok(Token::WordEnd),
            'A' if are => Ok(Token::Sbegin),
            'Z' if are => Ok(Token::Send),
            'd' | 'D' | 's' | 'S' | 'w' | 'W' if are => Ok(Token::EscClass(EscClass::from_letter(c))),
            // Basic (BRE) dialect spells group/bound delimiters with a
            // leading backslash instead of using them bare.
            '(' if !advanced => Ok(Token::LParen { capturing: true }),
            ')' if !advanced => Ok(Token::RParen),
            '{' if !advanced => Ok(Token::LBrace { greedy: true }),
            '}' if !advanced => Ok(Token::RBrace { greedy: true }),
            '+' if !advanced => Ok(Token::Plus { greedy: true }),
            '?' if !advanced => Ok(Token::Question { greedy: true }),
            '|' if !advanced => Ok(Token::Bar),
            '(' | ')' | '|' | '*' | '+' | '?' | '{' | '}' | '.' | '[' | ']' | '^' | '$' | '\\' => {
                self.info.insert(InfoFlags::UBBS);
                Ok(Token::Plain(c))
            }
            c if c.is_ascii_alphanumeric() => {
                self.info.insert(InfoFlags::UBSALNUM);
                Ok(Token::Plain(c))
            }
            c => Ok(Token::Plain(c)),
        }
    }

    fn scan_bracket(&mut self) -> Result<Token> {
        match self.peek() {
            None => Err(Error::UnmatchedBracket),
            Some(']') if !matches!(self.lasttype, Token::LBracket { .. }) => {
                self.advance();
                self.in_bracket = false;
                Ok(Token::End)
            }
            Some('[') if self.peek2() == Some(':') => self.scan_cclass_name(),
            Some('[') if self.peek2() == Some('.') => self.scan_singleton_name('.', Token::Collel),
            Some('[') if self.peek2() == Some('=') => self.scan_singleton_name('=', Token::Eclass),
            Some('-')
                if !matches!(self.lasttype, Token::LBracket { .. } | Token::Range)
                    && self.peek2().is_some()
                    && self.peek2() != Some(']') =>
            {
                self.advance();
                Ok(Token::Range)
            }
            Some(c) => {
                self.advance();
                Ok(Token::Plain(c))
            }
        }
    }

    /// Scans the `name` out of a `[:name:]`/`[.name.]`/`[=name=]`
    /// construct, not including the delimiters or brackets.
    fn scan_name(&mut self, delim: char) -> Result<String> {
        self.advance(); // '['
        self.advance(); // delim
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == delim && self.peek2() == Some(']') {
                break;
            }
            self.advance();
        }
        if self.peek().is_none() {
            return Err(Error::BadClass);
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        self.advance(); // delim
        self.advance(); // ']'
        Ok(name)
    }

    fn scan_cclass_name(&mut self) -> Result<Token> {
        let name = self.scan_name(':')?;
        let pc = PosixClass::by_name(&name).ok_or(Error::BadClass)?;
        Ok(Token::Cclass(pc))
    }

    /// `[.x.]`/`[=x=]` in the "C" locale name exactly one code point;
    /// multi-character names have no meaning here.
    fn scan_singleton_name(&mut self, delim: char, tok: fn(char) -> Token) -> Result<Token> {
        let name = self.scan_name(delim)?;
        let mut chars = name.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(Error::BadClass);
        };
        Ok(tok(c))
    }

    /// `element`: resolves the most recently scanned bracket atom into
    /// `cvec`. Exposed to the parser the way §6 describes.
    pub fn element(&self, tok: Token, cvec: &mut Cvec) -> Result<()> {
        match tok {
            Token::Plain(c) | Token::Collel(c) | Token::Eclass(c) => {
                cvec.add_chr(c);
                Ok(())
            }
            Token::Cclass(pc) => self.cclass(pc, cvec),
            _ => Ok(()),
        }
    }

    /// `cclass`: expand a POSIX character class into `cvec`
    /// (`SPEC_FULL.md` §B's ASCII class table).
    pub fn cclass(&self, pc: PosixClass, cvec: &mut Cvec) -> Result<()> {
        for v in 0u32..=0x7F {
            if let Some(c) = char::from_u32(v) {
                if pc.matches(c) {
                    cvec.add_chr(c);
                }
            }
        }
        Ok(())
    }

    /// `allcases`: both-case expansion of a single character, delegating
    /// to [`Cvec::add_chr_allcases`].
    pub fn allcases(&self, c: char, cvec: &mut Cvec) {
        cvec.add_chr_allcases(c);
    }

    pub fn newline(&self) -> char {
        '\n'
    }
}

/// Strips unescaped whitespace and `#`-to-end-of-line comments, as
/// `REG_EXPANDED` requires (`SPEC_FULL.md` §B). Applied once, before
/// tokenizing, outside bracket expressions; bracket-expression contents
/// are passed through untouched by tracking `in_brk`.
fn strip_expanded(chars: &[char]) -> Vec<char> {
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;
    let mut in_brk = false;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            out.push(c);
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if !in_brk && c == '[' {
            in_brk = true;
            out.push(c);
            i += 1;
            continue;
        }
        if in_brk && c == ']' {
            in_brk = false;
            out.push(c);
            i += 1;
            continue;
        }
        if !in_brk && c.is_whitespace() {
            i += 1;
            continue;
        }
        if !in_brk && c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pat: &str, dialect: Dialect, flags: CompFlags) -> Vec<Token> {
        let mut lx = Lexer::new(pat, dialect, flags);
        let mut out = Vec::new();
        loop {
            lx.next().unwrap();
            if lx.nexttype == Token::Eos {
                break;
            }
            out.push(lx.nexttype);
        }
        out
    }

    #[test]
    fn plain_literal_tokens() {
        let toks = tokens("ab", Dialect::Advanced, CompFlags::empty());
        assert_eq!(toks, vec![Token::Plain('a'), Token::Plain('b')]);
    }

    #[test]
    fn backref_parses_multi_digit() {
        let toks = tokens("\\12", Dialect::Advanced, CompFlags::empty());
        assert_eq!(toks, vec![Token::Backref(12)]);
    }

    #[test]
    fn noncapturing_group_and_lookahead() {
        let toks = tokens("(?:a)(?=b)", Dialect::Advanced, CompFlags::empty());
        assert_eq!(toks[0], Token::LParen { capturing: false });
        assert!(toks.contains(&Token::Lacon { positive: true }));
    }

    #[test]
    fn expanded_mode_strips_whitespace_and_comments() {
        let toks = tokens("a b # comment\nc", Dialect::Advanced, CompFlags::EXPANDED);
        assert_eq!(toks, vec![Token::Plain('a'), Token::Plain('b'), Token::Plain('c')]);
    }

    #[test]
    fn bracket_expression_tokenizes_range() {
        let toks = tokens("[a-z]", Dialect::Advanced, CompFlags::empty());
        assert!(matches!(toks[0], Token::LBracket { negated: false }));
        assert!(toks.contains(&Token::Range));
        assert!(toks.contains(&Token::End));
    }

    #[test]
    fn non_greedy_quantifier_in_are() {
        let toks = tokens("a*?", Dialect::Advanced, CompFlags::empty());
        assert_eq!(toks[1], Token::Star { greedy: false });
    }
}
