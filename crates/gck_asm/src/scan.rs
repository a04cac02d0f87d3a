use gck_util::hex;

use crate::grammar::{Base, Width};

use std::str::Chars;

/// A cursor over a single stripped source line. Keywords and hex digits are matched without
/// regard to case. Every method that returns an `Option` only consumes input on success, so a
/// rule can simply bail out with `?` when the line isn't written in its syntax.
#[derive(Clone)]
pub struct Scanner<'a> {
    chars: Chars<'a>,
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { chars: input.chars() }
    }

    /// The input that hasn't been consumed yet.
    pub fn rest(&self) -> &'a str {
        self.chars.as_str()
    }

    /// Peak one character ahead.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or('\0')
    }

    pub fn is_done(&self) -> bool {
        self.rest().is_empty()
    }

    fn eat(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn eat_n(&mut self, n: usize) {
        for _ in 0..n {
            self.eat();
        }
    }

    /// Consume characters until `pred` returns false. Returns the consumed slice.
    pub fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.rest();
        let mut eaten = 0;
        while !self.is_done() && pred(self.first()) {
            eaten += self.first().len_utf8();
            self.eat();
        }
        &start[..eaten]
    }

    /// Consume any amount of whitespace.
    pub fn ws(&mut self) -> &mut Self {
        self.eat_while(char::is_whitespace);
        self
    }

    /// Consume at least one whitespace character.
    pub fn ws1(&mut self) -> Option<&mut Self> {
        if self.eat_while(char::is_whitespace).is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// Consume `c` if it's next.
    pub fn eat_char(&mut self, c: char) -> bool {
        if self.first() == c {
            self.eat();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, c: char) -> Option<&mut Self> {
        self.eat_char(c).then_some(self)
    }

    /// Consume `punct` exactly, used for operators such as `:=` and `**`.
    pub fn eat_str(&mut self, punct: &str) -> bool {
        if self.rest().starts_with(punct) {
            self.eat_n(punct.chars().count());
            true
        } else {
            false
        }
    }

    /// Consume the keyword `kw`, ignoring case.
    pub fn eat_keyword(&mut self, kw: &str) -> bool {
        let rest = self.rest();
        let matches = rest
            .get(..kw.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(kw));
        if matches {
            self.eat_n(kw.len());
        }
        matches
    }

    pub fn keyword(&mut self, kw: &str) -> Option<&mut Self> {
        self.eat_keyword(kw).then_some(self)
    }

    /// Consume `:=` surrounded by optional whitespace.
    pub fn assign(&mut self) -> Option<&mut Self> {
        self.ws();
        if !self.eat_str(":=") {
            return None;
        }
        Some(self.ws())
    }

    /// Consume a hex literal of 1 to `max` digits. Takes as many digits as are available.
    pub fn hex(&mut self, max: usize) -> Option<u32> {
        let len = hex::run_len(self.rest().as_bytes(), max);
        if len == 0 {
            return None;
        }
        let value = hex::parse(&self.rest()[..len])?;
        self.eat_n(len);
        Some(value)
    }

    /// Consume a hex literal of exactly `len` digits.
    pub fn hex_exact(&mut self, len: usize) -> Option<u32> {
        if hex::run_len(self.rest().as_bytes(), len + 1) != len {
            return None;
        }
        self.hex(len)
    }

    /// Consume a label name made of ascii letters, digits and underscores.
    pub fn label(&mut self) -> Option<&'a str> {
        let name = self.eat_while(is_label_char);
        (!name.is_empty()).then_some(name)
    }

    /// Consume a general purpose register reference, fx. `grA`.
    pub fn register(&mut self) -> Option<u32> {
        let mut clone = self.clone();
        clone.keyword("gr")?;
        let reg = clone.hex(1)?;
        *self = clone;
        Some(reg)
    }

    /// Consume `ba` or `po`.
    pub fn base(&mut self) -> Option<Base> {
        if self.eat_keyword("ba") {
            Some(Base::Ba)
        } else if self.eat_keyword("po") {
            Some(Base::Po)
        } else {
            None
        }
    }

    /// Consume `ba|` or `po|`, with optional whitespace around the `|`. Nothing is consumed if
    /// the base isn't followed by a `|`, so a literal such as `BADF00D` is left alone.
    pub fn based(&mut self) -> Option<Base> {
        let mut clone = self.clone();
        let base = clone.base()?;
        clone.ws().expect('|')?;
        clone.ws();
        *self = clone;
        Some(base)
    }

    /// Consume `ba` or `po` only if it is the whole operand, that is if it's followed by `]`.
    pub fn bare_base(&mut self) -> Option<Base> {
        let mut clone = self.clone();
        let base = clone.base()?;
        if clone.ws().first() != ']' {
            return None;
        }
        *self = clone;
        Some(base)
    }

    /// Consume an element width, one of `b`, `h` or `w`.
    pub fn width(&mut self) -> Option<Width> {
        let width = Width::from_char(self.first())?;
        self.eat();
        Some(width)
    }

    /// Consume an optional repeat count `**N`.
    pub fn count(&mut self) -> Option<Option<u32>> {
        let mut clone = self.clone();
        if !clone.ws().eat_str("**") {
            return Some(None);
        }
        let count = clone.hex(8)?;
        *self = clone;
        Some(Some(count))
    }

    /// Succeeds only if all input has been consumed, allowing trailing whitespace.
    pub fn end(&mut self) -> Option<()> {
        self.ws().is_done().then_some(())
    }
}
