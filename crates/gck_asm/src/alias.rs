//! Aliases are named addresses whose value depends on the game version. Before a line is parsed,
//! every `<Name>` in it is replaced by the value of the alias, and the address arithmetic that
//! results from it is folded, so the grammar only ever sees literal addresses or `ba|offset` and
//! `po|offset` forms.

use gck_util::hex;

use std::collections::BTreeMap;

/// The version used to look up the universal value of an alias.
pub const UNIVERSAL: &str = "*";

/// Offsets relative to the base address or pointer are reduced modulo this.
const OFFSET_RANGE: u32 = 0x0200_0000;

/// What kind of text aliases are substituted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Gecko source. Aliases are replaced and address arithmetic is folded.
    Code,
    /// Raw assembly passed to an external assembler. Aliases are replaced by `0x` prefixed
    /// values and nothing else is touched.
    Asm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    name: String,
    values: BTreeMap<String, u32>,
    universal: Option<u32>,
}

impl AliasEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
            universal: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the value for `version`. The version `*` sets the universal value.
    pub fn set(&mut self, version: &str, value: u32) {
        if version == UNIVERSAL {
            self.universal = Some(value);
        } else {
            self.values.insert(version.to_string(), value);
        }
    }

    pub fn with(mut self, version: &str, value: u32) -> Self {
        self.set(version, value);
        self
    }

    /// The value for `version`, falling back to the universal value.
    pub fn resolve(&self, version: &str) -> Option<u32> {
        self.values.get(version).copied().or(self.universal)
    }

    /// An assembler directive defining the alias as a constant, if it resolves for `version`.
    pub fn macro_for(&self, version: &str) -> Option<String> {
        self.resolve(version)
            .map(|value| format!(".set {}, 0x{value:08X}", self.name))
    }
}

/// Every known alias and game version. Built once, read only after.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    versions: Vec<String>,
    entries: BTreeMap<String, AliasEntry>,
}

impl AliasTable {
    pub fn new(versions: Vec<String>, entries: impl IntoIterator<Item = AliasEntry>) -> Self {
        Self {
            versions,
            entries: entries
                .into_iter()
                .map(|entry| (entry.name.clone(), entry))
                .collect(),
        }
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn entry(&self, name: &str) -> Option<&AliasEntry> {
        self.entries.get(name)
    }

    /// The value of alias `name` for `version`. `None` if the alias is unknown or has no value
    /// for the version.
    pub fn resolve(&self, name: &str, version: &str) -> Option<u32> {
        self.entries.get(name)?.resolve(version)
    }

    /// Replace aliases in `line`, and in [`Mode::Code`] fold the address arithmetic.
    ///
    /// Folding runs in this order:
    /// * `a+b` of two hex literals is summed, twice so that `a+b+c` is resolved.
    /// * `|offset` is reduced to the offset range of the base address and pointer.
    /// * `a|offset` of two hex literals is combined into a single address.
    ///
    /// A literal preceded by `gr` or ending in `ba` isn't folded, since it's a register or the
    /// base address.
    pub fn substitute(&self, line: &str, version: &str, mode: Mode) -> String {
        let line = replace_aliases(line, |name| {
            let value = self.resolve(name, version)?;
            Some(match mode {
                Mode::Code => format!("{value:08X}"),
                Mode::Asm => format!("0x{value:08X}"),
            })
        });
        if mode == Mode::Asm {
            return line;
        }
        let line = fold_pairs(&line, b'+');
        let line = fold_pairs(&line, b'+');
        let line = mask_offsets(&line);
        fold_pairs(&line, b'|')
    }

    /// A `.set` directive for each alias with a value for `version`, ordered by name.
    pub fn macros_for_version<'a>(&'a self, version: &'a str) -> impl Iterator<Item = String> + 'a {
        self.entries.values().filter_map(move |entry| entry.macro_for(version))
    }

    /// The known versions containing `filter`.
    pub fn version_list<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.versions
            .iter()
            .map(String::as_str)
            .filter(move |version| version.contains(filter))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Match `<Name>` at the start of `text`, allowing whitespace inside the brackets. Returns the
/// name and the length of the match.
fn match_alias(text: &str) -> Option<(&str, usize)> {
    let inner = text.strip_prefix('<')?;
    let name_start = inner.len() - inner.trim_start().len();
    let rest = &inner[name_start..];
    let name_len = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let after = &rest[name_len..];
    let close = after.len() - after.trim_start().len();
    after[close..].starts_with('>').then(|| {
        (name, 1 + name_start + name_len + close + 1)
    })
}

fn replace_aliases(text: &str, mut lookup: impl FnMut(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];
        match match_alias(rest) {
            Some((name, len)) => {
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[..len]),
                }
                rest = &rest[len..];
            }
            None => {
                out.push('<');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn skip_ws(bytes: &[u8], mut at: usize) -> usize {
    while bytes.get(at).map_or(false, u8::is_ascii_whitespace) {
        at += 1;
    }
    at
}

fn ends_with_ignore_case(bytes: &[u8], end: usize, suffix: &[u8]) -> bool {
    end >= suffix.len() && bytes[end - suffix.len()..end].eq_ignore_ascii_case(suffix)
}

/// Match `a <sep> b` starting at `start`, where both are hex literals of 1 to 8 digits. Returns
/// the end of the match and the sum.
fn match_pair(bytes: &[u8], start: usize, sep: u8) -> Option<(usize, u32)> {
    if ends_with_ignore_case(bytes, start, b"gr") {
        return None;
    }
    let run = hex::run_len(&bytes[start..], 8);
    (1..=run).rev().find_map(|len| {
        let end = start + len;
        if ends_with_ignore_case(bytes, end, b"ba") {
            return None;
        }
        let at = skip_ws(bytes, end);
        if bytes.get(at) != Some(&sep) {
            return None;
        }
        let right_start = skip_ws(bytes, at + 1);
        let right_len = hex::run_len(&bytes[right_start..], 8);
        if right_len == 0 {
            return None;
        }
        let right_end = right_start + right_len;
        let lhs = parse_ascii(&bytes[start..end])?;
        let rhs = parse_ascii(&bytes[right_start..right_end])?;
        Some((right_end, lhs.wrapping_add(rhs)))
    })
}

fn parse_ascii(bytes: &[u8]) -> Option<u32> {
    hex::parse(std::str::from_utf8(bytes).ok()?)
}

/// Replace every `a <sep> b` pair of hex literals by their sum, scanning left to right.
fn fold_pairs(text: &str, sep: u8) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let (mut copied, mut at) = (0, 0);
    while at < bytes.len() {
        match match_pair(bytes, at, sep) {
            Some((end, sum)) => {
                out.push_str(&text[copied..at]);
                out.push_str(&format!("{sum:08X}"));
                copied = end;
                at = end;
            }
            None => at += 1,
        }
    }
    out.push_str(&text[copied..]);
    out
}

/// Rewrite every `|offset` as `|` followed by 8 digits of the offset modulo the offset range.
fn mask_offsets(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let (mut copied, mut at) = (0, 0);
    while at < bytes.len() {
        if bytes[at] == b'|' {
            let start = skip_ws(bytes, at + 1);
            let len = hex::run_len(&bytes[start..], 8);
            if let Some(value) = parse_ascii(&bytes[start..start + len]) {
                out.push_str(&text[copied..at]);
                out.push_str(&format!("|{:08X}", value % OFFSET_RANGE));
                copied = start + len;
                at = copied;
                continue;
            }
        }
        at += 1;
    }
    out.push_str(&text[copied..]);
    out
}
