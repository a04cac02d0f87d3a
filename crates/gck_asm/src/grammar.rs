//! The instruction grammar. Each rule recognizes one syntax of a single line and encodes it into
//! gecko lines. Rules are tried in the order of [`RULES`] and the first one that matches wins, so
//! the order matters where one syntax is a prefix of another.

use gck_util::{Bit, BitSet};

use crate::diag::Diagnostics;
use crate::include::{IncludeError, Includes};
use crate::scan::Scanner;

/// Largest offset that can be encoded relative to the base address or pointer.
pub const MAX_OFFSET: u32 = 0x01ff_ffff;

/// Offsets above this are encoded using the pointer bank bit of the opcode.
const BANK_SIZE: u32 = 0x0100_0000;

/// The two address registers of the code handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// Base address.
    Ba,
    /// Pointer offset.
    Po,
}

impl Base {
    fn is_po(self) -> bool {
        self == Base::Po
    }
}

/// Element width of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

impl Width {
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'b' => Some(Width::Byte),
            'h' => Some(Width::Half),
            'w' => Some(Width::Word),
            _ => None,
        }
    }

    /// The digit used to select the width in opcodes.
    fn digit(self) -> u32 {
        match self {
            Width::Byte => 0,
            Width::Half => 1,
            Width::Word => 2,
        }
    }

    fn bits(self) -> u32 {
        8 << self.digit()
    }
}

/// A flow control instruction waiting for the label table to be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub kind: BranchKind,
    /// The label jumped to.
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Goto,
    /// Call with the given register to store the return address in.
    Gosub(u32),
}

impl Branch {
    /// Render the branch from gecko line `from` to gecko line `target`. Negative distances wrap
    /// around and produce a warning.
    pub fn render(&self, from: usize, target: usize, diags: &mut Diagnostics) -> String {
        let distance = target as i64 - (from as i64 + 1);
        if distance < 0 {
            diags.warning(format!(
                "flow control using negative offset, may not work as intended. label = {}",
                self.label,
            ));
        }
        let distance = distance.rem_euclid(0x10000) as u32;
        let (op, reg) = match self.kind {
            BranchKind::Goto => (0x66, 0),
            BranchKind::Gosub(reg) => (0x68, reg),
        };
        let word = 0_u32
            .set_bit_range(24, 31, op)
            .set_bit_range(0, 15, distance);
        render(word, reg)
    }
}

/// The result of encoding a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    /// Matched, but produces no output. Either because the line has been rejected with a
    /// diagnostic, or because of the kind of line.
    Empty,
    /// A label definition. Takes no space itself, but names the gecko line of the next line
    /// producing output.
    Label(String),
    Line(String),
    /// Lines expanded from an included file.
    Lines(Vec<String>),
    Branch(Branch),
}

impl Encoded {
    /// The number of gecko lines produced.
    pub fn len(&self) -> usize {
        match self {
            Encoded::Empty | Encoded::Label(..) => 0,
            Encoded::Line(..) | Encoded::Branch(..) => 1,
            Encoded::Lines(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a rule needs to know besides the line itself.
pub struct LineCx<'a> {
    /// The version used for includes. `*` if the unit is version free.
    pub version: &'a str,
    pub includes: &'a dyn Includes,
    pub diags: &'a mut Diagnostics,
}

type Matcher = fn(&mut Scanner, &mut LineCx) -> Option<Encoded>;

pub struct Rule {
    pub name: &'static str,
    matcher: Matcher,
}

pub const RULES: &[Rule] = &[
    Rule { name: "raw", matcher: raw },
    Rule { name: "label", matcher: label },
    Rule { name: "goto", matcher: goto },
    Rule { name: "gosub", matcher: gosub },
    Rule { name: "return", matcher: ret },
    Rule { name: "endif", matcher: endif },
    Rule { name: "if", matcher: cond },
    Rule { name: "ifptr", matcher: if_ptr },
    Rule { name: "address", matcher: address },
    Rule { name: "include", matcher: include },
    Rule { name: "literal", matcher: literal },
    Rule { name: "load", matcher: load },
    Rule { name: "store", matcher: store },
    Rule { name: "write", matcher: write },
    Rule { name: "copy to base", matcher: copy_to_base },
    Rule { name: "copy from offset", matcher: copy_from_offset },
    Rule { name: "copy to offset", matcher: copy_to_offset },
    Rule { name: "copy from base", matcher: copy_from_base },
];

/// Encode a line using the first matching rule. Returns `None` if no rule matches.
pub fn encode(text: &str, cx: &mut LineCx) -> Option<Encoded> {
    RULES.iter().find_map(|rule| {
        let encoded = (rule.matcher)(&mut Scanner::new(text), cx)?;
        trace!("'{text}' matched rule '{}'", rule.name);
        Some(encoded)
    })
}

fn render(word1: u32, word2: u32) -> String {
    format!("{word1:08X} {word2:08X}")
}

fn line(word1: u32, word2: u32) -> Option<Encoded> {
    Some(Encoded::Line(render(word1, word2)))
}

/// Split an offset into the pointer bank bit and the 24 bit offset within the bank. Reports
/// offsets that can't be encoded.
fn bank_offset(offset: u32, diags: &mut Diagnostics) -> Option<(bool, u32)> {
    if offset > MAX_OFFSET {
        diags.fatal(format!(
            "address offset {offset:08X} greater than {MAX_OFFSET:08X} cannot be encoded"
        ));
        return None;
    }
    let bank = offset.bit(24);
    Some((bank, if bank { offset - BANK_SIZE } else { offset }))
}

/// Check that a repeat count is at least one and fits in a field `bits` wide once the field's
/// bias has been removed.
fn repeat(count: Option<u32>, bias: u32, bits: u32, diags: &mut Diagnostics) -> Option<u32> {
    let count = count.unwrap_or(1);
    if count == 0 {
        diags.fatal("repeat count must be at least 1");
        return None;
    }
    let field = count - bias;
    if !field.fits_in(bits) {
        diags.fatal(format!("repeat count {count:X} is too large"));
        return None;
    }
    Some(field)
}

/// Two bare 8 digit words, optionally with leading `|`. Passed through as is.
fn raw(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    s.eat_char('|');
    let word1 = s.hex_exact(8)?;
    if !s.first().is_whitespace() {
        return None;
    }
    s.eat_while(char::is_whitespace);
    s.eat_char('|');
    let word2 = s.hex_exact(8)?;
    s.end()?;
    line(word1, word2)
}

/// `name:`
fn label(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let name = s.label()?;
    s.expect(':')?.end()?;
    Some(Encoded::Label(name.to_string()))
}

/// `goto label`
fn goto(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let label = s.keyword("goto")?.ws1()?.label()?;
    s.end()?;
    Some(Encoded::Branch(Branch {
        kind: BranchKind::Goto,
        label: label.to_string(),
    }))
}

/// `gosub N label`
fn gosub(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let reg = s.keyword("gosub")?.ws1()?.hex(1)?;
    let label = s.ws1()?.label()?;
    s.end()?;
    Some(Encoded::Branch(Branch {
        kind: BranchKind::Gosub(reg),
        label: label.to_string(),
    }))
}

/// `return N`
fn ret(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let reg = s.keyword("return")?.ws1()?.hex(1)?;
    s.end()?;
    line(0x6400_0000, reg)
}

/// `endif N` or `endif *`.
fn endif(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    s.keyword("endif")?.ws1()?;
    if s.eat_char('*') {
        s.end()?;
        return line(0xe000_0000, 0x8000_8000);
    }
    let count = s.hex(2)?;
    s.end()?;
    line(0xe200_0000 | count, 0)
}

/// `[']if[m] [ba|po[|offset]] [/mask] op value`
fn cond(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let endif = s.eat_char('\'');
    s.keyword("if")?;
    let masked = s.eat_keyword("m");

    s.ws1()?.expect('[')?.ws();
    let base = s.base()?;
    let offset = if s.ws().eat_char('|') {
        s.ws().hex(8)?
    } else {
        0
    };
    s.ws().expect(']')?.ws();

    let mask = if s.eat_char('/') {
        Some(s.ws().hex(4)?)
    } else {
        None
    };

    s.ws();
    let op = if s.eat_str("==") {
        0x0
    } else if s.eat_str("!=") {
        0x2
    } else if s.eat_char('>') {
        0x4
    } else if s.eat_char('<') {
        0x6
    } else {
        return None;
    };
    let value = s.ws().hex(8)?;
    s.end()?;

    let word2 = match (masked, mask) {
        (true, Some(mask)) => {
            if !value.fits_in(16) {
                cx.diags.fatal(format!("ifm value {value:X} does not fit in 16 bits"));
                return Some(Encoded::Empty);
            }
            0_u32.set_bit_range(16, 31, mask).set_bit_range(0, 15, value)
        }
        (true, None) => {
            cx.diags.fatal("ifm requires a mask");
            return Some(Encoded::Empty);
        }
        (false, Some(_)) => {
            cx.diags.fatal("if does not support a mask; try using ifm");
            return Some(Encoded::Empty);
        }
        (false, None) => value,
    };

    let Some((bank, offset)) = bank_offset(offset, cx.diags) else {
        return Some(Encoded::Empty);
    };

    let mut op: u32 = 0x20 | op;
    if masked {
        op |= 0x08;
    }
    if base.is_po() {
        op |= 0x10;
    }
    let word1 = 0_u32
        .set_bit_range(24, 31, op)
        .set_bit(24, bank)
        .set_bit_range(0, 23, offset)
        .wrapping_add(endif as u32);

    line(word1, word2)
}

/// `[']ifptr`
fn if_ptr(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let endif = s.eat_char('\'');
    s.keyword("ifptr")?.end()?;
    line(0xde00_0000 | endif as u32, 0x8000_8180)
}

/// `ba := value`, `po := [value]`, where value may be relative to ba or po itself.
fn address(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let target = s.base()?;
    s.assign()?;
    let indirect = s.eat_char('[');
    let source = s.ws().based();
    let value = s.hex(8)?;
    if indirect {
        s.ws().expect(']')?;
    }
    s.end()?;

    let mut op: u32 = if target.is_po() { 0x4800 } else { 0x4000 };
    if !indirect {
        op += 0x200;
    }
    match source {
        Some(Base::Ba) => op += 0x1,
        Some(Base::Po) => op += 0x1001,
        None => (),
    }
    line(op << 16, value)
}

/// `{name.asm}`, expands to the precompiled lines of an assembly file.
fn include(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    s.expect('{')?;
    let name = s.eat_while(|c| c.is_ascii_alphanumeric() || c == '-');
    if name.is_empty() {
        return None;
    }
    s.keyword(".asm")?.expect('}')?.end()?;

    match cx.includes.load(cx.version, name) {
        Ok(lines) => {
            cx.diags.info(format!("expanded file: {}/{name}.asm", cx.version));
            Some(Encoded::Lines(
                lines
                    .iter()
                    .map(|line| line.trim().to_uppercase())
                    .filter(|line| !line.is_empty())
                    .collect(),
            ))
        }
        Err(IncludeError::NotFound(..)) => {
            cx.diags.fatal(format!("expansion file not found: {name}.asm"));
            Some(Encoded::Empty)
        }
        Err(err) => {
            cx.diags.fatal(err.to_string());
            Some(Encoded::Empty)
        }
    }
}

/// `grX := literal`
fn literal(s: &mut Scanner, _: &mut LineCx) -> Option<Encoded> {
    let reg = s.register()?;
    let value = s.assign()?.hex(8)?;
    s.end()?;
    line(0x8000_0000 | reg, value)
}

/// `grX := {b,h,w} [ba|po|offset]`
fn load(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let reg = s.register()?;
    let width = s.assign()?.width()?;
    let open = s.ws().eat_char('[');
    let base = s.ws().based();
    let offset = s.hex(8)?;
    let close = s.ws().eat_char(']');
    s.end()?;

    if open != close {
        cx.diags.error("mismatched brackets");
        return Some(Encoded::Empty);
    }

    let mut op = 0x8000 + 0x10 * width.digit();
    if let Some(base) = base {
        op += 1;
        if base.is_po() {
            op += 0x1000;
        }
    }
    if open {
        op += 0x200;
    }
    line(op << 16 | reg, offset)
}

/// The operand of a register store: `ba|offset`, `po|offset`, a bare `ba` or `po` meaning
/// offset zero, or an absolute address.
fn store_target(s: &mut Scanner) -> Option<(Option<Base>, u32)> {
    if let Some(base) = s.based() {
        return Some((Some(base), s.hex(8)?));
    }
    if let Some(base) = s.bare_base() {
        return Some((Some(base), 0));
    }
    Some((None, s.hex(8)?))
}

/// `[ba|po|offset] := {b,h,w} grX [**count]`
fn store(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    s.expect('[')?.ws();
    let (base, offset) = store_target(s)?;
    s.ws().expect(']')?;
    let width = s.assign()?.width()?;
    let reg = s.ws().register()?;
    let count = s.count()?;
    s.end()?;

    let Some(count) = repeat(count, 1, 12, cx.diags) else {
        return Some(Encoded::Empty);
    };

    let op = if base.map_or(false, Base::is_po) { 0x94 } else { 0x84 };
    let word1 = 0_u32
        .set_bit_range(24, 31, op)
        .set_bit_range(20, 23, width.digit())
        .set_bit(16, base.is_some())
        .set_bit_range(4, 15, count)
        .set_bit_range(0, 3, reg);
    line(word1, offset)
}

/// `[ba|po[|offset]]`, an address relative to the base address or pointer.
fn based_address(s: &mut Scanner) -> Option<(Base, u32)> {
    s.expect('[')?.ws();
    let base = s.base()?;
    let offset = if s.ws().eat_char('|') {
        s.ws().hex(8)?
    } else {
        0
    };
    s.ws().expect(']')?;
    Some((base, offset))
}

/// `[ba|po[|offset]] := {b,h,w} value [**count]`
fn write(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let (base, offset) = based_address(s)?;
    let width = s.assign()?.width()?;
    let value = s.ws().hex(8)?;
    let count = s.count()?;
    s.end()?;

    if !value.fits_in(width.bits()) {
        cx.diags.fatal(format!(
            "assigning value {value:X} is out of bounds for type {}",
            ["b", "h", "w"][width.digit() as usize],
        ));
        return Some(Encoded::Empty);
    }

    let Some((bank, offset)) = bank_offset(offset, cx.diags) else {
        return Some(Encoded::Empty);
    };

    let word2 = match width {
        Width::Word => {
            if count.map_or(false, |count| count > 1) {
                cx.diags.fatal("cannot specify repeated placement for word-sized values");
                return Some(Encoded::Empty);
            }
            value
        }
        Width::Byte | Width::Half => {
            let Some(count) = repeat(count, 1, 16, cx.diags) else {
                return Some(Encoded::Empty);
            };
            0_u32.set_bit_range(16, 31, count).set_bit_range(0, 15, value)
        }
    };

    let op = width.digit() * 2 + if base.is_po() { 0x10 } else { 0 };
    let word1 = 0_u32
        .set_bit_range(24, 31, op)
        .set_bit(24, bank)
        .set_bit_range(0, 23, offset);
    line(word1, word2)
}

/// `[grX]` or `[grX|offset]` if `with_offset` is set.
fn register_address(s: &mut Scanner, with_offset: bool) -> Option<(u32, u32)> {
    s.expect('[')?.ws();
    let reg = s.register()?;
    let offset = if with_offset && s.ws().eat_char('|') {
        s.ws().hex(8)?
    } else {
        0
    };
    s.ws().expect(']')?;
    Some((reg, offset))
}

/// The two nibbles naming the registers of a memory copy. `F` stands for ba or po.
#[derive(Clone, Copy)]
struct CopyRegs {
    source: u32,
    dest: u32,
}

/// Encode a memory copy. `from_offset` selects the variant where the offset applies to the
/// source rather than the destination.
fn copy(
    regs: CopyRegs,
    base: Option<Base>,
    from_offset: bool,
    offset: u32,
    count: Option<u32>,
    diags: &mut Diagnostics,
) -> Option<Encoded> {
    let Some(count) = repeat(count, 0, 16, diags) else {
        return Some(Encoded::Empty);
    };
    let Some((bank, offset)) = bank_offset(offset, diags) else {
        return Some(Encoded::Empty);
    };
    let mut op = if from_offset { 0x8c } else { 0x8a };
    if base.map_or(false, Base::is_po) {
        op += 0x10;
    }
    let word1 = 0_u32
        .set_bit_range(24, 31, op)
        .set_bit(24, bank)
        .set_bit_range(8, 23, count)
        .set_bit_range(4, 7, regs.source)
        .set_bit_range(0, 3, regs.dest);
    line(word1, offset)
}

/// `[ba|po[|offset]] := [grX] [**count]`
fn copy_to_base(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let (base, offset) = based_address(s)?;
    s.assign()?;
    let (source, _) = register_address(s, false)?;
    let count = s.count()?;
    s.end()?;
    let regs = CopyRegs { source, dest: 0xf };
    copy(regs, Some(base), false, offset, count, cx.diags)
}

/// `[grX] := [grY[|offset]] [**count]`
fn copy_from_offset(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let (dest, _) = register_address(s, false)?;
    s.assign()?;
    let (source, offset) = register_address(s, true)?;
    let count = s.count()?;
    s.end()?;
    copy(CopyRegs { source, dest }, None, true, offset, count, cx.diags)
}

/// `[grX|offset] := [grY] [**count]`
fn copy_to_offset(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let (dest, offset) = register_address(s, true)?;
    s.assign()?;
    let (source, _) = register_address(s, false)?;
    let count = s.count()?;
    s.end()?;
    copy(CopyRegs { source, dest }, None, false, offset, count, cx.diags)
}

/// `[grX] := [ba|po[|offset]] [**count]`
fn copy_from_base(s: &mut Scanner, cx: &mut LineCx) -> Option<Encoded> {
    let (dest, _) = register_address(s, false)?;
    s.assign()?;
    let (base, offset) = based_address(s)?;
    let count = s.count()?;
    s.end()?;
    let regs = CopyRegs { source: 0xf, dest };
    copy(regs, Some(base), true, offset, count, cx.diags)
}
