use super::{check, check_fails};
use crate::Severity;

#[test]
fn raw() {
    check("0000159C 00010004", "0000159C 00010004");
    check("  0000159C 00010004  # A comment of some sort", "0000159C 00010004");
    check("|0000159C 00010004", "0000159C 00010004");
}

#[test]
fn raw_needs_full_words() {
    check_fails("159C 00010004", Severity::Fatal);
    check_fails("0000159C00010004", Severity::Fatal);
}

#[test]
fn ret() {
    check("return A", "64000000 0000000A");
}

#[test]
fn endif() {
    check("endif A", "E200000A 00000000");
    check("endif 10", "E2000010 00000000");
    check("endif *", "E0000000 80008000");
    check("ENDIF *", "E0000000 80008000");
}

#[test]
fn ifptr() {
    check("ifptr", "DE000000 80008180");
    check("'ifptr", "DE000001 80008180");
}

#[test]
fn cond() {
    check("ifm [ba|<SettingsFlags>+4] / FF00 == 0001", "28004204 FF000001");
    check("if [ba|<Spawn>] == 42323030", "205B6B0C 42323030");
    check("'ifm [ba|<SettingsFlags>+4] / FF00 == 0001", "28004205 FF000001");
    check("'if [ba|<Spawn>] == 42323030", "205B6B0D 42323030");
}

#[test]
fn cond_ops() {
    check("if [ba|1500] != 1", "22001500 00000001");
    check("if [ba|1500] > 1", "24001500 00000001");
    check("if [ba|1500] < 1", "26001500 00000001");
    check("if [po|1500] == 1", "30001500 00000001");
    check("if [ba] == 1", "20000000 00000001");
}

#[test]
fn cond_mask_mismatch() {
    let out = check_fails("ifm [ba|1500] == 1", Severity::Fatal);
    assert!(out.text.is_empty());
    assert!(out.diagnostics[0].message.contains("requires a mask"));

    let out = check_fails("if [ba|1500] / FF00 == 1", Severity::Fatal);
    assert!(out.diagnostics[0].message.contains("try using ifm"));
}

#[test]
fn cond_bank() {
    check("if [ba|1001500] == 1", "21001500 00000001");
    check("if [ba|3001500] == 1", "21001500 00000001");
}

#[test]
fn assign_literal() {
    check(" grA := deadbeef", "8000000A DEADBEEF");
    check("grA:=deadbeef", "8000000A DEADBEEF");
}

#[test]
fn load() {
    check("grB:=b[80001500]", "8200000B 80001500");
    check("grB := b [ 80001500 ]", "8200000B 80001500");
    check("grB:=h[80001500]", "8210000B 80001500");
    check("grB := h [ 80001500 ]", "8210000B 80001500");
    check("grB:=w[80001500]", "8220000B 80001500");
    check("grB := w [ 80001500 ]", "8220000B 80001500");
}

#[test]
fn load_mismatched_brackets() {
    let out = check_fails("grB:=w[80001500", Severity::Error);
    assert!(out.text.is_empty());
    assert_eq!(out.diagnostics[0].message, "mismatched brackets");
}

#[test]
fn address_assign() {
    check("ba:=<Spawn>", "42000000 805B6B0C");
    check("ba:=[<Spawn>]", "40000000 805B6B0C");
    check("po:=<Spawn>", "4A000000 805B6B0C");
    check("po:=[<Spawn>]", "48000000 805B6B0C");

    check("ba:=ba|1500", "42010000 00001500");
    check("ba:=po|1500", "52010000 00001500");
    check("po:=ba|1500", "4A010000 00001500");
    check("po:=po|1500", "5A010000 00001500");

    check("ba:=[ba|1500]", "40010000 00001500");
    check("ba:=[po|1500]", "50010000 00001500");
    check("po:=[ba|1500]", "48010000 00001500");
    check("po:=[po|1500]", "58010000 00001500");
}

/// Check `line` as written, relative to po, and with the offset replaced by a bare base.
fn check_based(line: &str, offset: &str, expected: &str, po_digit: char) {
    let po_expected = |expected: &str| format!("{po_digit}{}", &expected[1..]);
    check(line, expected);
    check(&line.replacen("ba", "po", 1), &po_expected(expected));

    let bare = line.replacen(offset, "ba", 1);
    let zeroed = expected.replace("1500", "0000");
    check(&bare, &zeroed);
    check(&bare.replacen("ba", "po", 1), &po_expected(&zeroed));
}

#[test]
fn write() {
    let cases = [
        ("[ba|1500]:=bCD", "ba|1500", "00001500 000000CD"),
        ("[ ba | 1500 ] := b CD", "ba | 1500", "00001500 000000CD"),
        ("[ba|1500]:=bCD**1F", "ba|1500", "00001500 001E00CD"),
        ("[ ba | 1500 ] := b CD **1F", "ba | 1500", "00001500 001E00CD"),
        ("[ba|1500]:=h1A1A", "ba|1500", "02001500 00001A1A"),
        ("[ ba | 1500 ] := h 1A1A", "ba | 1500", "02001500 00001A1A"),
        ("[ba|1500]:=h1A1A**1F", "ba|1500", "02001500 001E1A1A"),
        ("[ ba | 1500 ] := h 1A1A **1F", "ba | 1500", "02001500 001E1A1A"),
        ("[ba|1500]:=w2B2B3C3C", "ba|1500", "04001500 2B2B3C3C"),
        ("[ ba | 1500 ] := w 2B2B3C3C", "ba | 1500", "04001500 2B2B3C3C"),
    ];
    for (line, offset, expected) in cases {
        check_based(line, offset, expected, '1');
    }
}

#[test]
fn write_out_of_bounds() {
    let out = check_fails("[ba|1500]:=b100", Severity::Fatal);
    assert!(out.diagnostics[0].message.contains("out of bounds for type b"));
    check_fails("[ba|1500]:=h10000", Severity::Fatal);
    check("[ba|1500]:=hFFFF", "02001500 0000FFFF");
}

#[test]
fn write_word_repeat() {
    check_fails("[ba|1500]:=w1**2", Severity::Fatal);
    check("[ba|1500]:=w1**1", "04001500 00000001");
}

#[test]
fn write_bank() {
    check("[ba|1FFFFFF]:=b1", "01FFFFFF 00000001");
    check("[po|1000000]:=b1", "11000000 00000001");
    check("[ba|2000000]:=b1", "00000000 00000001");
}

#[test]
fn repeat_zero() {
    check_fails("[ba|1500]:=b1**0", Severity::Fatal);
}

#[test]
fn memcpy() {
    let cases = [
        ("[gr5]:=[ba|1500]", "ba|1500", "8C0001F5 00001500"),
        (" [ gr5 ] := [ ba | 1500 ] ", "ba | 1500", "8C0001F5 00001500"),
        ("[gr5]:=[ba|1500]**4", "ba|1500", "8C0004F5 00001500"),
        (" [ gr5 ] := [ ba | 1500 ] **4", "ba | 1500", "8C0004F5 00001500"),
        ("[ba|1500]:=[gr3]", "ba|1500", "8A00013F 00001500"),
        (" [ ba | 1500 ] := [ gr3 ] ", "ba | 1500", "8A00013F 00001500"),
        ("[ba|1500]:=[gr3]**A", "ba|1500", "8A000A3F 00001500"),
        (" [ ba | 1500 ] := [ gr3 ] **A", "ba | 1500", "8A000A3F 00001500"),
    ];
    for (line, offset, expected) in cases {
        check_based(line, offset, expected, '9');
    }
}

#[test]
fn memcpy_between_registers() {
    check("[gr4]:=[gr7]", "8C000174 00000000");
    check(" [ gr4 ] := [ gr7 ] ", "8C000174 00000000");
    check("[gr4]:=[gr7]**BB", "8C00BB74 00000000");
    check(" [ gr4 ] := [ gr7 ] **BB", "8C00BB74 00000000");

    check("[gr6|3C]:=[gr9]", "8A000196 0000003C");
    check("[ gr6 | 3C ] := [ gr9 ]", "8A000196 0000003C");
    check("[gr6|3C]:=[gr9]**F6", "8A00F696 0000003C");
    check("[ gr6 | 3C ] := [ gr9 ] **F6", "8A00F696 0000003C");

    check("[gr6]:=[gr9|3C]", "8C000196 0000003C");
    check(" [ gr6 ] := [ gr9 | 3C ]", "8C000196 0000003C");
    check("[gr6]:=[gr9|3C]**F6", "8C00F696 0000003C");
    check(" [ gr6 ] := [ gr9 | 3C ] **F6", "8C00F696 0000003C");
}

#[test]
fn memcpy_count_too_large() {
    check_fails("[gr4]:=[gr7]**10000", Severity::Fatal);
    check("[gr4]:=[gr7]**FFFF", "8CFFFF74 00000000");
}

// A bare `[ba]` is the base address, but `[0ba]` is the address 0xBA.
#[test]
fn store_bare_base() {
    check("[ba]:=bgrA", "8401000A 00000000");
    check("[ ba ] := b grA", "8401000A 00000000");
    check("[ba]:=bgrA**3C", "840103BA 00000000");
    check("[ ba ] := b grA **3C", "840103BA 00000000");

    check("[0ba]:=bgrA", "8400000A 000000BA");
    check("[ 0ba ] := b grA", "8400000A 000000BA");
    check("[0ba]:=bgrA**3C", "840003BA 000000BA");
    check("[ 0ba ] := b grA **3C", "840003BA 000000BA");

    check("[po]:=bgrA", "9401000A 00000000");
}

#[test]
fn store() {
    let cases = [
        ("[ba|001500]:=bgrA", "ba|001500", "8401000A 00001500"),
        ("[ ba | 001500 ] := b grA", "ba | 001500", "8401000A 00001500"),
        ("[ba|001500]:=bgrA**1C", "ba|001500", "840101BA 00001500"),
        ("[ ba | 001500 ] := b grA **1C", "ba | 001500", "840101BA 00001500"),
        ("[ba|001500]:=hgrA", "ba|001500", "8411000A 00001500"),
        ("[ ba | 001500 ] := h grA", "ba | 001500", "8411000A 00001500"),
        ("[ba|001500]:=hgrA**1C", "ba|001500", "841101BA 00001500"),
        ("[ ba | 001500 ] := h grA **1C", "ba | 001500", "841101BA 00001500"),
        ("[ba|001500]:=wgrA", "ba|001500", "8421000A 00001500"),
        ("[ ba | 001500 ] := w grA", "ba | 001500", "8421000A 00001500"),
        ("[ba|001500]:=wgrA**1C", "ba|001500", "842101BA 00001500"),
        ("[ ba | 001500 ] := w grA **1C", "ba | 001500", "842101BA 00001500"),
    ];
    for (line, offset, expected) in cases {
        check_based(line, offset, expected, '9');

        let absolute = line.replacen("ba|", "", 1).replacen("ba | ", "", 1);
        let expected = format!("{}0{}", &expected[..3], &expected[4..]);
        check(&absolute, &expected);
    }
}

#[test]
fn invalid_syntax() {
    let out = check_fails("int main(int argc, char** argv) {", Severity::Fatal);
    assert!(out.text.is_empty());
    assert!(out.diagnostics[0].message.starts_with("invalid syntax"));
}
