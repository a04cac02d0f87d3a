mod grammar;

use crate::{AliasEntry, AliasTable, Diagnostic, Includes, MemIncludes, NoIncludes, Severity};

pub const GAME_E0: &str = "RVL-SOUE-0A-0";
pub const GAME_E1: &str = "RVL-SOUE-0A-1";
pub const GAME_J: &str = "RVL-SOUJ-0A-0";
pub const GAME_P0: &str = "RVL-SOUP-0A-0";
pub const GAME_P1: &str = "RVL-SOUP-0A-1";

pub fn aliases() -> AliasTable {
    let versions = [GAME_E0, GAME_E1, GAME_J, GAME_P0, GAME_P1]
        .iter()
        .map(|v| v.to_string())
        .collect();
    AliasTable::new(versions, [
        AliasEntry::new("InputBuffer")
            .with(GAME_J, 0x8059cf8c)
            .with(GAME_P1, 0x8059b48c)
            .with(GAME_P0, 0x8059b28c),
        AliasEntry::new("ReloaderPtr")
            .with(GAME_J, 0x805789f4)
            .with(GAME_P1, 0x80576ed4)
            .with(GAME_P0, 0x80576d34)
            .with(GAME_E0, 0x80575794)
            .with(GAME_E1, 0x80575c74),
        AliasEntry::new("Spawn")
            .with(GAME_J, 0x805b6b0c)
            .with(GAME_P1, 0x805b4fe0)
            .with(GAME_P0, 0x805b4de0),
        AliasEntry::new("SettingsFlags").with("*", 0x80004200),
        AliasEntry::new("CurrentFiles").with("*", 0x8095545c),
        AliasEntry::new("EmptyA").with("*", 0x80001500),
        AliasEntry::new("LinkPtr").with(GAME_E0, 0x8057578c),
    ])
}

/// The parts of a compiled unit tests look at, detached from the alias table.
pub struct Output {
    pub text: String,
    pub severity: Option<Severity>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn compile_with(text: &str, game: &str, includes: &dyn Includes) -> Output {
    let aliases = aliases();
    let unit = crate::compile(text, game, "test", &aliases, includes);
    for diag in &unit.diagnostics {
        println!("{diag}");
    }
    Output {
        text: unit.code_text(),
        severity: unit.severity,
        diagnostics: unit.diagnostics,
    }
}

pub fn compile_for(text: &str, game: &str) -> Output {
    compile_with(text, game, &NoIncludes)
}

pub fn compile(text: &str) -> Output {
    compile_for(text, GAME_J)
}

/// Compile for `game` and check that it succeeds with output `expected`, ignoring case.
pub fn check_for(text: &str, game: &str, expected: &str) {
    let out = compile_for(text, game);
    assert!(
        out.severity.map_or(true, |sev| sev < Severity::Error),
        "'{text}' failed with {:?}",
        out.severity,
    );
    assert_eq!(out.text, expected.to_lowercase(), "compiling '{text}'");
}

pub fn check(text: &str, expected: &str) {
    check_for(text, GAME_J, expected);
}

/// Compile and check that the worst diagnostic is `severity`.
pub fn check_fails(text: &str, severity: Severity) -> Output {
    let out = compile(text);
    assert_eq!(out.severity, Some(severity), "compiling '{text}'");
    out
}

pub fn includes() -> MemIncludes {
    let mut includes = MemIncludes::default();
    includes.insert(GAME_J, "tmp-test", "C0000000 00000001\n4E800020 00000000\n");
    includes.insert("*", "free", "c0000000 00000000\n\n");
    includes
}
