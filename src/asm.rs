//! Preparation of raw assembly for the external assembler. Each `.asm` unit is assembled once per
//! game version, and once without a version, into `<build>/<version>/<name>.gecko`. Gecko units
//! include the result with `{name.asm}`.

use gck_asm::alias::UNIVERSAL;
use gck_asm::{AliasTable, DirIncludes, Mode};
use thiserror::Error;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Shared macros prepended to every unit.
pub const MACROS_FILE: &str = "_macros.asm";

#[derive(Error, Debug)]
pub enum AsmError {
    #[error("Assembler command is empty")]
    EmptyCommand,

    #[error("Failed to run assembler '{command}': {err}")]
    Spawn { command: String, err: io::Error },

    #[error("Assembler failed on {name} for {version}: {stderr}")]
    Failed { name: String, version: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An external assembler turning assembly into gecko lines. The command is given as a program
/// followed by arguments, and the path of the file to assemble is appended as the last argument.
/// The gecko lines are read from stdout.
#[derive(Debug, Clone)]
pub struct Assembler {
    program: String,
    args: Vec<String>,
}

impl Assembler {
    pub fn new(command: &str) -> Result<Self, AsmError> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next().ok_or(AsmError::EmptyCommand)?;
        Ok(Self { program, args: words.collect() })
    }

    fn run(&self, input: &Path) -> Result<std::process::Output, AsmError> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .output()
            .map_err(|err| AsmError::Spawn { command: self.program.clone(), err })
    }
}

/// The source passed to the assembler for `version`: the alias constants, the shared macros and
/// then the unit itself, with every alias replaced.
pub fn prepare(aliases: &AliasTable, version: &str, macros: &str, source: &str) -> String {
    let mut text: Vec<String> = aliases.macros_for_version(version).collect();
    text.push(macros.to_string());
    text.push(source.to_string());
    let joined = text.join("\n");
    let mut out: String = joined
        .split('\n')
        .map(|line| aliases.substitute(line, version, Mode::Asm))
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Folder of assembled units for `version`.
pub fn version_dir(build: &Path, version: &str) -> PathBuf {
    DirIncludes::new(build).version_dir(version)
}

/// Assembles units from a source folder into a build folder.
pub struct AsmProject<'a> {
    pub aliases: &'a AliasTable,
    pub assembler: &'a Assembler,
    pub src: &'a Path,
    pub build: &'a Path,
}

impl<'a> AsmProject<'a> {
    /// The names of every assembly unit, sorted.
    pub fn units(&self) -> Result<Vec<String>, AsmError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.src)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "asm") {
                continue;
            }
            if path.file_name().map_or(false, |name| name == MACROS_FILE) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Assemble `name` for every version in `versions` and the version free build.
    pub fn assemble_unit(&self, name: &str, versions: &[&str]) -> Result<(), AsmError> {
        let source = fs::read_to_string(self.src.join(format!("{name}.asm")))?;
        let macros = match fs::read_to_string(self.src.join(MACROS_FILE)) {
            Ok(macros) => macros,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        fs::create_dir_all(self.build)?;
        let input = self.build.join("tmp.asm");

        for &version in versions.iter().chain([UNIVERSAL].iter()) {
            fs::write(&input, prepare(self.aliases, version, &macros, &source))?;

            let output = self.assembler.run(&input)?;
            if !output.status.success() {
                return Err(AsmError::Failed {
                    name: name.to_string(),
                    version: version.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            let dir = version_dir(self.build, version);
            fs::create_dir_all(&dir)?;
            let mut gecko: String = String::from_utf8_lossy(&output.stdout)
                .trim()
                .lines()
                .map(|line| format!("{}\n", line.trim()))
                .collect();
            if gecko.is_empty() {
                gecko.push('\n');
            }
            fs::write(dir.join(format!("{name}.gecko")), gecko)?;
            info!("assembled {version}/{name}.asm");
        }

        fs::remove_file(&input)?;
        Ok(())
    }

    /// Assemble every unit for `versions`. Returns the number of units assembled.
    pub fn assemble_all(&self, versions: &[&str]) -> Result<usize, AsmError> {
        let units = self.units()?;
        for name in &units {
            self.assemble_unit(name, versions)?;
        }
        Ok(units.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gck_asm::AliasEntry;

    #[test]
    fn prepared_source() {
        let aliases = AliasTable::new(vec!["RVL-SOUE-0A-0".to_string()], [
            AliasEntry::new("LinkPtr").with("RVL-SOUE-0A-0", 0x8057578c),
            AliasEntry::new("EmptyA").with("*", 0x80001500),
        ]);
        let text = prepare(&aliases, "RVL-SOUE-0A-0", ".macro push\n.endm", "liw r4,<LinkPtr>");
        assert_eq!(text, "\
.set EmptyA, 0x80001500
.set LinkPtr, 0x8057578C
.macro push
.endm
liw r4,0x8057578C
");
        let text = prepare(&aliases, "*", "", "liw r4,<LinkPtr>");
        assert_eq!(text, ".set EmptyA, 0x80001500\n\nliw r4,<LinkPtr>\n");
    }

    #[test]
    fn empty_command() {
        assert!(matches!(Assembler::new("  "), Err(AsmError::EmptyCommand)));
    }

    #[test]
    fn free_dir() {
        let build = Path::new("build-asm");
        assert_eq!(version_dir(build, "*"), build.join(".free"));
        assert_eq!(version_dir(build, "RVL-SOUJ-0A-0"), build.join("RVL-SOUJ-0A-0"));
    }
}
