//! The driver compiling a whole project. A project is laid out as:
//!
//! * `src/` with the gecko units `<name>.gecko` and the alias file `aliases.toml`.
//! * `src-asm/` with the assembly units `<name>.asm` and the shared `_macros.asm`.
//! * `build-asm/` with the assembled units, one folder per game version.
//! * `build/` with the packed `<version>.gct` and `<version>.ini` files.
//!
//! Every gecko unit is compiled for every game version, except for versions an `!assertgame`
//! directive excludes. A fatal diagnostic aborts the run, and a unit with errors is left out of
//! the output.

use gck_asm::{CompiledUnit, Diagnostic, DirIncludes, Severity};
use thiserror::Error;

use crate::asm::{AsmError, AsmProject, Assembler};
use crate::config::{AliasConfig, ConfigError};
use crate::pack::{self, PackError};

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Asm(#[from] AsmError),

    #[error("{0}")]
    Pack(#[from] PackError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Aborted because of fatal error in {name} for {game}")]
    Aborted { name: String, game: String },
}

pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        Self { root: root.to_path_buf() }
    }

    pub fn src(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn src_asm(&self) -> PathBuf {
        self.root.join("src-asm")
    }

    pub fn build_asm(&self) -> PathBuf {
        self.root.join("build-asm")
    }

    pub fn build(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn aliases(&self) -> PathBuf {
        self.src().join("aliases.toml")
    }
}

pub struct Options {
    /// Only compile for game versions containing this.
    pub game_filter: String,
    /// Only compile units whose name contains this.
    pub code_filter: String,
    pub gct: bool,
    pub ini: bool,
    /// Assemble the assembly units with this before compiling.
    pub assembler: Option<Assembler>,
    /// Group name written before each code in the ini.
    pub prefix: String,
    /// Alias file to use instead of the one in the source folder.
    pub aliases: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            game_filter: String::new(),
            code_filter: String::new(),
            gct: true,
            ini: true,
            assembler: None,
            prefix: "geckoc".to_string(),
            aliases: None,
        }
    }
}

/// The outcome of a run.
#[derive(Debug, Default)]
pub struct Report {
    /// The codes packed for each game version, in packing order.
    pub encoded: BTreeMap<String, Vec<String>>,
    /// Units left out because of errors, as `(name, game)`.
    pub excluded: Vec<(String, String)>,
    /// Units without any code, as `(name, game)`.
    pub empty: Vec<(String, String)>,
}

fn log_diagnostic(unit: &CompiledUnit, diag: &Diagnostic) {
    let level = match diag.severity {
        Severity::Info => log::Level::Info,
        Severity::Warning => log::Level::Warn,
        Severity::Error | Severity::Fatal => log::Level::Error,
    };
    log!(level, "{} ({}): {diag}", unit.context.name, unit.context.game);
}

/// The names of the gecko units in `src` containing `filter`, sorted.
fn units(src: &Path, filter: &str) -> Result<Vec<String>, io::Error> {
    let mut names = Vec::new();
    for entry in fs::read_dir(src)? {
        let path = entry?.path();
        if path.extension().map_or(true, |ext| ext != "gecko") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            if stem.contains(filter) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn remove_stale(path: &Path) -> Result<(), io::Error> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("removed stale {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Compile the project at `layout`.
pub fn run(layout: &Layout, options: &Options) -> Result<Report, Error> {
    let alias_path = options.aliases.clone().unwrap_or_else(|| layout.aliases());
    let aliases = AliasConfig::load(&alias_path)?.into_table()?;
    let versions: Vec<&str> = aliases.version_list(&options.game_filter).collect();
    debug!("game versions: {versions:?}");

    let build_asm = layout.build_asm();

    if let Some(assembler) = &options.assembler {
        let src_asm = layout.src_asm();
        let project = AsmProject {
            aliases: &aliases,
            assembler,
            src: &src_asm,
            build: &build_asm,
        };
        let count = project.assemble_all(&versions)?;
        info!("assembled {count} units");
    }

    let includes = DirIncludes::new(&build_asm);
    let mut report = Report::default();
    let mut outputs: BTreeMap<&str, Vec<CompiledUnit>> = BTreeMap::new();

    let src = layout.src();
    for name in units(&src, &options.code_filter)? {
        let source = fs::read_to_string(src.join(format!("{name}.gecko")))?;
        for &game in &versions {
            let unit = gck_asm::compile(&source, game, &name, &aliases, &includes);
            if unit.is_restricted() {
                debug!("skipping {name} for {game} because of assertgame directive");
                continue;
            }
            for diag in &unit.diagnostics {
                log_diagnostic(&unit, diag);
            }
            if unit.severity == Some(Severity::Fatal) {
                return Err(Error::Aborted {
                    name,
                    game: game.to_string(),
                });
            }
            if unit.is_excluded() {
                warn!("leaving out {name} for {game} because of errors");
                report.excluded.push((name.clone(), game.to_string()));
            } else if unit.is_empty() {
                warn!("ignoring empty code: {name} for {game}");
                report.empty.push((name.clone(), game.to_string()));
            } else {
                info!("will encode: {name} for {game}");
                outputs.entry(game).or_default().push(unit);
            }
        }
    }

    if outputs.is_empty() {
        info!("no codes found");
        return Ok(report);
    }

    let build = layout.build();
    fs::create_dir_all(&build)?;

    for &game in &versions {
        let gct_path = build.join(format!("{game}.gct"));
        let ini_path = build.join(format!("{game}.ini"));
        let Some(units) = outputs.get(game) else {
            info!("no codes found for {game}, not encoding");
            remove_stale(&gct_path)?;
            remove_stale(&ini_path)?;
            continue;
        };
        info!("encoding {game}");
        if options.gct {
            fs::write(&gct_path, pack::gct(units)?)?;
        }
        if options.ini {
            fs::write(&ini_path, pack::ini(units, &options.prefix))?;
        }
        report.encoded.insert(
            game.to_string(),
            units.iter().map(|unit| unit.context.name.clone()).collect(),
        );
    }

    Ok(report)
}
