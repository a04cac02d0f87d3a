//! The compilation pipeline. Each stage consumes the lines of the previous stage and returns new
//! ones, so the state of a compile is always explicit.

use crate::alias::{AliasTable, Mode, UNIVERSAL};
use crate::diag::{self, Diagnostic, Diagnostics, Severity};
use crate::grammar::{self, Encoded, LineCx};
use crate::include::Includes;
use crate::scan::Scanner;

use std::collections::HashMap;

/// Everything a compile of a single code for a single game version needs to know.
#[derive(Clone)]
pub struct Context<'a> {
    /// The game version compiled for.
    pub game: String,
    /// The name of the code.
    pub name: String,
    pub aliases: &'a AliasTable,
    pub includes: &'a dyn Includes,
    /// If aliases should always resolve to their universal value. Set by `!assertgame *`.
    pub version_free: bool,
    /// The versions the code is restricted to by `!assertgame`. Empty if unrestricted.
    pub games: Vec<String>,
}

impl<'a> Context<'a> {
    pub fn new(
        game: impl Into<String>,
        name: impl Into<String>,
        aliases: &'a AliasTable,
        includes: &'a dyn Includes,
    ) -> Self {
        Self {
            game: game.into(),
            name: name.into(),
            aliases,
            includes,
            version_free: false,
            games: Vec::new(),
        }
    }

    /// The version aliases and includes are resolved for.
    pub fn alias_version(&self) -> &str {
        if self.version_free {
            UNIVERSAL
        } else {
            &self.game
        }
    }
}

/// The result of compiling a code for a game version.
pub struct CompiledUnit<'a> {
    /// Gecko lines in lowercase, fx. `c0000000 00000001`.
    pub lines: Vec<String>,
    /// Every diagnostic, sorted by source line.
    pub diagnostics: Vec<Diagnostic>,
    /// The worst severity of `diagnostics`.
    pub severity: Option<Severity>,
    pub context: Context<'a>,
}

impl<'a> CompiledUnit<'a> {
    /// All lines joined by newlines.
    pub fn code_text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// If the unit should be left out of the output. That is the case for units with errors.
    pub fn is_excluded(&self) -> bool {
        self.severity.map_or(false, |severity| severity >= Severity::Error)
    }

    /// If `!assertgame` restricts the code to other versions than the one compiled for.
    pub fn is_restricted(&self) -> bool {
        let games = &self.context.games;
        !games.is_empty() && !games.contains(&self.context.game)
    }
}

/// A single source line as it moves through the pipeline.
struct Line {
    /// The line number in the source file.
    number: usize,
    /// The text without comments and whitespace, after alias substitution once that stage has
    /// run.
    text: String,
    /// If the line is an `!assertgame` directive.
    assertion: bool,
    encoded: Encoded,
    /// The index of the first gecko line the line produces.
    gecko_line: usize,
    diags: Diagnostics,
}

/// Gecko line index of each label.
type Labels = HashMap<String, usize>;

/// The version restriction of an `!assertgame` line.
enum Assertion {
    /// `!assertgame v1 v2 ...`
    Games(Vec<String>),
    /// `!assertgame *`
    VersionFree,
}

fn parse_assertion(text: &str) -> Option<Assertion> {
    let mut s = Scanner::new(text);
    s.keyword("!assertgame")?.ws1()?;
    if s.eat_char('*') {
        s.end()?;
        return Some(Assertion::VersionFree);
    }
    let games: Vec<String> = s.rest().split_whitespace().map(str::to_string).collect();
    (!games.is_empty()).then_some(Assertion::Games(games))
}

/// Split into lines, remove comments and trailing whitespace and drop empty lines.
fn split(source: &str) -> Vec<Line> {
    source
        .split('\n')
        .enumerate()
        .filter_map(|(i, raw)| {
            let text = raw.split('#').next().unwrap_or("").trim();
            (!text.is_empty()).then(|| Line {
                number: i + 1,
                text: text.to_string(),
                assertion: false,
                encoded: Encoded::Empty,
                gecko_line: 0,
                diags: Diagnostics::new(i + 1),
            })
        })
        .collect()
}

/// Handle `!assertgame`, which is only allowed on the first line.
fn check_assertions<'a>(mut lines: Vec<Line>, mut ctx: Context<'a>) -> (Vec<Line>, Context<'a>) {
    for (i, line) in lines.iter_mut().enumerate() {
        let Some(assertion) = parse_assertion(&line.text) else {
            continue;
        };
        line.assertion = true;
        if i != 0 {
            line.diags.fatal(format!(
                "assertgame directive found after compiled code in {}",
                ctx.name,
            ));
            continue;
        }
        match assertion {
            Assertion::Games(games) => {
                if !games.contains(&ctx.game) {
                    line.diags.fatal(format!(
                        "aborting code {} for {} because of assertgame directive",
                        ctx.name, ctx.game,
                    ));
                }
                if ctx.games.is_empty() {
                    ctx.games = games;
                }
            }
            Assertion::VersionFree => ctx.version_free = true,
        }
    }
    (lines, ctx)
}

fn substitute(lines: Vec<Line>, ctx: &Context) -> Vec<Line> {
    let version = ctx.alias_version();
    lines
        .into_iter()
        .map(|mut line| {
            if !line.assertion {
                line.text = ctx.aliases.substitute(&line.text, version, Mode::Code);
            }
            line
        })
        .collect()
}

fn encode(lines: Vec<Line>, ctx: &Context) -> Vec<Line> {
    let version = ctx.alias_version();
    lines
        .into_iter()
        .map(|mut line| {
            if line.assertion {
                return line;
            }
            let mut cx = LineCx {
                version,
                includes: ctx.includes,
                diags: &mut line.diags,
            };
            match grammar::encode(&line.text, &mut cx) {
                Some(encoded) => line.encoded = encoded,
                None => line.diags.fatal(format!("invalid syntax: \"{}\"", line.text)),
            }
            line
        })
        .collect()
}

/// Assign gecko line numbers and collect every label. A label takes the gecko line of the next
/// line producing output.
fn number(lines: Vec<Line>) -> (Vec<Line>, Labels) {
    let mut labels = Labels::new();
    let mut gecko_line = 0;
    let lines = lines
        .into_iter()
        .map(|mut line| {
            line.gecko_line = gecko_line;
            if let Encoded::Label(name) = &line.encoded {
                if labels.insert(name.clone(), gecko_line).is_some() {
                    line.diags.fatal(format!("label '{name}' redeclared"));
                }
            }
            gecko_line += line.encoded.len();
            line
        })
        .collect();
    (lines, labels)
}

/// Resolve the distance of every branch now that all labels are known.
fn resolve(lines: Vec<Line>, labels: &Labels) -> Vec<Line> {
    lines
        .into_iter()
        .map(|mut line| {
            let Encoded::Branch(branch) = &line.encoded else {
                return line;
            };
            let branch = branch.clone();
            line.encoded = Encoded::Empty;
            match labels.get(&branch.label) {
                Some(&target) => {
                    let text = branch.render(line.gecko_line, target, &mut line.diags);
                    line.encoded = Encoded::Line(text);
                }
                None => line.diags.fatal(format!("unknown label '{}'", branch.label)),
            }
            line
        })
        .collect()
}

fn finish<'a>(lines: Vec<Line>, ctx: Context<'a>) -> CompiledUnit<'a> {
    let mut code = Vec::new();
    let mut diags = Vec::with_capacity(lines.len());
    for line in lines {
        if line.diags.any_at_least(Severity::Error) {
            debug!("line {} of {} rejected: '{}'", line.number, ctx.name, line.text);
        }
        match line.encoded {
            Encoded::Line(text) => code.push(text),
            Encoded::Lines(texts) => code.extend(texts),
            Encoded::Empty | Encoded::Label(..) | Encoded::Branch(..) => (),
        }
        diags.push(line.diags);
    }
    let lines = code
        .iter()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect();
    let diagnostics = diag::aggregate(diags);
    CompiledUnit {
        lines,
        severity: diag::worst(&diagnostics),
        diagnostics,
        context: ctx,
    }
}

/// Compile `source` for the game version and code given by `ctx`.
pub fn compile<'a>(source: &str, ctx: Context<'a>) -> CompiledUnit<'a> {
    debug!("compiling {} for {}", ctx.name, ctx.game);

    let (lines, ctx) = check_assertions(split(source), ctx);

    // An aborted version assertion stops here, so that a syntax error further down isn't
    // reported as a separate failure.
    if lines.iter().any(|line| line.diags.any_at_least(Severity::Error)) {
        debug!("{} aborted for {} before parsing", ctx.name, ctx.game);
        let lines = lines
            .into_iter()
            .map(|mut line| {
                line.encoded = Encoded::Empty;
                line
            })
            .collect();
        return finish(lines, ctx);
    }

    let lines = substitute(lines, &ctx);
    let lines = encode(lines, &ctx);
    let (lines, labels) = number(lines);
    let lines = resolve(lines, &labels);

    finish(lines, ctx)
}
