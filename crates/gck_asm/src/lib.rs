//! A compiler for gecko cheat codes. Source files are written in a small line based language of
//! memory writes, conditionals, flow control and register operations, and compile to the packed
//! hex lines the gecko code handler reads.
//!
//! Addresses usually differ between game versions. These are written as `<Alias>` and looked up
//! in an [`AliasTable`] for the version compiled for, so a single source compiles for every
//! version of a game.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

mod scan;

pub mod alias;
pub mod compile;
pub mod diag;
pub mod grammar;
pub mod include;

pub use alias::{AliasEntry, AliasTable, Mode};
pub use compile::{CompiledUnit, Context};
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use include::{DirIncludes, IncludeError, Includes, MemIncludes, NoIncludes};

/// Compile `source` as the code `name` for game version `game`.
pub fn compile<'a>(
    source: &str,
    game: &str,
    name: &str,
    aliases: &'a AliasTable,
    includes: &'a dyn Includes,
) -> CompiledUnit<'a> {
    compile::compile(source, Context::new(game, name, aliases, includes))
}
