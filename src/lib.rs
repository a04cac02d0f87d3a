//! Front end of the gecko code compiler: loading aliases, assembling raw assembly with an
//! external assembler, compiling every unit of a project and packing the results.

#[macro_use]
extern crate log;

pub mod asm;
pub mod config;
pub mod pack;
pub mod project;
