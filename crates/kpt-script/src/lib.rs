//! kpt-script — the scripted-transformer built-in's expression language
//! (SPEC_FULL.md §9.1): field access, comparisons, logic, and a single
//! assignment statement form, evaluated directly against a resource's
//! `serde_json::Value` tree.

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;

pub use ast::{Expr, Literal, Program, Statement};
pub use error::{Result, ScriptError};
pub use parser::parse;

/// Parses and runs `source` against `root` in one call.
pub fn run(source: &str, root: &mut serde_json::Value) -> Result<()> {
    let program = parse(source)?;
    eval::run(&program, root)
}
