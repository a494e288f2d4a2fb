//! Execution core of a small line-oriented command interpreter.
//!
//! A line goes through these steps in order:
//! [`syntax::normalize_operators`] spaces out `|`, `<`, `>` and `>>`;
//! [`syntax::validate_pipes`] rejects malformed pipe sequences;
//! [`lexer::tokenize`] splits the line on `|`, then each stage on whitespace;
//! [`parser::parse_stage`] pulls out redirections; finally
//! [`executor::run_pipeline`] forks one process per stage, connects them with
//! pipes and waits for every child.
//!
//! [`Interpreter`] ties these together with the `cd` and `exit` builtins and a
//! `rustyline` read-eval loop.

pub mod builtin;
pub mod config;
pub mod env;
pub mod executor;
pub mod interrupt;
mod interpreter;
pub mod lexer;
pub mod parser;
pub mod syntax;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

pub use builtin::Flow;
pub use config::Config;
pub use executor::{PipelineReport, run_pipeline};
pub use interpreter::Interpreter;
pub use parser::{Pipeline, Stage, parse_line};
