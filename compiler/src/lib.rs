//! rulec Compiler
//!
//! Transform rule source into a compiled [`Policy`](rulec_core::Policy).
//!
//! Responsibilities:
//! - Resolve `macro`, `tag`, and `cap` declarations into their registries
//! - Expand `include` directives with positional parameter binding
//! - Validate and encode match predicates and actions
//! - Compile every capability and the base rule set
//!
//! Compilation is all-or-nothing: the first error stops it.

mod actions;
mod compiler;
mod declare;
mod error;
mod literal;
mod matches;

pub use compiler::{compile, Compiler, Stage};
pub use error::{CompileError, CompileResult};
pub use matches::match_arity;
