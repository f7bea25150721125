//! rulec Parser
//!
//! This crate turns rule source text into a tree of statement blocks:
//! - Tokenizing (whitespace-separated words, `#` comments, `;` terminators)
//! - Block building (nesting driven by block-opening keywords)
//!
//! Neither stage can fail. Malformed structure surfaces later, when the
//! compiler interprets the blocks.

mod ast;
mod block;
mod lexer;

pub use ast::*;
pub use block::build_blocks;
pub use lexer::Lexer;

/// Tokenize `source` and build its block tree.
pub fn parse_blocks(source: &str) -> Block {
    build_blocks(Lexer::new(source).tokenize())
}
