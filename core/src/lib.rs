//! rulec Core Types
//!
//! This crate provides the types shared by the rule compiler and its consumers:
//! - Canonical rule entries (match predicates and actions)
//! - Compiled policy output (base rules, capabilities, tags)
//! - Fixed lookup tables (ethertypes, IP protocols, characteristic bits, reserved words)

mod policy;
mod rule;
pub mod tables;

pub use policy::*;
pub use rule::*;
