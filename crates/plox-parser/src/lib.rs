//! Plox Parser
//!
//! Recursive-descent, one token of lookahead, with panic-mode recovery
//! at statement boundaries.

pub mod parser;

pub use parser::Parser;
