//! Plox Resolver
//!
//! Static lexical-scope analysis between parsing and evaluation: binds
//! every variable reference to a definite scope depth ahead of time so
//! the evaluator never has to guess at runtime, and catches a handful of
//! static errors (`return` outside a function, `this`/`super` misuse,
//! self-referential initializers) the parser has no way to see.

pub mod resolver;

pub use resolver::{resolve, ResolvedLocals, Resolver};
