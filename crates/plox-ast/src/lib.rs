//! Plox Abstract Syntax Tree
//!
//! Tagged-enum nodes produced by the parser and consumed by the resolver
//! and interpreter. No visitor trait: every later stage matches directly,
//! which is idiomatic once the node count is fixed and shared across a
//! handful of crates that all live in this workspace.

pub mod expr;
pub mod stmt;

pub use expr::{Expr, LiteralValue, NodeId};
pub use stmt::{ClassDecl, FunctionDecl, Stmt};
