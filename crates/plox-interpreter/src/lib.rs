//! Plox Interpreter
//!
//! Environments, runtime values, and the tree-walking evaluator that
//! turns a resolved AST into program behavior.

pub mod environment;
pub mod interpreter;
pub mod output;
pub mod value;

pub use environment::Environment;
pub use interpreter::{Interpreter, RuntimeError, Unwind};
pub use output::SharedBuffer;
pub use value::{Callable, LoxClass, LoxFunction, LoxInstance, NativeFunction, Value};
