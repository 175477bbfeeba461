//! Concrete `ErrorSink` that writes to stderr in the driver's canonical
//! format and keeps the two sticky flags the top-level loop needs to
//! pick an exit code: whether anything failed to scan/parse/resolve,
//! and whether a runtime error was hit while interpreting.

use plox_interpreter::RuntimeError;
use plox_lexer::{ErrorSink, Token, TokenKind};

#[derive(Default)]
pub struct Diagnostics {
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl Diagnostics {
    pub fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("{}\n[line {}]", error.message, error.token.line);
        self.had_runtime_error = true;
    }
}

impl ErrorSink for Diagnostics {
    fn error_with_line(&mut self, line: usize, message: &str) {
        eprintln!("[line {line}] Error: {message}");
        self.had_error = true;
    }

    fn error(&mut self, token: &Token, message: &str) {
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        eprintln!("[line {}] Error{}: {}", token.line, location, message);
        self.had_error = true;
    }
}
