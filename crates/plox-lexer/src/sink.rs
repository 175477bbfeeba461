//! The error sink contract shared by every stage of the pipeline.
//!
//! Scanner, parser and resolver never format or print diagnostics
//! themselves — they report through this trait, and a sticky "had error"
//! flag lives on the concrete sink the driver owns. This keeps formatting
//! in one place (`plox-cli::diagnostics`) and keeps the core testable
//! without stdout/stderr.

use crate::token::Token;

pub trait ErrorSink {
    /// A scan/parse/resolve error anchored to a source line only.
    fn error_with_line(&mut self, line: usize, message: &str);

    /// A parse/resolve error anchored to a specific token.
    fn error(&mut self, token: &Token, message: &str);
}

/// A sink for tests that only cares whether anything was reported.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub messages: Vec<String>,
}

impl ErrorSink for RecordingSink {
    fn error_with_line(&mut self, line: usize, message: &str) {
        self.messages.push(format!("[line {line}] Error: {message}"));
    }

    fn error(&mut self, token: &Token, message: &str) {
        use crate::token::TokenKind;
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        self.messages
            .push(format!("[line {}] Error{}: {}", token.line, location, message));
    }
}
