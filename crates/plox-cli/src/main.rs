//! Plox CLI
//!
//! Zero arguments starts an interactive REPL; one argument runs that
//! file as a script; anything else is a usage error. Exit codes follow
//! the conventional split between a bad invocation, a static error
//! (scan/parse/resolve) and a runtime error, so scripting callers can
//! tell the three apart.

mod diagnostics;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use diagnostics::Diagnostics;
use plox_interpreter::Interpreter;
use plox_lexer::Scanner;
use plox_parser::Parser;
use plox_resolver::resolve;

const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_NOINPUT: u8 = 66;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => run_prompt(),
        [script] => run_file(script),
        _ => {
            eprintln!("Usage: plox [script]");
            ExitCode::from(EX_USAGE)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not read file '{path}': {err}");
            return ExitCode::from(EX_NOINPUT);
        }
    };

    let mut interpreter = Interpreter::new(Default::default());
    let mut diagnostics = Diagnostics::default();
    run(&source, &mut interpreter, &mut diagnostics);

    if diagnostics.had_error {
        ExitCode::from(EX_DATAERR)
    } else if diagnostics.had_runtime_error {
        ExitCode::from(EX_SOFTWARE)
    } else {
        ExitCode::SUCCESS
    }
}

/// Scans, parses, resolves and interprets one program against an
/// already-running interpreter, reporting through `diagnostics` and
/// folding newly resolved locals into the interpreter before running so
/// closures from earlier input stay callable.
fn run(source: &str, interpreter: &mut Interpreter, diagnostics: &mut Diagnostics) {
    let tokens = Scanner::new(source).scan_tokens(diagnostics);
    let statements = Parser::new(tokens, diagnostics).parse();
    if diagnostics.had_error {
        return;
    }

    let locals = resolve(&statements, diagnostics);
    if diagnostics.had_error {
        return;
    }

    interpreter.extend_locals(locals);
    if let Err(err) = interpreter.interpret(&statements) {
        diagnostics.runtime_error(&err);
    }
}

fn run_prompt() -> ExitCode {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    println!("Plox {}", env!("CARGO_PKG_VERSION"));
    println!("Use Ctrl+D to exit, Up/Down for history.\n");

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Failed to initialize readline: {err}");
            return ExitCode::from(EX_SOFTWARE);
        }
    };

    let history_file = dirs::data_dir()
        .map(|dir| dir.join("plox").join("repl_history"))
        .unwrap_or_else(|| PathBuf::from(".plox_history"));
    if let Some(parent) = history_file.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = rl.load_history(&history_file);

    let mut interpreter = Interpreter::new(Default::default());

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let mut diagnostics = Diagnostics::default();
                run(line, &mut interpreter, &mut diagnostics);
                // A mistake on one line shouldn't end the session.
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    let _ = rl.save_history(&history_file);
    ExitCode::SUCCESS
}
