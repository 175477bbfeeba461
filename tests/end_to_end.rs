//! Whole-pipeline tests: scan -> parse -> resolve -> interpret, the same
//! sequence the CLI driver runs. Most programs that should succeed
//! assert their invariant by raising a runtime error (string + number)
//! if it doesn't hold; a couple assert directly on captured `print`
//! output via `SharedBuffer`.

use plox_interpreter::{Interpreter, SharedBuffer};
use plox_lexer::{RecordingSink, Scanner};
use plox_parser::Parser;
use plox_resolver::resolve;

fn run(source: &str) -> Result<(), String> {
    let mut sink = RecordingSink::default();
    let tokens = Scanner::new(source).scan_tokens(&mut sink);
    let statements = Parser::new(tokens, &mut sink).parse();
    if !sink.messages.is_empty() {
        return Err(sink.messages.join("\n"));
    }

    let locals = resolve(&statements, &mut sink);
    if !sink.messages.is_empty() {
        return Err(sink.messages.join("\n"));
    }

    Interpreter::new(locals)
        .interpret(&statements)
        .map_err(|err| err.message)
}

fn assert_ok(source: &str) {
    if let Err(err) = run(source) {
        panic!("expected program to run cleanly, got: {err}\nsource:\n{source}");
    }
}

#[test]
fn arithmetic_precedence_and_grouping() {
    assert_ok(
        r#"
        if (1 + 2 * 3 != 7) { "fail" + 1; }
        if ((1 + 2) * 3 != 9) { "fail" + 1; }
        if (-2 * -2 != 4) { "fail" + 1; }
        "#,
    );
}

#[test]
fn block_scoping_shadows_without_mutating_the_outer_binding() {
    assert_ok(
        r#"
        var a = "outer";
        {
          var a = "inner";
          if (a != "inner") { "fail" + 1; }
        }
        if (a != "outer") { "fail" + 1; }
        "#,
    );
}

#[test]
fn closures_capture_their_defining_environment_by_reference() {
    assert_ok(
        r#"
        fun makeCounter() {
          var count = 0;
          fun increment() {
            count = count + 1;
            return count;
          }
          return increment;
        }
        var counter = makeCounter();
        if (counter() != 1) { "fail" + 1; }
        if (counter() != 2) { "fail" + 1; }
        if (counter() != 3) { "fail" + 1; }
        "#,
    );
}

#[test]
fn single_inheritance_dispatches_through_super() {
    assert_ok(
        r#"
        class Greeter {
          greet() { return "hello from base"; }
        }
        class LoudGreeter < Greeter {
          greet() { return super.greet() + "!"; }
        }
        if (LoudGreeter().greet() != "hello from base!") { "fail" + 1; }
        "#,
    );
}

#[test]
fn initializer_always_returns_the_constructed_instance() {
    assert_ok(
        r#"
        class Point {
          init(x, y) {
            this.x = x;
            this.y = y;
          }
        }
        var p = Point(3, 4);
        if (p.x != 3) { "fail" + 1; }
        if (p.y != 4) { "fail" + 1; }
        "#,
    );
}

#[test]
fn print_statements_write_one_formatted_value_per_line() {
    let mut sink = RecordingSink::default();
    let tokens = Scanner::new("print 1 + 1;\nprint \"hi\" + \" there\";\nprint nil;")
        .scan_tokens(&mut sink);
    let statements = Parser::new(tokens, &mut sink).parse();
    assert!(sink.messages.is_empty());
    let locals = resolve(&statements, &mut sink);
    assert!(sink.messages.is_empty());

    let buffer = SharedBuffer::new();
    Interpreter::with_output(locals, Box::new(buffer.clone()))
        .interpret(&statements)
        .unwrap();

    assert_eq!(buffer.contents(), "2\nhi there\nnil\n");
}

#[test]
fn top_level_return_is_rejected_before_interpretation() {
    let mut sink = RecordingSink::default();
    let tokens = Scanner::new("return 1;").scan_tokens(&mut sink);
    let statements = Parser::new(tokens, &mut sink).parse();
    let _ = resolve(&statements, &mut sink);

    assert_eq!(
        sink.messages,
        vec!["[line 1] Error at 'return': Can't return from top-level code."]
    );
}

#[test]
fn and_or_short_circuit_without_evaluating_the_right_operand() {
    assert_ok(
        r#"
        fun explode() { "fail" + 1; return true; }
        if (false and explode()) { "fail" + 1; }
        if (!(true or explode())) { "fail" + 1; }
        "#,
    );
}

#[test]
fn methods_retain_this_when_stored_and_called_later() {
    assert_ok(
        r#"
        class Box {
          init(value) { this.value = value; }
          get() { return this.value; }
        }
        var box = Box(42);
        var getter = box.get;
        if (getter() != 42) { "fail" + 1; }
        "#,
    );
}

#[test]
fn for_loop_desugars_and_runs_the_expected_number_of_times() {
    assert_ok(
        r#"
        var sum = 0;
        for (var i = 0; i < 5; i = i + 1) {
          sum = sum + i;
        }
        if (sum != 10) { "fail" + 1; }
        "#,
    );
}

#[test]
fn calling_undeclared_variable_is_a_runtime_error() {
    let err = run("foo();").unwrap_err();
    assert_eq!(err, "Undefined variable 'foo'.");
}
