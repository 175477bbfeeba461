//! Tree-walking evaluator.
//!
//! Walks the AST directly rather than compiling it, matching `Expr`/
//! `Stmt` by hand instead of through a visitor trait — the node set is
//! fixed and lives in one crate this interpreter already depends on, so
//! double dispatch buys nothing. `return` unwinds through the same
//! `Result` plumbing as runtime faults (`Unwind::Return` vs
//! `Unwind::Error`) so every statement-execution site can keep using `?`
//! without a separate control-flow channel threaded through every call.

use std::io::{self, Write};
use std::rc::Rc;

use plox_ast::{ClassDecl, Expr, LiteralValue, Stmt};
use plox_lexer::{Token, TokenKind};
use plox_resolver::ResolvedLocals;

use crate::environment::Environment;
use crate::value::{LoxClass, LoxFunction, LoxInstance, NativeFunction, Value};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

/// Threads both runtime faults and `return`'s non-local exit through the
/// same `?`-friendly channel.
#[derive(Debug)]
pub enum Unwind {
    Error(RuntimeError),
    Return(Value),
}

impl Unwind {
    pub fn runtime_error(token: Token, message: impl Into<String>) -> Self {
        Unwind::Error(RuntimeError {
            token,
            message: message.into(),
        })
    }
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Error(err)
    }
}

pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    locals: ResolvedLocals,
    out: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(locals: ResolvedLocals) -> Self {
        Self::with_output(locals, Box::new(io::stdout()))
    }

    /// Same as `new`, but `print` writes to `out` instead of real stdout
    /// — used by tests that need to assert on program output rather than
    /// just on whether it ran without a runtime error.
    pub fn with_output(locals: ResolvedLocals, out: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        globals.define(
            "clock",
            Value::Callable(Rc::new(NativeFunction {
                name: "clock",
                arity: 0,
                func: native_clock,
            })),
        );

        Interpreter {
            environment: globals.clone(),
            globals,
            locals,
            out,
        }
    }

    /// Folds in another pass's resolved depths, so a long-lived
    /// interpreter (a REPL session) can keep resolving and running one
    /// input at a time while closures captured on earlier lines stay
    /// callable on later ones.
    pub fn extend_locals(&mut self, locals: ResolvedLocals) {
        self.locals.merge(locals);
    }

    /// Runs a program's statements top to bottom, stopping at (and
    /// returning) the first runtime error. The caller is responsible for
    /// reporting it — this layer has no I/O.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            if let Err(unwind) = self.execute(stmt) {
                return Err(match unwind {
                    Unwind::Error(err) => err,
                    Unwind::Return(_) => {
                        unreachable!("resolver rejects top-level return before this runs")
                    }
                });
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let _ = writeln!(self.out, "{value}");
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(&name.lexeme, value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let block_env = Environment::new_enclosed(&self.environment);
                self.execute_block(statements, block_env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(branch) = else_branch {
                    self.execute(branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }
                Ok(())
            }
            Stmt::Function(decl) => {
                let function = LoxFunction::new(Rc::clone(decl), self.environment.clone(), false);
                self.environment
                    .define(&decl.name.lexeme, Value::Callable(Rc::new(function)));
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Class(decl) => self.execute_class(decl),
        }
    }

    /// Runs `statements` in `env`, restoring the caller's environment
    /// afterward even when an error or `return` unwinds out early.
    pub fn execute_block(&mut self, statements: &[Stmt], env: Environment) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = (|| {
            for stmt in statements {
                self.execute(stmt)?;
            }
            Ok(())
        })();
        self.environment = previous;
        result
    }

    fn execute_class(&mut self, decl: &ClassDecl) -> Result<(), Unwind> {
        let superclass = match &decl.superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let name_token = super_name_token(expr);
                        return Err(Unwind::runtime_error(
                            name_token,
                            "Superclass must be a class.",
                        ));
                    }
                }
            }
            None => None,
        };

        self.environment.define(&decl.name.lexeme, Value::Nil);

        let method_env = if let Some(superclass) = &superclass {
            let env = Environment::new_enclosed(&self.environment);
            env.define("super", Value::Class(Rc::clone(superclass)));
            env
        } else {
            self.environment.clone()
        };

        let mut methods = std::collections::HashMap::new();
        for method in &decl.methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(Rc::clone(method), method_env.clone(), is_initializer);
            methods.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Rc::new(LoxClass {
            name: decl.name.lexeme.clone(),
            superclass,
            methods,
        });

        self.environment.assign(&decl.name, Value::Class(class))?;
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),
            Expr::Grouping { inner, .. } => self.evaluate(inner),
            Expr::Unary { op, right, .. } => self.evaluate_unary(op, right),
            Expr::Binary { left, op, right, .. } => self.evaluate_binary(left, op, right),
            Expr::Logical { left, op, right, .. } => self.evaluate_logical(left, op, right),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.depth(*id) {
                    Some(depth) => self.environment.assign_at(depth, name, value.clone()),
                    None => self.globals.assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                closing_paren,
                args,
                ..
            } => self.evaluate_call(callee, closing_paren, args),
            Expr::Get { object, name, .. } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => LoxInstance::get(&instance, name),
                    _ => Err(Unwind::runtime_error(
                        name.clone(),
                        "Only instances have properties.",
                    )),
                }
            }
            Expr::Set { object, name, value, .. } => {
                let object = self.evaluate(object)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;
                        LoxInstance::set(&instance, name, value.clone());
                        Ok(value)
                    }
                    _ => Err(Unwind::runtime_error(
                        name.clone(),
                        "Only instances have fields.",
                    )),
                }
            }
            Expr::This { id, keyword } => self.lookup_variable(*id, keyword),
            Expr::Super { id, keyword, method } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn lookup_variable(&self, id: u64, name: &Token) -> Result<Value, Unwind> {
        match self.locals.depth(id) {
            Some(depth) => Ok(self
                .environment
                .get_at(depth, &name.lexeme)
                .expect("resolver-computed depth must be present in the environment chain")),
            None => self.globals.get(name),
        }
    }

    fn evaluate_super(&mut self, id: u64, keyword: &Token, method: &Token) -> Result<Value, Unwind> {
        let depth = self
            .locals
            .depth(id)
            .expect("resolver always resolves 'super'");
        let superclass = match self.environment.get_at(depth, "super") {
            Some(Value::Class(class)) => class,
            _ => unreachable!("resolver only binds 'super' to a class scope"),
        };
        let instance = match self.environment.get_at(depth - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => unreachable!("'this' sits one scope closer than 'super'"),
        };

        match superclass.find_method(&method.lexeme) {
            Some(m) => Ok(Value::Callable(Rc::new(m.bind(instance)))),
            None => Err(Unwind::runtime_error(
                keyword.clone(),
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        closing_paren: &Token,
        arg_exprs: &[Expr],
    ) -> Result<Value, Unwind> {
        let callee = self.evaluate(callee)?;

        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            args.push(self.evaluate(arg)?);
        }

        match callee {
            Value::Callable(callable) => {
                check_arity(closing_paren, callable.arity(), args.len())?;
                callable.call(self, args)
            }
            Value::Class(class) => {
                check_arity(closing_paren, class.arity(), args.len())?;
                class.instantiate(self, args)
            }
            _ => Err(Unwind::runtime_error(
                closing_paren.clone(),
                "Can only call functions and classes.",
            )),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, Unwind> {
        let left = self.evaluate(left)?;
        match op.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::And if !left.is_truthy() => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> Result<Value, Unwind> {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(Unwind::runtime_error(op.clone(), "Operand must be a number.")),
            },
            TokenKind::Bang => Ok(Value::Boolean(!right.is_truthy())),
            _ => unreachable!("parser only builds Unary with '-' or '!'"),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, Unwind> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match op.kind {
            TokenKind::Minus => numeric_op(op, left, right, |a, b| a - b),
            TokenKind::Slash => numeric_op(op, left, right, |a, b| a / b),
            TokenKind::Star => numeric_op(op, left, right, |a, b| a * b),
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    Ok(Value::String(Rc::from(format!("{a}{b}"))))
                }
                _ => Err(Unwind::runtime_error(
                    op.clone(),
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenKind::Greater => numeric_cmp(op, left, right, |a, b| a > b),
            TokenKind::GreaterEqual => numeric_cmp(op, left, right, |a, b| a >= b),
            TokenKind::Less => numeric_cmp(op, left, right, |a, b| a < b),
            TokenKind::LessEqual => numeric_cmp(op, left, right, |a, b| a <= b),
            TokenKind::EqualEqual => Ok(Value::Boolean(left == right)),
            TokenKind::BangEqual => Ok(Value::Boolean(left != right)),
            _ => unreachable!("parser only builds Binary with arithmetic/comparison operators"),
        }
    }

}

fn super_name_token(expr: &Expr) -> Token {
    match expr {
        Expr::Variable { name, .. } => name.clone(),
        _ => unreachable!("parser only builds a superclass expression from an identifier"),
    }
}

fn check_arity(closing_paren: &Token, expected: usize, got: usize) -> Result<(), Unwind> {
    if expected != got {
        Err(Unwind::runtime_error(
            closing_paren.clone(),
            format!("Expected {expected} arguments but got {got}."),
        ))
    } else {
        Ok(())
    }
}

fn numeric_op(
    op: &Token,
    left: Value,
    right: Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, Unwind> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(a, b))),
        _ => Err(Unwind::runtime_error(op.clone(), "Operands must be numbers.")),
    }
}

fn numeric_cmp(
    op: &Token,
    left: Value,
    right: Value,
    f: impl Fn(f64, f64) -> bool,
) -> Result<Value, Unwind> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(f(a, b))),
        _ => Err(Unwind::runtime_error(op.clone(), "Operands must be numbers.")),
    }
}

fn literal_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::String(Rc::from(&**s)),
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Nil => Value::Nil,
    }
}

fn native_clock(_args: &[Value]) -> Value {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plox_lexer::{RecordingSink, Scanner};
    use plox_parser::Parser;
    use plox_resolver::resolve;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<(), String> {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let stmts = Parser::new(tokens, &mut sink).parse();
        let locals = resolve(&stmts, &mut sink);
        assert!(sink.messages.is_empty(), "static errors: {:?}", sink.messages);
        Interpreter::new(locals)
            .interpret(&stmts)
            .map_err(|e| e.message)
    }

    #[test]
    fn arithmetic_respects_precedence() {
        assert!(run("if (1 + 2 * 3 != 7) { \"unreachable\" + 1; }").is_ok());
    }

    #[test]
    fn print_writes_formatted_value_to_the_configured_sink() {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new("print 1 + 2;\nprint \"hi\";").scan_tokens(&mut sink);
        let stmts = Parser::new(tokens, &mut sink).parse();
        let locals = resolve(&stmts, &mut sink);
        assert!(sink.messages.is_empty());

        let buffer = crate::output::SharedBuffer::new();
        Interpreter::with_output(locals, Box::new(buffer.clone()))
            .interpret(&stmts)
            .unwrap();

        assert_eq!(buffer.contents(), "3\nhi\n");
    }

    #[test]
    fn closures_retain_their_defining_environment() {
        let result = run(
            "fun makeCounter() {\n\
               var i = 0;\n\
               fun count() { i = i + 1; return i; }\n\
               return count;\n\
             }\n\
             var counter = makeCounter();\n\
             if (counter() != 1) { \"x\" + 1; }\n\
             if (counter() != 2) { \"x\" + 1; }\n",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let err = run("var a = 1; a();").unwrap_err();
        assert_eq!(err, "Can only call functions and classes.");
    }

    #[test]
    fn inheritance_dispatches_to_overridden_method_via_super() {
        let result = run(
            "class A { greet() { return \"A\"; } }\n\
             class B < A { greet() { return super.greet(); } }\n\
             if (B().greet() != \"A\") { \"x\" + 1; }\n",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn initializer_return_value_is_always_the_instance() {
        let result = run(
            "class A { init() { this.x = 1; } }\n\
             var a = A();\n\
             if (a.x != 1) { \"x\" + 1; }\n",
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        let err = run("class A {} var a = A(); a.missing;").unwrap_err();
        assert_eq!(err, "Undefined property 'missing'.");
    }
}
