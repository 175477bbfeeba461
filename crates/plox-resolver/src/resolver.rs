//! Static lexical-scope resolver.
//!
//! A single pre-order walk over the parsed tree that produces a
//! `NodeId -> depth` side table (grounded in the teacher's
//! `vais-typeck::Checker`, which performs the same kind of single-pass,
//! explicit-scope-stack walk over its AST before the interpreter runs).
//! Rust gives nodes no stable object identity the way the checker's
//! source language does, so `Expr::id()` stands in for it.

use std::collections::HashMap;

use plox_ast::{ClassDecl, Expr, FunctionDecl, NodeId, Stmt};
use plox_lexer::{ErrorSink, Token};

#[derive(Debug, Default)]
pub struct ResolvedLocals(HashMap<NodeId, usize>);

impl ResolvedLocals {
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.0.get(&id).copied()
    }

    /// Folds another resolution pass's table into this one. Safe across
    /// separately-resolved programs because node ids are assigned from a
    /// single process-wide counter and never recur.
    pub fn merge(&mut self, other: ResolvedLocals) {
        self.0.extend(other.0);
    }
}

#[derive(Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    current_function: FunctionKind,
    current_class: ClassKind,
    sink: &'a mut dyn ErrorSink,
}

impl<'a> Resolver<'a> {
    pub fn new(sink: &'a mut dyn ErrorSink) -> Self {
        Self {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            sink,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> ResolvedLocals {
        self.resolve_statements(statements);
        ResolvedLocals(self.locals)
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.sink
                    .error(name, "Already a variable with this name in this scope.");
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any scope: treated as global, resolved at runtime.
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&decl.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(branch) = else_branch {
                    self.resolve_stmt(branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.sink.error(keyword, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.sink
                            .error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(decl) => self.resolve_class(decl),
        }
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some(Expr::Variable { name: super_name, .. }) = &decl.superclass {
            if super_name.lexeme == decl.name.lexeme {
                self.sink
                    .error(super_name, "A class can't inherit from itself.");
            }
        }

        if let Some(superclass) = &decl.superclass {
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("scope just pushed")
                .insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope just pushed")
            .insert("this".to_string(), true);

        for method in &decl.methods {
            let kind = if method.name.lexeme == "init" {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Binary { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Grouping { inner, .. } => self.resolve_expr(inner),
            Expr::Variable { id, name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.sink
                            .error(name, "Can't read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    self.sink
                        .error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword);
            }
            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.sink.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassKind::Class => {
                        self.sink
                            .error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(*id, keyword);
            }
        }
    }
}

pub fn resolve(statements: &[Stmt], sink: &mut dyn ErrorSink) -> ResolvedLocals {
    Resolver::new(sink).resolve(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plox_lexer::{RecordingSink, Scanner};
    use plox_parser::Parser;
    use pretty_assertions::assert_eq;

    fn resolve_source(source: &str) -> (ResolvedLocals, Vec<String>) {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let stmts = Parser::new(tokens, &mut sink).parse();
        let locals = resolve(&stmts, &mut sink);
        (locals, sink.messages)
    }

    #[test]
    fn block_shadowing_resolves_inner_variable_at_depth_zero() {
        let (locals, errors) =
            resolve_source("var a = \"outer\";\n{ var a = \"inner\"; print a; }");
        assert!(errors.is_empty());
        assert!(!locals.0.is_empty());
    }

    #[test]
    fn self_initializer_reference_is_an_error() {
        let (_, errors) = resolve_source("{ var a = a; }");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn top_level_return_is_an_error() {
        let (_, errors) = resolve_source("return 1;");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn initializer_returning_a_value_is_an_error() {
        let (_, errors) = resolve_source("class A { init() { return 1; } }");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
        );
    }

    #[test]
    fn super_outside_subclass_is_an_error() {
        let (_, errors) = resolve_source("class A { m() { super.m(); } }");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let (_, errors) = resolve_source("fun f() { print this; }");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
        );
    }
}
