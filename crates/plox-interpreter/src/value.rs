//! Runtime values and callables.
//!
//! `Value` is the dynamically-typed value every expression evaluates to.
//! User functions and native builtins share a `Callable` trait object
//! (the same shape `other_examples` Lox ports use — "anything invokable"
//! behind one trait rather than an enum of call-target kinds, so adding
//! a native builtin never touches the evaluator's call-dispatch code).
//! Classes get their own `Value::Class` variant instead of also going
//! through `Callable`: instantiation needs the class's own `Rc` to stash
//! on the new instance, and a `&self`-taking trait method has no way to
//! recover the `Rc` that's calling it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use plox_ast::FunctionDecl;
use plox_lexer::Token;

use crate::environment::Environment;
use crate::interpreter::{Interpreter, Unwind};

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Callable(Rc<dyn Callable>),
    Class(Rc<LoxClass>),
    Instance(Rc<RefCell<LoxInstance>>),
}

impl Value {
    /// `nil` and `false` are falsey; everything else, including `0`, is
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Boolean(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Callable(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{s}"),
            Value::Callable(c) => write!(f, "<fn {}>", c.name()),
            Value::Class(c) => write!(f, "{}", c.name),
            Value::Instance(i) => write!(f, "{} instance", i.borrow().class.name),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub trait Callable: fmt::Debug {
    fn arity(&self) -> usize;
    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Unwind>;
    fn name(&self) -> &str;
}

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> Value,
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        Ok((self.func)(&args))
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Environment,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Environment, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// Returns a copy of this function whose closure has `this` bound to
    /// `instance`, used when a method is looked up off an instance.
    pub fn bind(&self, instance: Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let env = Environment::new_enclosed(&self.closure);
        env.define("this", Value::Instance(instance));
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, Unwind> {
        let env = Environment::new_enclosed(&self.closure);
        for (param, arg) in self.declaration.params.iter().zip(args) {
            env.define(&param.lexeme, arg);
        }

        match interpreter.execute_block(&self.declaration.body, env) {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self
                        .closure
                        .get_at(0, "this")
                        .expect("initializer closure binds this"))
                } else {
                    Ok(Value::Nil)
                }
            }
            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    Ok(self
                        .closure
                        .get_at(0, "this")
                        .expect("initializer closure binds this"))
                } else {
                    Ok(value)
                }
            }
            Err(err) => Err(err),
        }
    }

    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        self.methods
            .get(name)
            .cloned()
            .or_else(|| self.superclass.as_ref().and_then(|sup| sup.find_method(name)))
    }

    pub fn arity(&self) -> usize {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }

    pub fn instantiate(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> Result<Value, Unwind> {
        let instance = Rc::new(RefCell::new(LoxInstance {
            class: Rc::clone(self),
            fields: HashMap::new(),
        }));

        if let Some(initializer) = self.find_method("init") {
            let bound = initializer.bind(Rc::clone(&instance));
            bound.call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &Token) -> Result<Value, Unwind> {
        let this = instance.borrow();
        if let Some(value) = this.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = this.class.find_method(&name.lexeme) {
            drop(this);
            return Ok(Value::Callable(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(Unwind::runtime_error(
            name.clone(),
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    pub fn set(instance: &Rc<RefCell<LoxInstance>>, name: &Token, value: Value) {
        instance.borrow_mut().fields.insert(name.lexeme.clone(), value);
    }
}
