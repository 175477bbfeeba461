//! Lexically-nested variable scopes.
//!
//! Each `Environment` is a shared, mutable scope frame (`Rc<RefCell<_>>`)
//! chained to its enclosing scope — the representation closures need to
//! capture "the same mutable scope the defining code saw" rather than a
//! snapshot of it. No cycle collector: environments form a tree toward
//! `enclosing`, and the only back-reference a closure holds is down that
//! same tree, so ordinary `Rc` drop order reclaims everything once the
//! program that built the closures exits.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use plox_lexer::Token;

use crate::interpreter::Unwind;
use crate::value::Value;

struct Inner {
    values: HashMap<String, Value>,
    enclosing: Option<Environment>,
}

#[derive(Clone)]
pub struct Environment(Rc<RefCell<Inner>>);

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("keys", &self.0.borrow().values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Inner {
            values: HashMap::new(),
            enclosing: None,
        })))
    }

    pub fn new_enclosed(enclosing: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Inner {
            values: HashMap::new(),
            enclosing: Some(enclosing.clone()),
        })))
    }

    pub fn define(&self, name: &str, value: Value) {
        self.0.borrow_mut().values.insert(name.to_string(), value);
    }

    /// Global (unresolved) lookup, walking the whole chain. Used only
    /// for names the resolver left unbound — i.e. globals.
    pub fn get(&self, name: &Token) -> Result<Value, Unwind> {
        let inner = self.0.borrow();
        if let Some(value) = inner.values.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(enclosing) = &inner.enclosing {
            return enclosing.get(name);
        }
        Err(Unwind::runtime_error(
            name.clone(),
            format!("Undefined variable '{}'.", name.lexeme),
        ))
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), Unwind> {
        let mut inner = self.0.borrow_mut();
        if inner.values.contains_key(&name.lexeme) {
            inner.values.insert(name.lexeme.clone(), value);
            return Ok(());
        }
        match &inner.enclosing {
            Some(enclosing) => {
                let enclosing = enclosing.clone();
                drop(inner);
                enclosing.assign(name, value)
            }
            None => Err(Unwind::runtime_error(
                name.clone(),
                format!("Undefined variable '{}'.", name.lexeme),
            )),
        }
    }

    fn ancestor(&self, depth: usize) -> Environment {
        let mut env = self.clone();
        for _ in 0..depth {
            let next = env
                .0
                .borrow()
                .enclosing
                .clone()
                .expect("resolver-computed depth must stay within the environment chain");
            env = next;
        }
        env
    }

    pub fn get_at(&self, depth: usize, name: &str) -> Option<Value> {
        self.ancestor(depth).0.borrow().values.get(name).cloned()
    }

    pub fn assign_at(&self, depth: usize, name: &Token, value: Value) {
        self.ancestor(depth)
            .0
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), value);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plox_lexer::TokenKind;
    use pretty_assertions::assert_eq;

    fn ident(name: &str) -> Token {
        Token::new(TokenKind::Identifier, name, 1)
    }

    #[test]
    fn assign_walks_up_to_the_defining_scope() {
        let global = Environment::new();
        global.define("a", Value::Number(1.0));
        let local = Environment::new_enclosed(&global);

        local.assign(&ident("a"), Value::Number(2.0)).unwrap();

        assert_eq!(global.get(&ident("a")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn shadowing_in_a_child_scope_does_not_touch_the_parent() {
        let global = Environment::new();
        global.define("a", Value::Number(1.0));
        let local = Environment::new_enclosed(&global);
        local.define("a", Value::Number(2.0));

        assert_eq!(local.get(&ident("a")).unwrap(), Value::Number(2.0));
        assert_eq!(global.get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn get_at_zero_reads_the_immediate_scope() {
        let env = Environment::new();
        env.define("a", Value::Number(5.0));
        assert_eq!(env.get_at(0, "a"), Some(Value::Number(5.0)));
    }
}
