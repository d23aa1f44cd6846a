//! Nested variable bindings.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ctx::Symbol;
use crate::diag::Position;
use crate::eval::RuntimeError;
use crate::value::Value;

/// One scope of bindings plus a link to the enclosing scope.
///
/// Environments are reference-counted and share suffixes: a closure keeps
/// its capture chain alive for as long as the closure lives, even after the
/// block that created those scopes has finished.
#[derive(Debug)]
pub struct Env {
    enclosing: Option<Rc<Env>>,
    values: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    pub fn new() -> Rc<Env> {
        Rc::new(Env {
            enclosing: None,
            values: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_enclosing(enclosing: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            enclosing: Some(enclosing),
            values: RefCell::new(HashMap::new()),
        })
    }

    /// Binds `name` in this scope, replacing any previous binding.
    /// Redefinition in an inner scope is a resolver error, so by the time
    /// execution gets here replacing is the intended behavior.
    pub fn define(&self, name: &Symbol, value: Value) {
        self.values.borrow_mut().insert(name.clone(), value);
    }

    /// Looks `name` up in this scope or any enclosing one.
    pub fn get(&self, pos: Position, name: &Symbol) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.get(pos, name),
            None => Err(RuntimeError::undefined_variable(pos, name)),
        }
    }

    /// Overwrites the nearest existing binding of `name`.  Unlike `define`
    /// this never creates a binding.
    pub fn assign(&self, pos: Position, name: &Symbol, value: Value) -> Result<(), RuntimeError> {
        if let Entry::Occupied(mut entry) = self.values.borrow_mut().entry(name.clone()) {
            entry.insert(value);
            return Ok(());
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.assign(pos, name, value),
            None => Err(RuntimeError::undefined_variable(pos, name)),
        }
    }

    /// Reads `name` from the scope exactly `depth` hops up the chain.  The
    /// resolver guarantees both the scope and the binding exist.
    pub fn get_at(self: &Rc<Env>, depth: usize, name: &Symbol) -> Value {
        self.ancestor(depth)
            .values
            .borrow()
            .get(name)
            .expect("resolved binding missing from its scope")
            .clone()
    }

    /// Writes `name` in the scope exactly `depth` hops up the chain.
    pub fn assign_at(self: &Rc<Env>, depth: usize, name: &Symbol, value: Value) {
        self.ancestor(depth)
            .values
            .borrow_mut()
            .insert(name.clone(), value);
    }

    fn ancestor(self: &Rc<Env>, depth: usize) -> Rc<Env> {
        let mut env = Rc::clone(self);
        for _ in 0..depth {
            let enclosing = env
                .enclosing
                .clone()
                .expect("scope chain shorter than resolved depth");
            env = enclosing;
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;
    use crate::eval::RuntimeErrorKind;

    #[test]
    fn define_and_get() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let env = Env::new();
        env.define(&foo, Value::Number(42.0));
        assert_eq!(env.get(1, &foo).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn redefinition_replaces() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let env = Env::new();
        env.define(&foo, Value::Number(1.0));
        env.define(&foo, Value::Bool(true));
        assert_eq!(env.get(1, &foo).unwrap(), Value::Bool(true));
    }

    #[test]
    fn get_walks_the_chain() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let outer = Env::new();
        outer.define(&foo, Value::Number(42.0));
        let inner = Env::with_enclosing(outer);
        assert_eq!(inner.get(1, &foo).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn get_of_unknown_name_fails() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let env = Env::new();
        match env.get(3, &foo) {
            Err(RuntimeError {
                pos: 3,
                kind: RuntimeErrorKind::UndefinedVariable(name),
            }) => assert_eq!(name, "foo"),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn assign_overwrites_the_nearest_binding() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let outer = Env::new();
        outer.define(&foo, Value::Number(1.0));
        let inner = Env::with_enclosing(outer.clone());
        inner.assign(1, &foo, Value::Number(2.0)).unwrap();
        assert_eq!(outer.get(1, &foo).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let env = Env::new();
        match env.assign(2, &foo, Value::Nil) {
            Err(RuntimeError {
                pos: 2,
                kind: RuntimeErrorKind::UndefinedVariable(_),
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn shadowing_hides_the_outer_binding() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let outer = Env::new();
        outer.define(&foo, Value::Number(1.0));
        let inner = Env::with_enclosing(outer);
        inner.define(&foo, Value::Number(2.0));
        assert_eq!(inner.get(1, &foo).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn get_at_skips_shadowing_scopes() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let outer = Env::new();
        outer.define(&foo, Value::Number(1.0));
        let inner = Env::with_enclosing(outer);
        inner.define(&foo, Value::Number(2.0));
        assert_eq!(inner.get_at(0, &foo), Value::Number(2.0));
        assert_eq!(inner.get_at(1, &foo), Value::Number(1.0));
    }

    #[test]
    fn assign_at_targets_the_requested_scope() {
        let ctx = Context::new();
        let foo = ctx.symbol("foo");
        let outer = Env::new();
        outer.define(&foo, Value::Number(1.0));
        let inner = Env::with_enclosing(outer.clone());
        inner.define(&foo, Value::Number(2.0));
        inner.assign_at(1, &foo, Value::Number(3.0));
        assert_eq!(outer.get(1, &foo).unwrap(), Value::Number(3.0));
        assert_eq!(inner.get_at(0, &foo), Value::Number(2.0));
    }
}
