use crate::error::RuntimeError;
use crate::lexer::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope. Closures hold one to keep their defining
/// scope alive after the block that created it has exited.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Binds `name` in this scope, replacing any earlier binding here.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(undefined(name)),
        }
    }

    /// Rebinds the nearest existing `name`. Never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Span;
    use crate::lexer::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::Identifier, name, None, 1, Span::default())
    }

    #[test]
    fn get_walks_outward_to_nearest_binding() {
        let globals = Environment::new();
        globals.borrow_mut().define("a", Value::Number(1.0));
        globals.borrow_mut().define("b", Value::Number(2.0));

        let inner = Environment::with_enclosing(globals.clone());
        inner.borrow_mut().define("a", Value::Number(10.0));

        let a = inner.borrow().get(&ident("a")).unwrap();
        let b = inner.borrow().get(&ident("b")).unwrap();
        assert_eq!(a, Value::Number(10.0));
        assert_eq!(b, Value::Number(2.0));
        assert_eq!(globals.borrow().get(&ident("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_mutates_the_defining_scope() {
        let globals = Environment::new();
        globals.borrow_mut().define("count", Value::Number(0.0));
        let inner = Environment::with_enclosing(globals.clone());

        inner
            .borrow_mut()
            .assign(&ident("count"), Value::Number(5.0))
            .unwrap();

        assert_eq!(
            globals.borrow().get(&ident("count")).unwrap(),
            Value::Number(5.0)
        );
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let globals = Environment::new();
        let error = globals
            .borrow_mut()
            .assign(&ident("ghost"), Value::Nil)
            .unwrap_err();

        assert_eq!(error.message, "Undefined variable 'ghost'.");
        assert!(globals.borrow().get(&ident("ghost")).is_err());
    }

    #[test]
    fn define_rebinds_in_same_scope() {
        let env = Environment::new();
        env.borrow_mut().define("x", Value::Bool(true));
        env.borrow_mut().define("x", Value::Nil);

        assert_eq!(env.borrow().get(&ident("x")).unwrap(), Value::Nil);
    }
}
