use crate::ast::FunctionDecl;
use crate::environment::{EnvRef, Environment};
use crate::error::ExecError;
use crate::evaluator::{Evaluator, Flow};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Anything a call expression can invoke. Arity is checked by the caller
/// before `call` runs.
pub trait Callable: fmt::Debug + fmt::Display {
    fn arity(&self) -> usize;

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, ExecError>;
}

/// A user-defined function together with the scope it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(&self, evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, ExecError> {
        let environment = Environment::with_enclosing(self.closure.clone());
        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                scope.define(param.lexeme.as_str(), argument);
            }
        }

        match evaluator.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

// The closure may hold this very function; never print it.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A function provided by the host.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    function: fn(&[Value]) -> Value,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, function: fn(&[Value]) -> Value) -> Self {
        Self {
            name,
            arity,
            function,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, _evaluator: &mut Evaluator, arguments: Vec<Value>) -> Result<Value, ExecError> {
        Ok((self.function)(&arguments))
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

/// Seconds since the Unix epoch, fractional.
fn clock(_arguments: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    Value::Number(seconds)
}

/// Natives registered in every fresh global scope.
pub fn builtins() -> Vec<NativeFunction> {
    vec![NativeFunction::new("clock", 0, clock)]
}
