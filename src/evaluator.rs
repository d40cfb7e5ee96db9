use crate::ast::{Expr, Stmt};
use crate::callable::{builtins, Callable, LoxFunction};
use crate::environment::{EnvRef, Environment};
use crate::error::{ExecError, Reporter, RuntimeError, StackOverflow};
use crate::lexer::{Token, TokenType};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::io::{self, Write};
use std::rc::Rc;

/// Deepest chain of active Lox calls before the run is aborted.
pub const MAX_CALL_DEPTH: usize = 4096;

/// How a statement finished. `Return` unwinds to the nearest call.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Evaluator {
    globals: EnvRef,
    environment: EnvRef,
    out: Box<dyn Write>,
    depth: usize,
}

impl Evaluator {
    /// An evaluator printing to stdout.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    pub fn with_output(out: impl Write + 'static) -> Self {
        let globals = Environment::new();
        for native in builtins() {
            let name = native.name();
            globals
                .borrow_mut()
                .define(name, Value::Callable(Rc::new(native)));
        }

        Self {
            environment: globals.clone(),
            globals,
            out: Box::new(out),
            depth: 0,
        }
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    /// Runs a program. Runtime errors go to `reporter` and stop the run;
    /// a stack overflow is handed back to the caller.
    pub fn interpret(
        &mut self,
        statements: &[Stmt],
        reporter: &mut dyn Reporter,
    ) -> Result<(), StackOverflow> {
        tracing::debug!(count = statements.len(), "interpreting");

        for statement in statements {
            match self.execute(statement) {
                Ok(_) => {}
                Err(ExecError::Runtime(error)) => {
                    tracing::debug!(line = error.token.line, %error, "runtime error");
                    reporter.runtime_error(&error);
                    break;
                }
                Err(ExecError::StackOverflow(overflow)) => {
                    tracing::warn!(line = overflow.token.line, "stack overflow");
                    self.flush();
                    return Err(overflow);
                }
            }
        }

        self.flush();
        Ok(())
    }

    /// Writes the parsed program to the output, one statement per line.
    pub fn write_program(&mut self, statements: &[Stmt]) -> io::Result<()> {
        for statement in statements {
            writeln!(self.out, "{}", statement)?;
        }
        self.out.flush()
    }

    fn flush(&mut self) {
        if let Err(error) = self.out.flush() {
            tracing::warn!(%error, "failed to flush program output");
        }
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow, ExecError> {
        ensure_sufficient_stack(|| self.execute_inner(stmt))
    }

    fn execute_inner(&mut self, stmt: &Stmt) -> Result<Flow, ExecError> {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { keyword, expr } => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value).map_err(|error| {
                    RuntimeError::new(keyword, format!("Failed to write output: {}.", error))
                })?;
                Ok(Flow::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.as_str(), value);
                Ok(Flow::Normal)
            }
            Stmt::Block { statements } => {
                let scope = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Function(declaration) => {
                let function = LoxFunction::new(declaration.clone(), self.environment.clone());
                self.environment.borrow_mut().define(
                    declaration.name.lexeme.as_str(),
                    Value::Callable(Rc::new(function)),
                );
                Ok(Flow::Normal)
            }
            Stmt::Return { keyword, value } => {
                if self.depth == 0 {
                    return Err(
                        RuntimeError::new(keyword, "Can't return from top-level code.").into(),
                    );
                }

                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
        }
    }

    /// Runs `statements` inside `environment`, restoring the current scope
    /// on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<Flow, ExecError> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow, ExecError> {
        for statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, ExecError> {
        ensure_sufficient_stack(|| self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Result<Value, ExecError> {
        match expr {
            Expr::Literal { value } => Ok(Value::from(value)),
            Expr::Grouping { expr } => self.evaluate(expr),
            Expr::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                Ok(self.evaluate_unary_op(operator, right)?)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(self.evaluate_binary_op(operator, left, right)?)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let decided = match operator.token_type {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Variable { name } => Ok(self.environment.borrow().get(name)?),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.borrow_mut().assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                let function = match callee {
                    Value::Callable(function) => function,
                    _ => {
                        return Err(RuntimeError::new(
                            paren,
                            "Can only call functions and classes.",
                        )
                        .into())
                    }
                };

                if values.len() != function.arity() {
                    return Err(RuntimeError::new(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            values.len()
                        ),
                    )
                    .into());
                }

                self.call_function(function, values, paren)
            }
        }
    }

    fn call_function(
        &mut self,
        function: Rc<dyn Callable>,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, ExecError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(StackOverflow {
                token: paren.clone(),
                limit: MAX_CALL_DEPTH,
            }
            .into());
        }

        tracing::trace!(callee = %function, depth = self.depth, "call");

        self.depth += 1;
        let result = ensure_sufficient_stack(|| function.call(self, arguments));
        self.depth -= 1;
        result
    }

    fn evaluate_unary_op(&self, operator: &Token, operand: Value) -> Result<Value, RuntimeError> {
        match operator.token_type {
            TokenType::Minus => match operand {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(operator, "Operand must be a number.")),
            },
            TokenType::Bang => Ok(Value::Bool(!operand.is_truthy())),
            _ => unreachable!("parser only builds '-' and '!' unary expressions"),
        }
    }

    fn evaluate_binary_op(
        &self,
        operator: &Token,
        left: Value,
        right: Value,
    ) -> Result<Value, RuntimeError> {
        match operator.token_type {
            TokenType::Plus => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => {
                    Ok(Value::from(format!("{}{}", l, r)))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            },
            TokenType::Minus => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(l - r))
            }
            TokenType::Star => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(l * r))
            }
            // IEEE division: 1 / 0 is Infinity
            TokenType::Slash => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(l / r))
            }
            TokenType::Greater => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l > r))
            }
            TokenType::GreaterEqual => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l >= r))
            }
            TokenType::Less => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l < r))
            }
            TokenType::LessEqual => {
                let (l, r) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(l <= r))
            }
            TokenType::EqualEqual => Ok(Value::Bool(left == right)),
            TokenType::BangEqual => Ok(Value::Bool(left != right)),
            _ => unreachable!("parser only builds binary expressions from binary operators"),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn number_operands(
    operator: &Token,
    left: &Value,
    right: &Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok((*l, *r)),
        _ => Err(RuntimeError::new(operator, "Operands must be numbers.")),
    }
}
