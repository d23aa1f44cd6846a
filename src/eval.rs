use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{BinOp, Expr, ExprId, LogicalOp, Stmt, UnaryOp};
use crate::ctx::{Context, Symbol};
use crate::diag::Position;
use crate::env::Env;
use crate::value::{Class, Function, FunctionBody, Instance, Value};

/// An evaluation failure, tagged with the line it arose on.
#[derive(Debug)]
pub struct RuntimeError {
    pub pos: Position,
    pub kind: RuntimeErrorKind,
}

#[derive(Debug)]
pub enum RuntimeErrorKind {
    OperandMustBeNumber,
    OperandsMustBeNumbers,
    OperandsMustBeNumbersOrStrings,
    UndefinedVariable(String),
    NotCallable,
    WrongArity { expected: usize, got: usize },
    Io(io::Error),
}

impl RuntimeError {
    pub(crate) fn undefined_variable(pos: Position, name: &Symbol) -> RuntimeError {
        RuntimeError {
            pos,
            kind: RuntimeErrorKind::UndefinedVariable(name.name().to_owned()),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuntimeErrorKind::OperandMustBeNumber => write!(f, "Operand must be a number."),
            RuntimeErrorKind::OperandsMustBeNumbers => write!(f, "Operands must be numbers."),
            RuntimeErrorKind::OperandsMustBeNumbersOrStrings => {
                write!(f, "Operands must be two numbers or two strings.")
            }
            RuntimeErrorKind::UndefinedVariable(name) => {
                write!(f, "Undefined variable '{}'.", name)
            }
            RuntimeErrorKind::NotCallable => write!(f, "Can only call functions and classes."),
            RuntimeErrorKind::WrongArity { expected, got } => {
                write!(f, "Expected {} arguments but got {}.", expected, got)
            }
            RuntimeErrorKind::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            RuntimeErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// The two non-local exits of evaluation.  An error unwinds the whole run;
/// a `return` unwinds to the nearest user-function call frame, which must
/// catch it.  Carrying both in every `Result` lets `?` pop any number of
/// intervening block scopes on the way out.
#[derive(Debug)]
enum Signal {
    Return(Value),
    Error(RuntimeError),
}

impl From<RuntimeError> for Signal {
    fn from(e: RuntimeError) -> Signal {
        Signal::Error(e)
    }
}

#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,

    // Side-table produced by the resolver: expression identity to scope
    // depth.  Accumulates across runs because function values keep earlier
    // parses alive.
    locals: HashMap<ExprId, usize>,

    sym_this: Symbol,
    sym_init: Symbol,
}

impl<'t, W: Write> Evaluator<'t, W> {
    pub fn new(output: &'t mut W, ctx: &Context) -> Evaluator<'t, W> {
        let globals = Env::new();
        let clock = ctx.symbol("clock");
        globals.define(
            &clock,
            Value::Function(Rc::new(Function::native(clock.clone(), 0, builtin_clock))),
        );
        Evaluator {
            output,
            globals,
            locals: HashMap::new(),
            sym_this: ctx.symbol("this"),
            sym_init: ctx.symbol("init"),
        }
    }

    /// Merges freshly resolved depths into the side-table.
    pub fn add_resolutions(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    pub fn eval_stmts_in_global_env(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let globals = Rc::clone(&self.globals);
        match self.eval_stmts(stmts, globals) {
            Ok(()) => Ok(()),
            Err(Signal::Error(e)) => Err(e),
            // The resolver rejects top-level returns before evaluation starts.
            Err(Signal::Return(_)) => unreachable!("return signal escaped all call frames"),
        }
    }

    fn eval_stmts(&mut self, stmts: &[Stmt], env: Rc<Env>) -> Result<(), Signal> {
        for stmt in stmts {
            self.eval_stmt(stmt, env.clone())?;
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: Rc<Env>) -> Result<(), Signal> {
        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print(pos, expr) => {
                let v = self.eval_expr(expr, env)?;
                writeln!(self.output, "{}", v).map_err(|e| RuntimeError {
                    pos: *pos,
                    kind: RuntimeErrorKind::Io(e),
                })?;
            }
            Stmt::VarDecl(_, name, init) => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr, env.clone())?,
                    None => Value::Nil,
                };
                env.define(name, value);
            }
            Stmt::FunDecl(decl) => {
                let func = Function::user(Rc::clone(decl), Rc::clone(&env), false);
                env.define(&decl.name, Value::Function(Rc::new(func)));
            }
            Stmt::ClassDecl(_, name, method_decls) => {
                let mut methods = HashMap::new();
                for decl in method_decls {
                    let is_initializer = decl.name == self.sym_init;
                    let func = Function::user(Rc::clone(decl), Rc::clone(&env), is_initializer);
                    methods.insert(decl.name.clone(), Rc::new(func));
                }
                let class = Class::new(name.clone(), methods);
                env.define(name, Value::Class(Rc::new(class)));
            }
            Stmt::Block(stmts) => {
                self.eval_stmts(stmts, Env::with_enclosing(env))?;
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, Rc::clone(&env))?.is_truthy() {
                    self.eval_stmt(then_branch, env)?;
                } else if let Some(else_branch) = else_branch {
                    self.eval_stmt(else_branch, env)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, Rc::clone(&env))?.is_truthy() {
                    self.eval_stmt(body, Rc::clone(&env))?;
                }
            }
            Stmt::Return(_, value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Nil,
                };
                return Err(Signal::Return(value));
            }
        };
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: Rc<Env>) -> Result<Value, Signal> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(Rc::clone(s))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(id, pos, name) => Ok(self.look_up_variable(*id, *pos, name, &env)?),
            Expr::Assign(id, pos, name, value) => {
                let value = self.eval_expr(value, Rc::clone(&env))?;
                match self.locals.get(id) {
                    Some(&depth) => env.assign_at(depth, name, value.clone()),
                    None => self.globals.assign(*pos, name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Unary(pos, op, right) => {
                let right = self.eval_expr(right, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                    UnaryOp::Neg => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError {
                            pos: *pos,
                            kind: RuntimeErrorKind::OperandMustBeNumber,
                        }
                        .into()),
                    },
                }
            }
            Expr::Binary(pos, op, lhs, rhs) => {
                let lhs = self.eval_expr(lhs, Rc::clone(&env))?;
                let rhs = self.eval_expr(rhs, env)?;
                Ok(eval_binary(*pos, *op, lhs, rhs)?)
            }
            Expr::Logical(op, lhs, rhs) => {
                let lhs = self.eval_expr(lhs, Rc::clone(&env))?;
                let short_circuit = match op {
                    LogicalOp::Or => lhs.is_truthy(),
                    LogicalOp::And => !lhs.is_truthy(),
                };
                if short_circuit {
                    // The deciding operand is handed back as-is, not
                    // coerced to a boolean.
                    Ok(lhs)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Group(inner) => self.eval_expr(inner, env),
            Expr::Call(pos, callee, args) => {
                let callee = self.eval_expr(callee, Rc::clone(&env))?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg, Rc::clone(&env))?);
                }
                self.call_value(*pos, callee, evaluated)
            }
        }
    }

    /// Resolved variables are read at their recorded depth from the current
    /// environment; everything else is a late-bound global.
    fn look_up_variable(
        &self,
        id: ExprId,
        pos: Position,
        name: &Symbol,
        env: &Rc<Env>,
    ) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&depth) => Ok(env.get_at(depth, name)),
            None => self.globals.get(pos, name),
        }
    }

    fn call_value(&mut self, pos: Position, callee: Value, args: Vec<Value>) -> Result<Value, Signal> {
        match callee {
            Value::Function(func) => {
                self.check_arity(pos, func.arity(), args.len())?;
                self.call_function(&func, args)
            }
            Value::Class(class) => {
                let arity = class
                    .find_method(&self.sym_init)
                    .map_or(0, |init| init.arity());
                self.check_arity(pos, arity, args.len())?;
                let instance = Value::Instance(Rc::new(Instance::new(Rc::clone(&class))));
                if let Some(init) = class.find_method(&self.sym_init) {
                    let bound = init.bind(&self.sym_this, instance.clone());
                    self.call_function(&bound, args)?;
                }
                Ok(instance)
            }
            _ => Err(RuntimeError {
                pos,
                kind: RuntimeErrorKind::NotCallable,
            }
            .into()),
        }
    }

    fn call_function(&mut self, func: &Function, args: Vec<Value>) -> Result<Value, Signal> {
        match func.body() {
            FunctionBody::Native { f, .. } => Ok(f(&args)),
            FunctionBody::User {
                decl,
                closure,
                is_initializer,
            } => {
                let env = Env::with_enclosing(Rc::clone(closure));
                for ((_, param), arg) in decl.params.iter().zip(args) {
                    env.define(param, arg);
                }
                let value = match self.eval_stmts(&decl.body, env) {
                    Ok(()) => Value::Nil,
                    Err(Signal::Return(value)) => value,
                    Err(err @ Signal::Error(_)) => return Err(err),
                };
                if *is_initializer {
                    // `init` always hands back the instance bound at `this`,
                    // whether the body returned or ran to completion.
                    return Ok(closure.get_at(0, &self.sym_this));
                }
                Ok(value)
            }
        }
    }

    fn check_arity(&self, pos: Position, expected: usize, got: usize) -> Result<(), RuntimeError> {
        if expected == got {
            Ok(())
        } else {
            Err(RuntimeError {
                pos,
                kind: RuntimeErrorKind::WrongArity { expected, got },
            })
        }
    }
}

fn eval_binary(pos: Position, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Add => match (lhs, rhs) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (Value::Str(l), Value::Str(r)) => {
                let mut s = String::with_capacity(l.len() + r.len());
                s.push_str(&l);
                s.push_str(&r);
                Ok(Value::Str(Rc::from(s)))
            }
            _ => Err(RuntimeError {
                pos,
                kind: RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
            }),
        },
        BinOp::Equal => Ok(Value::Bool(lhs == rhs)),
        BinOp::NotEqual => Ok(Value::Bool(lhs != rhs)),
        BinOp::Sub => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Number(l - r))
        }
        BinOp::Mul => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Number(l * r))
        }
        BinOp::Div => {
            // IEEE-754 division; dividing by zero yields an infinity or NaN.
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Number(l / r))
        }
        BinOp::Less => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Bool(l < r))
        }
        BinOp::LessEqual => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Bool(l <= r))
        }
        BinOp::Greater => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Bool(l > r))
        }
        BinOp::GreaterEqual => {
            let (l, r) = number_operands(pos, lhs, rhs)?;
            Ok(Value::Bool(l >= r))
        }
    }
}

fn number_operands(pos: Position, lhs: Value, rhs: Value) -> Result<(f64, f64), RuntimeError> {
    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => Ok((l, r)),
        _ => Err(RuntimeError {
            pos,
            kind: RuntimeErrorKind::OperandsMustBeNumbers,
        }),
    }
}

fn builtin_clock(_args: &[Value]) -> Value {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the Unix epoch");
    Value::Number(now.as_secs_f64())
}
