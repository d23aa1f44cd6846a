//! Static resolution of variable references.
//!
//! A single pass over the parsed program walks every scope the evaluator
//! will later create and records, for each variable or assignment
//! expression that names a local, how many environments up the chain its
//! binding lives.  The evaluator follows exactly that many hops, so the
//! two sides must agree on where scopes begin and end.
//!
//! Only the local block scopes are tracked.  The global scope is too
//! dynamic for that in Lox: a name not found in any tracked scope is
//! assumed to be global and left out of the side-table.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, FunDecl, Stmt};
use crate::ctx::Symbol;
use crate::diag::{Diagnostics, Position};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

pub struct Resolver {
    // Innermost scope last.  Each scope maps a name to whether its
    // initializer has finished resolving.
    scopes: Vec<HashMap<Symbol, bool>>,
    current_function: FunctionKind,
    locals: HashMap<ExprId, usize>,
    diag: Rc<Diagnostics>,
}

impl Resolver {
    pub fn new(diag: Rc<Diagnostics>) -> Resolver {
        Resolver {
            scopes: vec![],
            current_function: FunctionKind::None,
            locals: HashMap::new(),
            diag,
        }
    }

    /// Resolves a program and returns the side-table mapping expression
    /// identities to scope depths.  Errors are reported to the diagnostics
    /// context; resolution itself never aborts.
    pub fn resolve(mut self, stmts: &[Stmt]) -> HashMap<ExprId, usize> {
        self.resolve_stmts(stmts);
        self.locals
    }

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => self.resolve_expr(e),
            Stmt::Print(_, e) => self.resolve_expr(e),
            Stmt::VarDecl(pos, name, init) => {
                self.declare(*pos, name);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::FunDecl(decl) => {
                // The name is usable inside the body, so a function may
                // recurse into itself.
                self.declare(decl.pos, &decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            Stmt::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(cond, body) => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }
            Stmt::Return(pos, value) => {
                if self.current_function == FunctionKind::None {
                    self.diag
                        .error_at(*pos, &Token::Return, "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.diag.error_at(
                            *pos,
                            &Token::Return,
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::ClassDecl(pos, name, methods) => {
                self.declare(*pos, name);
                self.define(name);
                // Mirror the environment the evaluator wedges between a
                // method's closure and its call frame when binding `this`;
                // without it every capture in a method body would resolve
                // one scope short.
                self.begin_scope();
                for method in methods {
                    let kind = if method.name.name() == "init" {
                        FunctionKind::Initializer
                    } else {
                        FunctionKind::Method
                    };
                    self.resolve_function(method, kind);
                }
                self.end_scope();
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunDecl, kind: FunctionKind) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for (pos, param) in &decl.params {
            self.declare(*pos, param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Nil | Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) => (),
            Expr::Var(id, pos, name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name) == Some(&false) {
                        self.diag.error_at(
                            *pos,
                            &Token::Identifier(name.clone()),
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }
                self.resolve_local(*id, name);
            }
            Expr::Assign(id, _, name, value) => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Unary(_, _, right) => self.resolve_expr(right),
            Expr::Binary(_, _, left, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Logical(_, left, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Group(inner) => self.resolve_expr(inner),
            Expr::Call(_, callee, args) => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    /// Records the depth of the innermost scope containing `name`.  A miss
    /// means the name is global (or undefined, which only the evaluator can
    /// tell).
    fn resolve_local(&mut self, id: ExprId, name: &Symbol) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, depth);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Marks the name as existing but not yet usable in the current scope.
    fn declare(&mut self, pos: Position, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name) {
                self.diag.error_at(
                    pos,
                    &Token::Identifier(name.clone()),
                    "Already a variable with this name in this scope.",
                );
            }
            scope.insert(name.clone(), false);
        }
    }

    /// Marks the name as fully initialized and ready for use.
    fn define(&mut self, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), true);
        }
    }
}
