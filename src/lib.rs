//! A tree-walking interpreter for the Lox language.
//!
//! See [Crafting Interpreters](https://craftinginterpreters.com/).
//!
//! Source text flows through the scanner, the parser, a static resolution
//! pass, and finally the evaluator.  The three analysis stages report to a
//! shared diagnostics context and never abort; the driver inspects that
//! context between stages and refuses to run code that failed analysis.
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - Classes support declaration, construction, and `init`; there are no
//!   property access expressions yet, so methods other than `init` cannot
//!   be reached through an instance.
//! - No inheritance.
//! - The only built-in function is `clock()`.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;

mod ast;
mod ctx;
mod diag;
mod env;
mod eval;
mod parser;
mod resolver;
mod scanner;
mod token;
mod value;
