//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::Diagnostics;
use crate::eval::Evaluator;
use crate::parser::Parser;
use crate::resolver::Resolver;

/// Tree-walk interpreter.
///
/// Each call to [`Interpreter::run`] takes a source unit through the whole
/// pipeline: scan and parse, resolve, evaluate.  Evaluation is skipped when
/// any earlier stage reported an error.  Global state persists across
/// calls, so a REPL can feed lines one at a time and definitions carry
/// over.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then additional
/// times to call this function:
///
/// ```
/// # use lox::interpreter::Interpreter;
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         } else {
///             return y;
///         }
///     }
/// "#;
/// interp.run(func_def);
///
/// interp.run("print max(10, 20);");
/// interp.run("print max(5, 4);");
/// assert!(!interp.had_error() && !interp.had_runtime_error());
///
/// assert_eq!(output, b"20\n5\n");
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    diag: Rc<Diagnostics>,
    evaluator: Evaluator<'t, W>,
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        let diag = Diagnostics::new();
        let evaluator = Evaluator::new(output, &ctx);
        Interpreter {
            ctx,
            diag,
            evaluator,
        }
    }

    /// Runs one source unit: a whole script in file mode, one line in a
    /// REPL.
    ///
    /// Diagnostics accumulate in the shared context; fetch them with
    /// [`Interpreter::take_diagnostics`] and check
    /// [`Interpreter::had_error`] / [`Interpreter::had_runtime_error`]
    /// afterwards.  Error flags are cleared on entry so every unit is
    /// judged on its own.
    pub fn run(&mut self, source: &str) {
        self.diag.reset();

        let mut parser = Parser::new(source, self.ctx.clone(), self.diag.clone());
        let prg = parser.parse_program();
        if self.diag.had_error() {
            return;
        }

        let locals = Resolver::new(self.diag.clone()).resolve(&prg);
        if self.diag.had_error() {
            return;
        }
        self.evaluator.add_resolutions(locals);

        if let Err(e) = self.evaluator.eval_stmts_in_global_env(&prg) {
            self.diag.runtime_error(e.pos, &e.to_string());
        }
    }

    /// True when the last run reported a scan, parse, or resolve error.
    pub fn had_error(&self) -> bool {
        self.diag.had_error()
    }

    /// True when the last run reported an evaluation failure.
    pub fn had_runtime_error(&self) -> bool {
        self.diag.had_runtime_error()
    }

    /// Removes and returns all pending diagnostics, oldest first, formatted
    /// for a human.
    pub fn take_diagnostics(&self) -> Vec<String> {
        self.diag.take_messages()
    }
}
