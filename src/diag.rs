//! Diagnostics context shared by all pipeline stages.
//!
//! Stages report here and keep going; nothing in the core prints directly.
//! The driver drains the formatted messages between stages and reads the
//! two flags to decide whether to continue and which exit code to use.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::token::Token;

/// Line number (starting at one).
pub type Position = u32;

#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: RefCell<Vec<String>>,
    had_error: Cell<bool>,
    had_runtime_error: Cell<bool>,
}

impl Diagnostics {
    /// Creates a new diagnostics context.
    ///
    /// Returns a Rc because the context is shared between pipeline stages.
    pub fn new() -> Rc<Self> {
        Rc::new(Diagnostics::default())
    }

    /// Reports a static error with no offending token, as the scanner does.
    pub fn error(&self, pos: Position, message: &str) {
        self.had_error.set(true);
        self.push(pos, "", message);
    }

    /// Reports a static error at the given token.
    pub fn error_at(&self, pos: Position, token: &Token, message: &str) {
        self.had_error.set(true);
        match token {
            Token::Eof => self.push(pos, " at end", message),
            t => self.push(pos, &format!(" at '{}'", t), message),
        }
    }

    /// Reports an evaluation failure.
    pub fn runtime_error(&self, pos: Position, message: &str) {
        self.had_runtime_error.set(true);
        self.push(pos, "", message);
    }

    pub fn had_error(&self) -> bool {
        self.had_error.get()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error.get()
    }

    /// Removes and returns all pending messages, oldest first.
    pub fn take_messages(&self) -> Vec<String> {
        self.messages.take()
    }

    /// Clears the error flags so a fresh run can be judged on its own.
    /// Pending messages are left for `take_messages`.
    pub fn reset(&self) {
        self.had_error.set(false);
        self.had_runtime_error.set(false);
    }

    fn push(&self, pos: Position, location: &str, message: &str) {
        self.messages
            .borrow_mut()
            .push(format!("[line {}] Error{}: {}", pos, location, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_style_error() {
        let diag = Diagnostics::new();
        diag.error(3, "Unexpected character.");
        assert!(diag.had_error());
        assert!(!diag.had_runtime_error());
        assert_eq!(
            diag.take_messages(),
            vec!["[line 3] Error: Unexpected character.".to_string()]
        );
    }

    #[test]
    fn error_at_token_names_the_lexeme() {
        let diag = Diagnostics::new();
        diag.error_at(1, &Token::Semicolon, "Expected expression");
        assert_eq!(
            diag.take_messages(),
            vec!["[line 1] Error at ';': Expected expression".to_string()]
        );
    }

    #[test]
    fn error_at_eof_says_at_end() {
        let diag = Diagnostics::new();
        diag.error_at(7, &Token::Eof, "Expect ')' after expression.");
        assert_eq!(
            diag.take_messages(),
            vec!["[line 7] Error at end: Expect ')' after expression.".to_string()]
        );
    }

    #[test]
    fn runtime_errors_set_their_own_flag() {
        let diag = Diagnostics::new();
        diag.runtime_error(2, "Operands must be numbers.");
        assert!(!diag.had_error());
        assert!(diag.had_runtime_error());
        assert_eq!(
            diag.take_messages(),
            vec!["[line 2] Error: Operands must be numbers.".to_string()]
        );
    }

    #[test]
    fn reset_clears_flags_but_keeps_messages() {
        let diag = Diagnostics::new();
        diag.error(1, "Unexpected character.");
        diag.reset();
        assert!(!diag.had_error());
        assert_eq!(diag.take_messages().len(), 1);
    }
}
