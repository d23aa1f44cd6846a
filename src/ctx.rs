use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::ast::ExprId;
use crate::token::Token;

/// Mostly read-only state shared by every pipeline stage and persisting
/// across interpreter sessions: the string interner, the keyword table, and
/// the counter handing out expression identities.
///
/// The expression counter must outlive any single parse: function values
/// keep their bodies alive across REPL lines, and the resolution side-table
/// entries recorded for those bodies stay keyed by the identities assigned
/// when they were parsed.
#[derive(Debug)]
pub struct Context {
    symbols: RefCell<HashSet<Symbol>>,
    keywords: HashMap<Symbol, Token>,
    expr_ids: Cell<ExprId>,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data
    /// structures.
    pub fn new() -> Rc<Self> {
        let mut symbols = HashSet::new();
        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            let sym = Symbol(Rc::from(name));
            symbols.insert(sym.clone());
            keywords.insert(sym, token);
        }

        Rc::new(Context {
            symbols: RefCell::new(symbols),
            keywords,
            expr_ids: Cell::new(0),
        })
    }

    /// Interns the given string if needed and returns its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        let mut symbols = self.symbols.borrow_mut();
        if let Some(sym) = symbols.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            symbols.insert(sym.clone());
            sym
        }
    }

    /// Returns the token associated with the given symbol if it is a keyword.
    pub fn keyword(&self, sym: &Symbol) -> Option<Token> {
        self.keywords.get(sym).cloned()
    }

    /// Hands out the identity for the next parsed variable or assignment
    /// node.
    pub fn next_expr_id(&self) -> ExprId {
        let id = self.expr_ids.get();
        self.expr_ids.set(id + 1);
        id
    }
}

/// An immutable interned string, guaranteed to be unique within its context
/// and so comparable by address rather than content.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

const KEYWORDS: [(&str, Token); 16] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("else", Token::Else),
    ("false", Token::False),
    ("for", Token::For),
    ("fun", Token::Fun),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_from_string() {
        let ctx = Context::new();
        let sym = ctx.symbol("foo");
        assert_eq!(sym.name(), "foo");
    }

    #[test]
    fn symbols_with_same_name_are_equal() {
        let ctx = Context::new();
        let sym1 = ctx.symbol("foo");
        let sym2 = ctx.symbol("foo");
        assert_eq!(sym1, sym2);
    }

    #[test]
    fn symbols_with_different_names_are_different() {
        let ctx = Context::new();
        let sym1 = ctx.symbol("foo");
        let sym2 = ctx.symbol("bar");
        assert_ne!(sym1, sym2);
    }

    #[test]
    fn keywords_map_to_their_tokens() {
        let ctx = Context::new();
        let sym = ctx.symbol("while");
        assert_eq!(ctx.keyword(&sym), Some(Token::While));
        let sym = ctx.symbol("whale");
        assert_eq!(ctx.keyword(&sym), None);
    }

    #[test]
    fn expr_ids_are_unique() {
        let ctx = Context::new();
        let id1 = ctx.next_expr_id();
        let id2 = ctx.next_expr_id();
        assert_ne!(id1, id2);
    }
}
