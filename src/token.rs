//! Token types used as dependency keys.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// Unique symbol usable as a token.
///
/// Two symbols are equal only if one is a copy of the other, even when they share
/// a description.
///
/// ```rust
/// use ferrous_tree_di::Symbol;
///
/// let a = Symbol::new("config");
/// let b = Symbol::new("config");
/// assert_ne!(a, b);
/// assert_eq!(a, a.clone());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    id: u64,
    description: &'static str,
}

impl Symbol {
    /// Allocates a new process-unique symbol.
    pub fn new(description: &'static str) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description,
        }
    }

    /// Description used in diagnostics.
    pub fn description(&self) -> &'static str {
        self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Key under which a dependency is registered and looked up.
///
/// - **Type**: a class reference, compared by `TypeId`
/// - **Name**: a string constant, compared by value
/// - **Symbol**: a symbol constant, compared by identity
///
/// # Examples
///
/// ```rust
/// use ferrous_tree_di::{Token, Symbol};
///
/// struct Logger;
///
/// assert_eq!(Token::of::<Logger>(), Token::of::<Logger>());
/// assert_eq!(Token::name("config"), Token::from("config"));
///
/// let sym = Symbol::new("theme");
/// assert_eq!(Token::from(sym), Token::Symbol(sym));
/// ```
#[derive(Debug, Clone)]
pub enum Token {
    /// Class token with TypeId and type name for diagnostics
    Type(TypeId, &'static str),
    /// String constant token
    Name(Arc<str>),
    /// Symbol constant token
    Symbol(Symbol),
}

impl Token {
    /// Token for the type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Token::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// String token.
    pub fn name(name: impl Into<Arc<str>>) -> Self {
        Token::Name(name.into())
    }

    /// Token for a freshly allocated symbol.
    pub fn symbol(description: &'static str) -> Self {
        Token::Symbol(Symbol::new(description))
    }

    /// Human-readable name for diagnostics.
    pub fn display_name(&self) -> &str {
        match self {
            Token::Type(_, name) => name,
            Token::Name(name) => name,
            Token::Symbol(sym) => sym.description,
        }
    }

    /// The `TypeId` behind a class token.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Token::Type(id, _) => Some(*id),
            _ => None,
        }
    }

    /// Whether the token can act as a map key.
    pub fn is_valid(&self) -> bool {
        match self {
            Token::Name(name) => !name.is_empty(),
            Token::Type(..) | Token::Symbol(_) => true,
        }
    }
}

// TypeId-only comparison for class tokens; the name is only for display
impl PartialEq for Token {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Type(a, _), Token::Type(b, _)) => a == b,
            (Token::Name(a), Token::Name(b)) => a == b,
            (Token::Symbol(a), Token::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Token::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Token::Name(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            Token::Symbol(sym) => {
                2u8.hash(state);
                sym.hash(state);
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Symbol(sym) => write!(f, "Symbol({})", sym.description),
            other => f.write_str(other.display_name()),
        }
    }
}

impl From<&'static str> for Token {
    fn from(name: &'static str) -> Self {
        Token::Name(Arc::from(name))
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Token::Name(Arc::from(name))
    }
}

impl From<Symbol> for Token {
    fn from(sym: Symbol) -> Self {
        Token::Symbol(sym)
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

/// Shorthand for [`Token::of`].
#[inline]
pub fn token_of<T: ?Sized + 'static>() -> Token {
    Token::of::<T>()
}
