//! Registration shapes accepted by providers.

use std::fmt;

use crate::bindings::{to_class, Binding};
use crate::diagnostics::Diagnostics;
use crate::token::Token;
use crate::traits::Construct;

/// One entry of a provider's binding list.
///
/// Three shapes are accepted:
/// - a bare class ([`Definition::class`]): the type is both token and constructor
/// - a token/binding pair ([`Definition::new`], or a `(token, binding)` tuple)
/// - a token alone ([`Definition::token`]), which is reported as incorrect and skipped
///
/// # Examples
///
/// ```
/// use ferrous_tree_di::{Definition, Token, to_value};
///
/// let by_pair: Definition = ("config", to_value(String::from("debug"))).into();
/// let explicit = Definition::new(Token::name("config"), to_value(String::from("debug")));
/// assert_eq!(by_pair.token_ref(), explicit.token_ref());
/// ```
pub struct Definition {
    token: Token,
    binding: Option<Binding>,
}

impl Definition {
    /// Class definition: token and binding both derived from `T`.
    pub fn class<T: Construct>() -> Self {
        Self {
            token: Token::of::<T>(),
            binding: Some(to_class::<T>()),
        }
    }

    /// Explicit token/binding record.
    pub fn new(token: impl Into<Token>, binding: Binding) -> Self {
        Self {
            token: token.into(),
            binding: Some(binding),
        }
    }

    /// Token without binding.
    pub fn token(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            binding: None,
        }
    }

    /// Token this definition registers.
    pub fn token_ref(&self) -> &Token {
        &self.token
    }

    /// Validates the definition into a table entry.
    pub(crate) fn normalize(self, diagnostics: &Diagnostics) -> Option<(Token, Binding)> {
        match self.binding {
            Some(binding) if self.token.is_valid() => Some((self.token, binding)),
            Some(binding) => {
                diagnostics.incorrect_binding(&self.token, binding.label());
                None
            }
            None => {
                diagnostics.incorrect_binding(&self.token, "<missing>");
                None
            }
        }
    }
}

impl<K: Into<Token>> From<(K, Binding)> for Definition {
    fn from((token, binding): (K, Binding)) -> Self {
        Definition::new(token, binding)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("token", &self.token)
            .field("binding", &self.binding)
            .finish()
    }
}
