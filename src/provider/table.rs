//! Binding table storage.

use std::collections::HashMap;

use crate::bindings::Binding;
use crate::token::Token;

/// Binding table shared by every scope mounted from one provider
pub(crate) struct BindingTable {
    /// Fast Vec lookup for the first N bindings (cache-friendly)
    small: Vec<(Token, Binding)>,
    /// HashMap fallback for the rest
    large: HashMap<Token, Binding>,
    /// Threshold for Vec vs HashMap
    small_threshold: usize,
}

impl BindingTable {
    pub(crate) fn new() -> Self {
        Self {
            small: Vec::new(),
            large: HashMap::new(),
            small_threshold: 16,
        }
    }

    /// Inserts a binding; the last registration for a token wins.
    pub(crate) fn insert(&mut self, token: Token, binding: Binding) {
        if let Some(pos) = self.small.iter().position(|(t, _)| t == &token) {
            self.small[pos] = (token, binding);
        } else if self.small.len() < self.small_threshold && !self.large.contains_key(&token) {
            self.small.push((token, binding));
        } else {
            self.large.insert(token, binding);
        }
    }

    #[inline]
    pub(crate) fn get(&self, token: &Token) -> Option<&Binding> {
        for (t, binding) in &self.small {
            if t == token {
                return Some(binding);
            }
        }
        self.large.get(token)
    }

    #[inline]
    pub(crate) fn contains(&self, token: &Token) -> bool {
        self.get(token).is_some()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Token, &Binding)> {
        self.small.iter().map(|(t, b)| (t, b)).chain(self.large.iter())
    }

    pub(crate) fn len(&self) -> usize {
        self.small.len() + self.large.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{to_value, BindingKind};

    #[test]
    fn last_registration_wins() {
        let mut table = BindingTable::new();
        table.insert(Token::name("a"), to_value(1u8));
        table.insert(Token::name("a"), to_value(2u8).prefer_ancestor());
        assert_eq!(table.len(), 1);
        assert!(table.get(&Token::name("a")).unwrap().prefers_ancestor());
    }

    #[test]
    fn spills_into_map() {
        let mut table = BindingTable::new();
        for i in 0..40 {
            table.insert(Token::from(format!("t{}", i)), to_value(i as u32));
        }
        assert_eq!(table.len(), 40);
        assert!(table.contains(&Token::from("t39".to_string())));
        assert_eq!(table.iter().count(), 40);
        assert!(table.iter().all(|(_, b)| b.kind() == BindingKind::Value));

        // Replacing a spilled token keeps a single entry
        table.insert(Token::from("t39".to_string()), to_value(0u32));
        assert_eq!(table.len(), 40);
    }
}
