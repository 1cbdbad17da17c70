//! String interning for variable, node and reference-tag names.

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::sync::Arc;

/// Thread-safe string interner.
///
/// Cloning is cheap and every clone shares the same table, so function bodies
/// verified on different threads agree on symbol identities.
#[derive(Clone, Default)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the existing symbol if it was seen before.
    pub fn intern(&self, text: &str) -> Symbol {
        self.inner.get_or_intern(text)
    }

    /// Returns the symbol for `text` without interning it.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.inner.get(text)
    }

    /// Resolves a symbol to an owned string.
    pub fn resolve(&self, sym: Symbol) -> String {
        self.try_resolve(sym).unwrap_or_default()
    }

    /// Resolves a symbol, returning `None` for symbols of another interner.
    pub fn try_resolve(&self, sym: Symbol) -> Option<String> {
        self.inner.try_resolve(&sym).map(str::to_string)
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let interner = Interner::new();
        let first = interner.intern("x");
        let second = interner.intern("x");
        assert_eq!(first, second);
        assert_eq!(interner.resolve(first), "x");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_clones_share_table() {
        let interner = Interner::new();
        let clone = interner.clone();
        let sym = clone.intern("tag");
        assert_eq!(interner.get("tag"), Some(sym));
        assert_eq!(interner.get("other"), None);
    }
}
