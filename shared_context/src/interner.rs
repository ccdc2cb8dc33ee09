use bumpalo::Bump;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Symbol(pub(crate) u32);

/// Deduplicating string store backed by a bump arena.
///
/// Every name that flows through the compiler is interned once and
/// referred to by its `Symbol` afterwards, so name comparisons are
/// integer comparisons. Ada identifiers are case insensitive; the
/// lexer interns them through [`Interner::intern_folded`] so that
/// `Put_Line`, `PUT_LINE` and `put_line` all map to one symbol.
pub struct Interner<'a> {
    arena: &'a Bump,
    map: HashMap<&'a str, Symbol>,
    vec: Vec<&'a str>,
}

impl<'a> Interner<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        // reserve the first position for a default value
        let mut vec = Vec::new();
        vec.push("");

        Self {
            arena,
            map: HashMap::new(),
            vec,
        }
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }

        let sym = Symbol(self.vec.len() as u32);

        // Allocate the string in the bump arena
        let stored: &'a str = self.arena.alloc_str(s);

        self.vec.push(stored);
        self.map.insert(stored, sym);

        sym
    }

    /// Intern the ASCII-lowercased form of `s`.
    /// Used for identifiers and keywords, which Ada compares
    /// without regard to case.
    pub fn intern_folded(&mut self, s: &str) -> Symbol {
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            let folded = s.to_ascii_lowercase();
            self.intern(&folded)
        } else {
            self.intern(s)
        }
    }

    pub fn lookup(&self, sym: Symbol) -> &'a str {
        self.vec[sym.0 as usize]
    }

    /// The arena behind the interner. Library unit loading allocates
    /// file contents here so they share the compilation's lifetime.
    pub fn arena(&self) -> &'a Bump {
        self.arena
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folded_interning_merges_spellings() {
        let arena = Bump::new();
        let mut interner = Interner::new(&arena);

        let a = interner.intern_folded("Put_Line");
        let b = interner.intern_folded("PUT_LINE");
        let c = interner.intern_folded("put_line");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(interner.lookup(a), "put_line");
    }

    #[test]
    fn exact_interning_is_case_sensitive() {
        let arena = Bump::new();
        let mut interner = Interner::new(&arena);

        let a = interner.intern("HELLO");
        let b = interner.intern("hello");
        assert_ne!(a, b);
    }
}
