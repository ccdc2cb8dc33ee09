use crate::Span;
use crate::interner::Symbol;
use crate::types::TypeId;
use std::collections::HashMap;

/// Stable handle to one symbol table entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable handle to one scope in the scope tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Parameter passing mode of a formal parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    In,
    Out,
    InOut,
}

/// One formal parameter of a subprogram or entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Symbol,
    pub mode: Mode,
    pub ty: TypeId,
    /// True when the declaration supplies a default expression; the
    /// expression itself stays with the declaration's AST.
    pub has_default: bool,
}

/// A subprogram or entry signature: formal parameters plus the result
/// type for functions.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub result: Option<TypeId>,
}

/// What a name binding denotes.
///
/// Subprograms, enumeration literals and entries are overloadable:
/// several entries of these kinds may share one name in one scope,
/// distinguished by signature.
#[derive(Clone, Debug, PartialEq)]
pub enum SymbolKind {
    /// A variable; `mode` is set for formal parameters.
    Object { mode: Option<Mode> },
    Constant,
    Type,
    Subtype,
    Subprogram { signature: Signature },
    EnumLiteral { position: i64 },
    Package { scope: ScopeId },
    Generic,
    Exception { identity: i64 },
    Label,
    Entry { signature: Signature },
    LoopName,
}

impl SymbolKind {
    pub fn is_overloadable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Subprogram { .. } | SymbolKind::EnumLiteral { .. } | SymbolKind::Entry { .. }
        )
    }
}

/// Visibility state of a binding.
///
/// A declaration becomes `Visible` once elaborated; between its
/// declaration and the end of its elaboration it is `NotElaborated`
/// (self-reference in an initializer is illegal). `Hidden` marks
/// entries shadowed by an inner homograph, and `Superseded` marks a
/// spec-level entry replaced by its completion in a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    NotElaborated,
    Visible,
    Hidden,
    Superseded,
}

/// A name binding inside a scope.
#[derive(Clone, Debug)]
pub struct SymbolEntry {
    pub name: Symbol,
    pub kind: SymbolKind,
    /// Declared type for objects and constants; the denoted type for
    /// type and subtype names; INVALID where not applicable.
    pub ty: TypeId,
    pub decl_span: Span,
    /// External (mangled) name, for entities that exist in the emitted
    /// IR. Runtime-provided subprograms carry their ABI name here.
    pub mangled: String,
    /// Declared but provided by the runtime or another unit: no body
    /// is expected in this compilation and calls take no static link.
    pub external: bool,
    pub visibility: Visibility,
    pub scope: ScopeId,
}

/// What kind of program structure a scope belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Standard,
    Package,
    Subprogram,
    Block,
    Loop,
    Task,
}

/// A lexical scope: a name map plus the packages opened into it by
/// `use` clauses. Scopes form a tree rooted at package STANDARD.
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    names: HashMap<Symbol, Vec<SymbolId>>,
    uses: Vec<ScopeId>,
    pub depth: u32,
}

/// All scopes and symbol entries of a compilation.
///
/// Entries and scopes live in flat vectors and refer to each other by
/// id, so the scope/symbol back-references the data model calls for
/// are indices rather than pointer cycles. The analyzer drives the
/// open-scope stack; the code generator only reads.
pub struct SymbolTable {
    symbols: Vec<SymbolEntry>,
    scopes: Vec<Scope>,
    stack: Vec<ScopeId>,
}

impl SymbolTable {
    /// Creates a table containing just the root STANDARD scope, which
    /// is open.
    pub fn new() -> Self {
        let root = Scope {
            parent: None,
            kind: ScopeKind::Standard,
            names: HashMap::new(),
            uses: Vec::new(),
            depth: 0,
        };
        Self {
            symbols: Vec::new(),
            scopes: vec![root],
            stack: vec![ScopeId(0)],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack is empty")
    }

    /// Open a fresh scope as a child of the current one.
    pub fn open_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let parent = self.current();
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            kind,
            names: HashMap::new(),
            uses: Vec::new(),
            depth: self.scope(parent).depth + 1,
        });
        self.stack.push(id);
        id
    }

    /// Re-enter an existing scope, e.g. a package spec scope while
    /// analyzing the package body.
    pub fn reopen_scope(&mut self, scope: ScopeId) {
        self.stack.push(scope);
    }

    pub fn close_scope(&mut self) {
        self.stack.pop().expect("closing the root scope");
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn get(&self, id: SymbolId) -> &SymbolEntry {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut SymbolEntry {
        &mut self.symbols[id.index()]
    }

    /// Declare a binding in the current scope.
    pub fn declare(&mut self, mut entry: SymbolEntry) -> SymbolId {
        let scope = self.current();
        entry.scope = scope;
        let name = entry.name;
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(entry);
        self.scopes[scope.index()]
            .names
            .entry(name)
            .or_default()
            .push(id);
        id
    }

    /// Declare a binding in a specific scope (used when completing a
    /// package spec from its body).
    pub fn declare_in(&mut self, scope: ScopeId, mut entry: SymbolEntry) -> SymbolId {
        entry.scope = scope;
        let name = entry.name;
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(entry);
        self.scopes[scope.index()]
            .names
            .entry(name)
            .or_default()
            .push(id);
        id
    }

    /// Open a package's declarations into the current scope
    /// (`use` clause).
    pub fn add_use(&mut self, package_scope: ScopeId) {
        let current = self.current();
        let uses = &mut self.scopes[current.index()].uses;
        if !uses.contains(&package_scope) {
            uses.push(package_scope);
        }
    }

    /// Bindings for `name` in one scope only, visible ones first
    /// declared first. Used for homograph detection and selected
    /// component lookup.
    pub fn lookup_in(&self, scope: ScopeId, name: Symbol) -> Vec<SymbolId> {
        self.scopes[scope.index()]
            .names
            .get(&name)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| self.get(*id).visibility != Visibility::Superseded)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lookup inside a named package scope (selected component
    /// notation `P.X`).
    pub fn lookup_selected(&self, package_scope: ScopeId, name: Symbol) -> Vec<SymbolId> {
        self.lookup_in(package_scope, name)
    }

    /// Name lookup from the current scope outward.
    ///
    /// A non-overloadable binding in an inner scope hides everything
    /// further out. Overloadable bindings accumulate across scopes
    /// until a non-overloadable homograph cuts the walk short.
    /// Use-visible bindings are added for overloadable names and used
    /// as a fallback for non-overloadable ones, which never lets a
    /// `use` clause hide a directly visible name.
    pub fn lookup(&self, name: Symbol) -> Vec<SymbolId> {
        let mut candidates: Vec<SymbolId> = Vec::new();
        let mut hidden = false;

        let mut walk = Some(self.current());
        while let Some(scope) = walk {
            for id in self.lookup_in(scope, name) {
                let entry = self.get(id);
                if entry.visibility == Visibility::Hidden {
                    continue;
                }
                if entry.kind.is_overloadable() {
                    candidates.push(id);
                } else if candidates.is_empty() {
                    // a plain binding: it is the meaning of the name
                    return vec![id];
                } else {
                    // overloadables from inner scopes hide this one,
                    // but the walk stops here
                    hidden = true;
                }
            }
            if hidden {
                return candidates;
            }
            walk = self.scope(scope).parent;
        }

        // use-visible bindings
        let mut use_visible: Vec<SymbolId> = Vec::new();
        let mut walk = Some(self.current());
        while let Some(scope) = walk {
            for used in &self.scope(scope).uses {
                for id in self.lookup_in(*used, name) {
                    if !use_visible.contains(&id) {
                        use_visible.push(id);
                    }
                }
            }
            walk = self.scope(scope).parent;
        }

        if candidates.is_empty() {
            use_visible
        } else {
            // direct overloadables plus use-visible overloadables
            for id in use_visible {
                if self.get(id).kind.is_overloadable() && !candidates.contains(&id) {
                    candidates.push(id);
                }
            }
            candidates
        }
    }

    /// Static nesting depth of a scope, used to size static link
    /// chains for nested subprograms.
    pub fn depth_of(&self, scope: ScopeId) -> u32 {
        self.scope(scope).depth
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: Symbol, kind: SymbolKind) -> SymbolEntry {
        SymbolEntry {
            name,
            kind,
            ty: TypeId::INVALID,
            decl_span: Span::default(),
            mangled: String::new(),
            external: false,
            visibility: Visibility::Visible,
            scope: ScopeId(0),
        }
    }

    #[test]
    fn inner_binding_hides_outer() {
        let mut table = SymbolTable::new();
        let name = Symbol::default();

        let outer = table.declare(entry(name, SymbolKind::Constant));
        table.open_scope(ScopeKind::Block);
        let inner = table.declare(entry(name, SymbolKind::Object { mode: None }));

        assert_eq!(table.lookup(name), vec![inner]);
        table.close_scope();
        assert_eq!(table.lookup(name), vec![outer]);
    }

    #[test]
    fn overloadables_accumulate_across_scopes() {
        let mut table = SymbolTable::new();
        let name = Symbol::default();

        let outer = table.declare(entry(
            name,
            SymbolKind::Subprogram {
                signature: Signature::default(),
            },
        ));
        table.open_scope(ScopeKind::Subprogram);
        let inner = table.declare(entry(
            name,
            SymbolKind::Subprogram {
                signature: Signature::default(),
            },
        ));

        let found = table.lookup(name);
        assert!(found.contains(&inner));
        assert!(found.contains(&outer));
    }

    #[test]
    fn use_clause_never_hides_direct_visibility() {
        let mut table = SymbolTable::new();
        let name = Symbol::default();

        // a package scope declaring `name`
        let package_scope = table.open_scope(ScopeKind::Package);
        table.declare(entry(name, SymbolKind::Constant));
        table.close_scope();

        // a direct declaration in an inner scope, plus a use clause
        table.open_scope(ScopeKind::Block);
        let direct = table.declare(entry(name, SymbolKind::Constant));
        table.add_use(package_scope);

        assert_eq!(table.lookup(name), vec![direct]);
    }

    #[test]
    fn use_clause_provides_fallback_visibility() {
        let mut table = SymbolTable::new();
        let name = Symbol::default();

        let package_scope = table.open_scope(ScopeKind::Package);
        let exported = table.declare(entry(name, SymbolKind::Constant));
        table.close_scope();

        table.open_scope(ScopeKind::Block);
        table.add_use(package_scope);

        assert_eq!(table.lookup(name), vec![exported]);
    }
}
