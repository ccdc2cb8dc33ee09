// Crate-level imports and re-exports
use crate::diagnostics::Diagnostics;
use crate::interner::Interner;
use crate::symbols::SymbolTable;
use crate::types::TypeTable;
use crate::units::UnitRegistry;
pub use bumpalo::Bump; // Memory arena used for efficient allocation
use interner::Symbol;

// Submodules
pub mod diagnostics; // Error reporting and the per-compilation error count
pub mod interner; // Deduplicates strings and creates Symbols
pub mod source_map; // Maps AST positions to source code positions
pub mod suppress; // pragma SUPPRESS masks and their lexical scoping
pub mod symbols; // Scoped symbol tables, visibility, overload sets
pub mod types; // Type descriptors, constraints, compatibility
pub mod units; // Library units, with-graph, elaboration states
pub mod univ; // Unbounded arithmetic for universal literals

/// Global compiler context
/// Holds the state shared across all compiler stages
/// This includes the interner, the type table, the symbol table,
/// the library unit registry and the diagnostics sink.
///
/// One context covers one compilation (the root unit plus every
/// unit pulled in through `with` clauses). Per-file state, such as
/// the source map, lives with the unit that owns the file.
pub struct CompilerContext<'a> {
    pub interner: Interner<'a>,    // For interning strings into Symbols
    pub diagnostics: Diagnostics,  // Collects and counts errors across phases
    pub types: TypeTable,          // All type and subtype descriptors
    pub symbols: SymbolTable,      // Scope tree and symbol entries
    pub units: UnitRegistry,       // Library units and their with-graph
    /// Next identity for a user-declared exception; the predefined
    /// ones own 1 through 5 and the runtime reserves the rest below 8.
    pub next_exception_identity: i64,
}

impl<'a> CompilerContext<'a> {
    /// Creates a new compiler context
    ///
    /// # Arguments
    /// - `arena`: Memory arena for allocations
    pub fn new(arena: &'a Bump) -> Self {
        let interner = Interner::new(arena);
        let diagnostics = Diagnostics::new();
        let types = TypeTable::new();
        let symbols = SymbolTable::new();
        let units = UnitRegistry::new();

        Self {
            interner,
            diagnostics,
            types,
            symbols,
            units,
            next_exception_identity: 8,
        }
    }
}

/// Represents a region in the source code
/// Used for error reporting and mapping AST nodes to positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize, // Starting byte offset in source
    pub end: usize,   // Ending byte offset in source
    pub line: usize,  // Line number in source
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize) -> Self {
        Self { start, end, line }
    }

    /// Merge two spans into one covering both.
    /// The line number is taken from the earlier span.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: if self.start <= other.start {
                self.line
            } else {
                other.line
            },
        }
    }
}

/// A name as written in the source: the case-folded symbol plus the
/// location of the occurrence. Ada names are case insensitive, so two
/// `Ident`s naming the same entity always carry the same symbol even
/// when the source spells them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ident {
    pub symbol: Symbol,
    pub span: Span,
}

impl Ident {
    pub fn new(symbol: Symbol, span: Span) -> Self {
        Self { symbol, span }
    }
}

impl Default for Ident {
    fn default() -> Self {
        Self {
            symbol: Symbol(0),
            span: Span::default(),
        }
    }
}
