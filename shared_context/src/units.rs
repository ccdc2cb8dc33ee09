use crate::interner::Symbol;
use crate::symbols::ScopeId;
use std::collections::HashMap;
use std::path::PathBuf;

/// The most include directories the driver accepts.
pub const MAX_INCLUDE_DIRS: usize = 32;

/// Locates the source file of a library unit by its (case-folded)
/// name. The compiler core only depends on this interface; the
/// filesystem implementation over the include directories lives in
/// the driver.
pub trait SourceLocator {
    fn locate(&self, unit_name: &str) -> Option<PathBuf>;
}

/// Stable handle to one library unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnitId(u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitKind {
    Package,
    Subprogram,
}

/// Elaboration state machine of a library unit.
///
/// NotStarted -> Elaborating -> Elaborated. Observing `Elaborating`
/// on entry means the with-graph has a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElabState {
    NotStarted,
    Elaborating,
    Elaborated,
}

/// A compiled named package or subprogram.
pub struct LibraryUnit {
    pub name: Symbol,
    pub kind: UnitKind,
    /// The unit's exported declarative scope, linked to clients.
    pub scope: Option<ScopeId>,
    /// Units named in this unit's context clauses.
    pub deps: Vec<UnitId>,
    pub state: ElabState,
    pub has_body: bool,
    /// Set for units the compiler itself provides (STANDARD, TEXT_IO):
    /// they have no source file and nothing to elaborate.
    pub intrinsic: bool,
}

/// Registry of every library unit touched by one compilation,
/// including units loaded transitively through `with` clauses.
pub struct UnitRegistry {
    units: Vec<LibraryUnit>,
    by_name: HashMap<Symbol, UnitId>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Get the unit named `name`, creating a NotStarted placeholder on
    /// first mention.
    pub fn intern(&mut self, name: Symbol, kind: UnitKind) -> UnitId {
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = UnitId(self.units.len() as u32);
        self.units.push(LibraryUnit {
            name,
            kind,
            scope: None,
            deps: Vec::new(),
            state: ElabState::NotStarted,
            has_body: false,
            intrinsic: false,
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn by_name(&self, name: Symbol) -> Option<UnitId> {
        self.by_name.get(&name).copied()
    }

    pub fn get(&self, id: UnitId) -> &LibraryUnit {
        &self.units[id.index()]
    }

    pub fn get_mut(&mut self, id: UnitId) -> &mut LibraryUnit {
        &mut self.units[id.index()]
    }

    pub fn add_dep(&mut self, unit: UnitId, dep: UnitId) {
        let deps = &mut self.units[unit.index()].deps;
        if !deps.contains(&dep) {
            deps.push(dep);
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Dependency-first order over the with-graph reachable from
    /// `root`: every unit appears after all of its dependencies.
    /// Returns the cycle path on failure.
    ///
    /// Walks with the elaboration state machine itself: a unit found
    /// in `Elaborating` state while entering it again is the cycle.
    pub fn elaboration_order(&mut self, root: UnitId) -> Result<Vec<UnitId>, Vec<Symbol>> {
        // reset states so the walk can re-run after edits
        for unit in &mut self.units {
            unit.state = ElabState::NotStarted;
        }
        let mut order = Vec::new();
        let mut path = Vec::new();
        self.visit(root, &mut order, &mut path)?;
        Ok(order)
    }

    fn visit(
        &mut self,
        id: UnitId,
        order: &mut Vec<UnitId>,
        path: &mut Vec<UnitId>,
    ) -> Result<(), Vec<Symbol>> {
        match self.get(id).state {
            ElabState::Elaborated => return Ok(()),
            ElabState::Elaborating => {
                // the cycle is the path suffix starting at this unit
                let start = path.iter().position(|u| *u == id).unwrap_or(0);
                let mut cycle: Vec<Symbol> =
                    path[start..].iter().map(|u| self.get(*u).name).collect();
                cycle.push(self.get(id).name);
                return Err(cycle);
            }
            ElabState::NotStarted => {}
        }

        self.get_mut(id).state = ElabState::Elaborating;
        path.push(id);
        let deps = self.get(id).deps.clone();
        for dep in deps {
            self.visit(dep, order, path)?;
        }
        path.pop();
        self.get_mut(id).state = ElabState::Elaborated;
        order.push(id);
        Ok(())
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_topological() {
        let mut registry = UnitRegistry::new();
        let a = registry.intern(Symbol::default(), UnitKind::Subprogram);
        let b = registry.intern(crate::interner::Symbol(1), UnitKind::Package);
        let c = registry.intern(crate::interner::Symbol(2), UnitKind::Package);

        // a with b, b with c
        registry.add_dep(a, b);
        registry.add_dep(b, c);

        let order = registry.elaboration_order(a).unwrap();
        assert_eq!(order, vec![c, b, a]);
    }

    #[test]
    fn diamond_dependencies_elaborate_once() {
        let mut registry = UnitRegistry::new();
        let a = registry.intern(crate::interner::Symbol(1), UnitKind::Subprogram);
        let b = registry.intern(crate::interner::Symbol(2), UnitKind::Package);
        let c = registry.intern(crate::interner::Symbol(3), UnitKind::Package);
        let d = registry.intern(crate::interner::Symbol(4), UnitKind::Package);

        registry.add_dep(a, b);
        registry.add_dep(a, c);
        registry.add_dep(b, d);
        registry.add_dep(c, d);

        let order = registry.elaboration_order(a).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(*order.first().unwrap(), d);
        assert_eq!(*order.last().unwrap(), a);
    }

    #[test]
    fn with_cycles_are_rejected() {
        let mut registry = UnitRegistry::new();
        let a = registry.intern(crate::interner::Symbol(1), UnitKind::Package);
        let b = registry.intern(crate::interner::Symbol(2), UnitKind::Package);

        registry.add_dep(a, b);
        registry.add_dep(b, a);

        let cycle = registry.elaboration_order(a).unwrap_err();
        assert!(cycle.len() >= 2);
    }
}
