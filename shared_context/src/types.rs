use crate::interner::Symbol;

/// A unique identifier for a type or subtype descriptor.
///
/// This acts as a stable handle into the [`TypeTable`]. Subtype-to-base
/// and derived-to-parent references are `TypeId`s as well, so the chains
/// that would otherwise be pointer cycles are plain data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Sentinel carried by AST nodes before semantic analysis runs,
    /// and left in place on nodes that failed to resolve.
    pub const INVALID: TypeId = TypeId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != TypeId::INVALID
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A static scalar bound. Bounds that depend on run-time values are
/// `Dynamic`; the declaration that introduced them keeps the bound
/// expression, and the code generator evaluates it at elaboration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bound {
    Int(i64),
    Real(f64),
    Dynamic,
}

impl Bound {
    pub fn as_int(self) -> Option<i64> {
        match self {
            Bound::Int(v) => Some(v),
            _ => None,
        }
    }
}

/// The constraint a subtype applies to its base type.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    /// Scalar range constraint: `range First .. Last`.
    Range { first: Bound, last: Bound },
    /// Index constraint on an unconstrained array type, one static
    /// range per dimension.
    Index { ranges: Vec<(i64, i64)> },
    /// Discriminant constraint, values in declaration order.
    Discriminant { values: Vec<i64> },
}

/// One record component (also used for discriminants).
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub name: Symbol,
    pub ty: TypeId,
    /// Static default value, when the declaration carries one; the
    /// defaulted discriminants of unconstrained objects come from
    /// here.
    pub default: Option<i64>,
}

/// One arm of a variant part: the discriminant choices it covers and
/// the components it contributes.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantArm {
    /// Inclusive choice ranges over the discriminant's values.
    pub choices: Vec<(i64, i64)>,
    pub is_others: bool,
    pub components: Vec<Component>,
}

/// A variant part keyed by one discriminant.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantPart {
    pub discriminant: Symbol,
    pub arms: Vec<VariantArm>,
}

/// The structural definition of a type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    /// Signed integer type with its base range.
    Integer { first: i64, last: i64 },
    /// Enumeration type; the literal's index is its position number.
    Enumeration { literals: Vec<Symbol> },
    /// Floating point type with a decimal digits requirement.
    Float { digits: u32 },
    /// Fixed point type; values are represented as i64 multiples of
    /// `small`, which defaults to the largest power of two <= delta.
    Fixed { delta: f64, small: f64 },
    /// Access type designating `designated`. Every access value may
    /// also be null.
    Access { designated: TypeId },
    /// Array type. `constrained` is false for types such as STRING
    /// whose bounds come from each object or subtype.
    Array {
        indexes: Vec<TypeId>,
        component: TypeId,
        constrained: bool,
    },
    /// Record type. Discriminants come first in the field layout,
    /// then the fixed components, then the components of every
    /// variant arm in declaration order.
    Record {
        discriminants: Vec<Component>,
        components: Vec<Component>,
        variant: Option<VariantPart>,
    },
    /// Task type with its entry names; entry signatures are symbol
    /// table entries inside the task's scope.
    Task { entries: Vec<Symbol> },
    /// Derived type: a new, incompatible type with the structure of
    /// its parent.
    Derived { parent: TypeId },
    /// The type of integer literals before conversion.
    UniversalInteger,
    /// The type of real literals before conversion.
    UniversalReal,
    /// Private or incomplete view; completed later in the same
    /// declarative region.
    Incomplete,
}

/// Represents one Ada type or subtype.
///
/// A descriptor with `base == None` is a base type (its own first
/// subtype). A descriptor with `base == Some(parent)` is a subtype of
/// `parent`; its constraint, if any, must be a non-widening refinement
/// of the parent's.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    pub name: Symbol,
    pub kind: TypeKind,
    pub base: Option<TypeId>,
    pub constraint: Option<Constraint>,
}

/// Handles to the predefined STANDARD types, filled in when the
/// predefined environment is built, before any user unit is analyzed.
#[derive(Clone, Copy, Debug)]
pub struct WellKnown {
    pub boolean: TypeId,
    pub integer: TypeId,
    pub float: TypeId,
    pub character: TypeId,
    pub string: TypeId,
    pub natural: TypeId,
    pub positive: TypeId,
    pub duration: TypeId,
    pub universal_integer: TypeId,
    pub universal_real: TypeId,
}

impl WellKnown {
    fn unset() -> Self {
        Self {
            boolean: TypeId::INVALID,
            integer: TypeId::INVALID,
            float: TypeId::INVALID,
            character: TypeId::INVALID,
            string: TypeId::INVALID,
            natural: TypeId::INVALID,
            positive: TypeId::INVALID,
            duration: TypeId::INVALID,
            universal_integer: TypeId::INVALID,
            universal_real: TypeId::INVALID,
        }
    }
}

/// Stores every type and subtype descriptor of a compilation.
///
/// The table is append only. Descriptors refer to each other through
/// `TypeId` indices, so recursive structures (access types designating
/// records that contain them) are representable without cycles in
/// memory.
pub struct TypeTable {
    types: Vec<TypeDescriptor>,
    pub well_known: WellKnown,
}

impl TypeTable {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            well_known: WellKnown::unset(),
        }
    }

    pub fn add(&mut self, descriptor: TypeDescriptor) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(descriptor);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.index()]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeDescriptor {
        &mut self.types[id.index()]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate every descriptor with its id.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (TypeId(index as u32), descriptor))
    }

    /// Follow the subtype chain to the base type. The invalid
    /// sentinel flows through unchanged so error recovery never
    /// cascades into the table.
    pub fn base_of(&self, id: TypeId) -> TypeId {
        if !id.is_valid() {
            return id;
        }
        let mut current = id;
        while let Some(parent) = self.get(current).base {
            current = parent;
        }
        current
    }

    /// Follow subtype chains and derived links down to the descriptor
    /// that carries the structural definition.
    pub fn structure_of(&self, id: TypeId) -> TypeId {
        if !id.is_valid() {
            return id;
        }
        let mut current = self.base_of(id);
        while let TypeKind::Derived { parent } = self.get(current).kind {
            current = self.base_of(parent);
        }
        current
    }

    /// The structural kind of a type, looking through subtypes and
    /// derivations.
    pub fn structural_kind(&self, id: TypeId) -> &TypeKind {
        if !id.is_valid() {
            return &TypeKind::Incomplete;
        }
        &self.get(self.structure_of(id)).kind
    }

    pub fn is_discrete(&self, id: TypeId) -> bool {
        matches!(
            self.structural_kind(id),
            TypeKind::Integer { .. } | TypeKind::Enumeration { .. } | TypeKind::UniversalInteger
        )
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.structural_kind(id),
            TypeKind::Integer { .. } | TypeKind::UniversalInteger
        )
    }

    pub fn is_real(&self, id: TypeId) -> bool {
        matches!(
            self.structural_kind(id),
            TypeKind::Float { .. } | TypeKind::Fixed { .. } | TypeKind::UniversalReal
        )
    }

    pub fn is_float(&self, id: TypeId) -> bool {
        matches!(
            self.structural_kind(id),
            TypeKind::Float { .. } | TypeKind::UniversalReal
        )
    }

    pub fn is_scalar(&self, id: TypeId) -> bool {
        self.is_discrete(id) || self.is_real(id)
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.structural_kind(id), TypeKind::Array { .. })
    }

    pub fn is_record(&self, id: TypeId) -> bool {
        matches!(self.structural_kind(id), TypeKind::Record { .. })
    }

    pub fn is_access(&self, id: TypeId) -> bool {
        matches!(self.structural_kind(id), TypeKind::Access { .. })
    }

    pub fn is_task(&self, id: TypeId) -> bool {
        matches!(self.structural_kind(id), TypeKind::Task { .. })
    }

    pub fn is_universal(&self, id: TypeId) -> bool {
        matches!(
            self.get(id).kind,
            TypeKind::UniversalInteger | TypeKind::UniversalReal
        )
    }

    /// Static bounds of a discrete type or subtype: the innermost
    /// static range constraint on the chain, or the base type's own
    /// range. `None` when a bound is dynamic.
    pub fn discrete_bounds(&self, id: TypeId) -> Option<(i64, i64)> {
        if !id.is_valid() {
            return None;
        }
        let mut current = id;
        loop {
            let descriptor = self.get(current);
            if let Some(Constraint::Range { first, last }) = &descriptor.constraint {
                return match (first.as_int(), last.as_int()) {
                    (Some(first), Some(last)) => Some((first, last)),
                    _ => None,
                };
            }
            match descriptor.base {
                Some(parent) => current = parent,
                None => break,
            }
        }

        match self.structural_kind(id) {
            TypeKind::Integer { first, last } => Some((*first, *last)),
            TypeKind::Enumeration { literals } => Some((0, literals.len() as i64 - 1)),
            _ => None,
        }
    }

    /// The literals of an enumeration type, in position order.
    pub fn enum_literals(&self, id: TypeId) -> Option<&[Symbol]> {
        match self.structural_kind(id) {
            TypeKind::Enumeration { literals } => Some(literals),
            _ => None,
        }
    }

    /// Index types of an array, looking through subtypes.
    pub fn array_indexes(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.structural_kind(id) {
            TypeKind::Array { indexes, .. } => Some(indexes),
            _ => None,
        }
    }

    /// Component type of an array, looking through subtypes.
    pub fn array_component(&self, id: TypeId) -> Option<TypeId> {
        match self.structural_kind(id) {
            TypeKind::Array { component, .. } => Some(*component),
            _ => None,
        }
    }

    /// Static index bounds of a constrained array subtype, first
    /// dimension only for the common one-dimensional case.
    pub fn array_static_bounds(&self, id: TypeId) -> Option<(i64, i64)> {
        if !id.is_valid() {
            return None;
        }
        let mut current = id;
        loop {
            let descriptor = self.get(current);
            if let Some(Constraint::Index { ranges }) = &descriptor.constraint {
                return ranges.first().copied();
            }
            match descriptor.base {
                Some(parent) => current = parent,
                None => break,
            }
        }
        // a constrained array type constrains through its index subtypes
        match self.structural_kind(id) {
            TypeKind::Array {
                indexes,
                constrained: true,
                ..
            } => self.discrete_bounds(*indexes.first()?),
            _ => None,
        }
    }

    /// Full field layout of a record type: discriminants, then fixed
    /// components, then every variant arm's components in order.
    pub fn record_fields(&self, id: TypeId) -> Vec<Component> {
        match self.structural_kind(id) {
            TypeKind::Record {
                discriminants,
                components,
                variant,
            } => {
                let mut fields = Vec::new();
                fields.extend(discriminants.iter().cloned());
                fields.extend(components.iter().cloned());
                if let Some(variant) = variant {
                    for arm in &variant.arms {
                        fields.extend(arm.components.iter().cloned());
                    }
                }
                fields
            }
            _ => Vec::new(),
        }
    }

    /// Position and type of a record field, by name.
    pub fn field_index(&self, id: TypeId, name: Symbol) -> Option<(usize, TypeId)> {
        self.record_fields(id)
            .iter()
            .enumerate()
            .find(|(_, component)| component.name == name)
            .map(|(index, component)| (index, component.ty))
    }

    /// True when the field named `name` is a discriminant of `id`.
    pub fn is_discriminant(&self, id: TypeId, name: Symbol) -> bool {
        match self.structural_kind(id) {
            TypeKind::Record { discriminants, .. } => {
                discriminants.iter().any(|d| d.name == name)
            }
            _ => false,
        }
    }

    /// Whether a field of `id` lives inside a variant part, meaning
    /// access to it is guarded by a discriminant check.
    pub fn field_in_variant(&self, id: TypeId, name: Symbol) -> bool {
        match self.structural_kind(id) {
            TypeKind::Record { variant: Some(variant), .. } => variant
                .arms
                .iter()
                .any(|arm| arm.components.iter().any(|c| c.name == name)),
            _ => false,
        }
    }

    /// Ada 83 type compatibility: two types match when they resolve to
    /// the same base type through subtype chains. Arrays additionally
    /// match structurally on index and component type identity, records
    /// only by identity. Universal operands match any type in the same
    /// numeric class.
    pub fn compatible(&self, a: TypeId, b: TypeId) -> bool {
        if !a.is_valid() || !b.is_valid() {
            // error recovery: a node that failed to resolve matches
            // anything so one mistake produces one diagnostic
            return true;
        }
        if self.base_of(a) == self.base_of(b) {
            return true;
        }

        match (self.structural_kind(a), self.structural_kind(b)) {
            (TypeKind::UniversalInteger, _) => self.is_integer(b) || self.is_real(b),
            (_, TypeKind::UniversalInteger) => self.is_integer(a) || self.is_real(a),
            (TypeKind::UniversalReal, _) => self.is_real(b),
            (_, TypeKind::UniversalReal) => self.is_real(a),
            (
                TypeKind::Array {
                    indexes: ia,
                    component: ca,
                    ..
                },
                TypeKind::Array {
                    indexes: ib,
                    component: cb,
                    ..
                },
            ) => {
                // index type identity per dimension, component type identity
                ia.len() == ib.len()
                    && ia
                        .iter()
                        .zip(ib.iter())
                        .all(|(x, y)| self.base_of(*x) == self.base_of(*y))
                    && self.base_of(*ca) == self.base_of(*cb)
            }
            _ => false,
        }
    }

    /// True when `(first, last)` does not widen the static bounds of
    /// `parent`. Null ranges (first > last) are always acceptable.
    pub fn is_refinement(&self, first: i64, last: i64, parent: TypeId) -> bool {
        if first > last {
            return true;
        }
        match self.discrete_bounds(parent) {
            Some((parent_first, parent_last)) => first >= parent_first && last <= parent_last,
            None => true, // dynamic parent bounds are checked at run time
        }
    }

    /// Default small for a fixed point type: the largest power of two
    /// not exceeding delta.
    pub fn fixed_small(delta: f64) -> f64 {
        let mut small = 1.0f64;
        if delta >= 1.0 {
            while small * 2.0 <= delta {
                small *= 2.0;
            }
        } else {
            while small > delta {
                small /= 2.0;
            }
        }
        small
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_integer() -> (TypeTable, TypeId) {
        let mut table = TypeTable::new();
        let integer = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: None,
            constraint: None,
        });
        (table, integer)
    }

    #[test]
    fn subtype_chains_reach_the_base() {
        let (mut table, integer) = table_with_integer();
        let small = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: Some(integer),
            constraint: Some(Constraint::Range {
                first: Bound::Int(1),
                last: Bound::Int(10),
            }),
        });
        let smaller = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: Some(small),
            constraint: Some(Constraint::Range {
                first: Bound::Int(2),
                last: Bound::Int(5),
            }),
        });

        assert_eq!(table.base_of(smaller), integer);
        assert_eq!(table.discrete_bounds(smaller), Some((2, 5)));
        assert_eq!(table.discrete_bounds(small), Some((1, 10)));
        assert!(table.compatible(small, smaller));
    }

    #[test]
    fn refinement_rejects_widening() {
        let (mut table, integer) = table_with_integer();
        let small = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: Some(integer),
            constraint: Some(Constraint::Range {
                first: Bound::Int(1),
                last: Bound::Int(10),
            }),
        });

        assert!(table.is_refinement(2, 9, small));
        assert!(!table.is_refinement(0, 10, small));
        assert!(!table.is_refinement(1, 11, small));
        // null range is always a refinement
        assert!(table.is_refinement(10, 1, small));
    }

    #[test]
    fn derived_types_are_incompatible_with_their_parent() {
        let (mut table, integer) = table_with_integer();
        let derived = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Derived { parent: integer },
            base: None,
            constraint: None,
        });

        assert!(!table.compatible(integer, derived));
        // but the derived type still has integer structure
        assert!(table.is_integer(derived));
    }

    #[test]
    fn fixed_small_is_a_power_of_two_below_delta() {
        assert_eq!(TypeTable::fixed_small(0.01), 0.0078125);
        assert_eq!(TypeTable::fixed_small(0.5), 0.5);
        assert_eq!(TypeTable::fixed_small(3.0), 2.0);
    }

    #[test]
    fn variant_components_follow_fixed_ones_in_layout() {
        let (mut table, integer) = table_with_integer();
        let disc = Symbol::default();
        let record = table.add(TypeDescriptor {
            name: Symbol::default(),
            kind: TypeKind::Record {
                discriminants: vec![Component {
                    name: disc,
                    ty: integer,
                    default: Some(0),
                }],
                components: vec![],
                variant: Some(VariantPart {
                    discriminant: disc,
                    arms: vec![VariantArm {
                        choices: vec![(0, 0)],
                        is_others: false,
                        components: vec![Component {
                            name: disc,
                            ty: integer,
                            default: None,
                        }],
                    }],
                }),
            },
            base: None,
            constraint: None,
        });

        assert_eq!(table.record_fields(record).len(), 2);
        assert!(table.is_discriminant(record, disc));
    }
}
