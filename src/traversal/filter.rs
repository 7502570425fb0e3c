use smallvec::SmallVec;

use crate::types::TypeId;

/// Predicate over relationship types.
pub trait TypeFilter {
    /// Returns true if relationships of type `ty` should be produced.
    fn accept(&self, ty: TypeId) -> bool;
}

impl<F> TypeFilter for F
where
    F: Fn(TypeId) -> bool,
{
    fn accept(&self, ty: TypeId) -> bool {
        self(ty)
    }
}

/// Accepts every type.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyType;

impl TypeFilter for AnyType {
    fn accept(&self, _ty: TypeId) -> bool {
        true
    }
}

impl TypeFilter for TypeId {
    fn accept(&self, ty: TypeId) -> bool {
        *self == ty
    }
}

/// Accepts a small, fixed set of types.
#[derive(Clone, Debug, Default)]
pub struct TypeSet {
    types: SmallVec<[TypeId; 4]>,
}

impl TypeSet {
    /// Set containing `types`, duplicates removed.
    pub fn new(types: impl IntoIterator<Item = TypeId>) -> Self {
        let mut set: SmallVec<[TypeId; 4]> = types.into_iter().collect();
        set.sort_unstable();
        set.dedup();
        Self { types: set }
    }

    /// Number of distinct types in the set.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the set accepts nothing.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<TypeId> for TypeSet {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl TypeFilter for TypeSet {
    fn accept(&self, ty: TypeId) -> bool {
        self.types.binary_search(&ty).is_ok()
    }
}
