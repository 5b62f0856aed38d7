//! Pointers and points-to sets.

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

use super::heap::ObjId;
use crate::ir::{FieldId, VarId};

/// A node of the pointer flow graph.
///
/// Structurally equal pointers are interned to one [`PointerId`] by the
/// [`super::PointerFlowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pointer {
    Var(VarId),
    StaticField(FieldId),
    /// `o.f`
    InstanceField(ObjId, FieldId),
    /// All elements of array object `o`; indices are not distinguished.
    ArrayIndex(ObjId),
}

/// Interned [`Pointer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointerId(pub usize);

/// Set of abstract objects, dense over [`ObjId`].
#[derive(Debug, Clone, Default)]
pub struct PointsToSet {
    objs: FixedBitSet,
}

impl PointsToSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(obj: ObjId) -> Self {
        let mut set = Self::new();
        set.insert(obj);
        set
    }

    /// Add `obj`; returns `true` if it was absent.
    pub fn insert(&mut self, obj: ObjId) -> bool {
        if obj.0 >= self.objs.len() {
            self.objs.grow(obj.0 + 1);
        }
        !self.objs.put(obj.0)
    }

    pub fn contains(&self, obj: ObjId) -> bool {
        self.objs.contains(obj.0)
    }

    pub fn len(&self) -> usize {
        self.objs.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_clear()
    }

    /// Objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.objs.ones().map(ObjId)
    }

    /// Objects in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &PointsToSet) -> PointsToSet {
        let mut delta = self.clone();
        delta.objs.difference_with(&other.objs);
        delta
    }

    pub fn union_with(&mut self, other: &PointsToSet) {
        self.objs.union_with(&other.objs);
    }
}

impl PartialEq for PointsToSet {
    // Bit capacity may differ between equal sets.
    fn eq(&self, other: &Self) -> bool {
        self.objs.ones().eq(other.objs.ones())
    }
}

impl Eq for PointsToSet {}

impl FromIterator<ObjId> for PointsToSet {
    fn from_iter<I: IntoIterator<Item = ObjId>>(iter: I) -> Self {
        let mut set = Self::new();
        for obj in iter {
            set.insert(obj);
        }
        set
    }
}
