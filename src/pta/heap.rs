//! Heap abstraction.
//!
//! The pointer analysis never allocates objects itself; it asks a
//! [`HeapModel`] for the abstract object of an allocation statement.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ir::{Exp, Program, Stmt, StmtRef, Type};

/// Dense identifier of an abstract object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub usize);

/// An abstract heap object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obj {
    pub id: ObjId,
    /// Allocation statement.
    pub site: StmtRef,
    /// Allocated type; drives virtual dispatch.
    pub ty: Type,
}

/// Maps allocation statements to abstract objects.
pub trait HeapModel {
    /// Abstract object of the allocation at `site`, `None` if `site` does
    /// not allocate.
    fn obj_at(&self, site: StmtRef) -> Option<ObjId>;

    fn obj(&self, id: ObjId) -> &Obj;

    fn objects(&self) -> &[Obj];
}

/// One abstract object per allocation site, no context.
#[derive(Debug, Clone, Default)]
pub struct AllocationSiteHeap {
    objs: Vec<Obj>,
    by_site: FxHashMap<StmtRef, ObjId>,
}

impl AllocationSiteHeap {
    /// Precompute the objects of every allocation statement in `program`.
    pub fn new(program: &Program) -> Self {
        let mut heap = Self::default();
        for method in program.methods() {
            for (index, stmt) in method.stmts.iter().enumerate() {
                if let Stmt::Assign { rhs: Exp::New(ty), .. } = stmt {
                    let id = ObjId(heap.objs.len());
                    let site = StmtRef::new(method.id, index);
                    heap.objs.push(Obj {
                        id,
                        site,
                        ty: ty.clone(),
                    });
                    heap.by_site.insert(site, id);
                }
            }
        }
        heap
    }
}

impl HeapModel for AllocationSiteHeap {
    fn obj_at(&self, site: StmtRef) -> Option<ObjId> {
        self.by_site.get(&site).copied()
    }

    fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.0]
    }

    fn objects(&self) -> &[Obj] {
        &self.objs
    }
}
