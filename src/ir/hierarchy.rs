//! Class hierarchy queries: subtypes, dispatch and callee resolution.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::{Class, ClassId, Invoke, MethodId, MethodRef, Program, Type};
use crate::callgraph::CallKind;

/// Direct-subtype indices over the classes of a [`Program`].
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    /// Class -> classes naming it as superclass.
    direct_subclasses: Vec<Vec<ClassId>>,
    /// Interface -> classes implementing it directly.
    direct_implementors: Vec<Vec<ClassId>>,
    /// Interface -> interfaces extending it directly.
    direct_subinterfaces: Vec<Vec<ClassId>>,
}

impl ClassHierarchy {
    pub(crate) fn new(classes: &[Class]) -> Self {
        let n = classes.len();
        let mut hierarchy = Self {
            direct_subclasses: vec![Vec::new(); n],
            direct_implementors: vec![Vec::new(); n],
            direct_subinterfaces: vec![Vec::new(); n],
        };
        for class in classes {
            if let Some(superclass) = class.superclass {
                hierarchy.direct_subclasses[superclass.0].push(class.id);
            }
            for iface in &class.interfaces {
                if class.is_interface {
                    hierarchy.direct_subinterfaces[iface.0].push(class.id);
                } else {
                    hierarchy.direct_implementors[iface.0].push(class.id);
                }
            }
        }
        hierarchy
    }

    pub fn direct_subclasses(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subclasses[class.0]
    }

    pub fn direct_implementors(&self, iface: ClassId) -> &[ClassId] {
        &self.direct_implementors[iface.0]
    }

    pub fn direct_subinterfaces(&self, iface: ClassId) -> &[ClassId] {
        &self.direct_subinterfaces[iface.0]
    }

    /// All subtypes of `class`, including itself, in discovery order.
    pub fn subtypes(&self, class: ClassId) -> Vec<ClassId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![class];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            order.push(c);
            stack.extend(self.direct_subclasses[c.0].iter().rev());
            stack.extend(self.direct_implementors[c.0].iter().rev());
            stack.extend(self.direct_subinterfaces[c.0].iter().rev());
        }
        order
    }
}

impl Program {
    /// Find the concrete method `subsignature` resolves to on `class`,
    /// searching `class` and then its superclasses.
    pub fn dispatch(&self, class: ClassId, subsignature: &str) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(c) = current {
            let decl = self.class(c);
            if let Some(&m) = decl.methods.get(subsignature) {
                if !self.method(m).is_abstract {
                    return Some(m);
                }
            }
            current = decl.superclass;
        }
        None
    }

    /// Resolve a method reference to its declaration, searching superclasses
    /// and then superinterfaces. Abstract declarations are returned as is.
    pub fn resolve_method_ref(&self, method_ref: &MethodRef) -> Option<MethodId> {
        let mut current = Some(method_ref.class);
        while let Some(c) = current {
            let decl = self.class(c);
            if let Some(&m) = decl.methods.get(&method_ref.subsignature) {
                return Some(m);
            }
            current = decl.superclass;
        }
        let mut stack = self.class(method_ref.class).interfaces.clone();
        let mut seen = FxHashSet::default();
        while let Some(iface) = stack.pop() {
            if !seen.insert(iface) {
                continue;
            }
            let decl = self.class(iface);
            if let Some(&m) = decl.methods.get(&method_ref.subsignature) {
                return Some(m);
            }
            stack.extend(decl.interfaces.iter().copied());
        }
        None
    }

    /// Resolve the unique callee of `invoke` given the receiver's concrete type.
    ///
    /// Static and special calls resolve the declared reference and ignore the
    /// receiver type. Virtual and interface calls dispatch on the concrete
    /// class of the receiver object. Dynamic calls are not resolvable.
    ///
    /// Arrays have no declared class, so a virtual or interface call on an
    /// array-typed receiver object (`clone`, `hashCode`, ...) resolves to
    /// `None` and contributes no call edge.
    pub fn resolve_callee(&self, receiver_type: Option<&Type>, invoke: &Invoke) -> Option<MethodId> {
        match invoke.kind {
            CallKind::Static | CallKind::Special => self
                .resolve_method_ref(&invoke.method_ref)
                .filter(|m| !self.method(*m).is_abstract),
            CallKind::Virtual | CallKind::Interface => match receiver_type {
                Some(Type::Class(class)) => self.dispatch(*class, &invoke.method_ref.subsignature),
                Some(ty @ Type::Array(_)) => {
                    debug!(
                        receiver = ?ty,
                        subsignature = %invoke.method_ref.subsignature,
                        "no dispatch target on array receiver"
                    );
                    None
                }
                _ => None,
            },
            CallKind::Dynamic => None,
        }
    }

    /// All concrete targets a call site may reach under class hierarchy analysis.
    pub fn resolve_cha(&self, invoke: &Invoke) -> Vec<MethodId> {
        match invoke.kind {
            CallKind::Static => self.resolve_callee(None, invoke).into_iter().collect(),
            CallKind::Special => self
                .dispatch(invoke.method_ref.class, &invoke.method_ref.subsignature)
                .into_iter()
                .collect(),
            CallKind::Virtual | CallKind::Interface => {
                let mut targets = Vec::new();
                for class in self.hierarchy.subtypes(invoke.method_ref.class) {
                    let decl = self.class(class);
                    if decl.is_interface || decl.is_abstract {
                        continue;
                    }
                    if let Some(m) = self.dispatch(class, &invoke.method_ref.subsignature) {
                        if !targets.contains(&m) {
                            targets.push(m);
                        }
                    }
                }
                targets
            }
            CallKind::Dynamic => Vec::new(),
        }
    }
}
