//! Incremental [`Program`] construction.
//!
//! The builder hands out dense ids as entities are declared and defers all
//! consistency checks to [`ProgramBuilder::build`], which validates ids and
//! jump targets and precomputes the per-variable statement indices.
//!
//! # Example
//!
//! ```
//! use brrr_flow::ir::{Exp, ProgramBuilder, Stmt, Type};
//!
//! let mut builder = ProgramBuilder::new();
//! let main_class = builder.add_class("Main", None, &[]);
//! let main = builder.add_method(main_class, "void main()", true);
//! let x = builder.add_var(main, "x", Type::Int);
//! builder.push_stmt(main, Stmt::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
//! builder.set_entry(main);
//!
//! let program = builder.build().unwrap();
//! assert_eq!(program.method(main).stmts.len(), 1);
//! ```

use rustc_hash::FxHashMap;

use super::{
    Class, ClassHierarchy, ClassId, Exp, Field, FieldId, Method, MethodId, Program, Stmt,
    StmtRef, Type, Var, VarId, VarRelatedStmts,
};
use crate::error::{FlowError, Result};

/// Builder for [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    classes: Vec<Class>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    fields: Vec<Field>,
    entry: Option<MethodId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a concrete class.
    pub fn add_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        interfaces: &[ClassId],
    ) -> ClassId {
        self.push_class(name, superclass, interfaces, false, false)
    }

    /// Declare an abstract class.
    pub fn add_abstract_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        interfaces: &[ClassId],
    ) -> ClassId {
        self.push_class(name, superclass, interfaces, false, true)
    }

    /// Declare an interface extending `superinterfaces`.
    pub fn add_interface(&mut self, name: &str, superinterfaces: &[ClassId]) -> ClassId {
        self.push_class(name, None, superinterfaces, true, true)
    }

    fn push_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        interfaces: &[ClassId],
        is_interface: bool,
        is_abstract: bool,
    ) -> ClassId {
        let id = ClassId(self.classes.len());
        self.classes.push(Class {
            id,
            name: name.to_string(),
            superclass,
            interfaces: interfaces.to_vec(),
            is_interface,
            is_abstract,
            methods: FxHashMap::default(),
        });
        id
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type, is_static: bool) -> FieldId {
        let id = FieldId(self.fields.len());
        self.fields.push(Field {
            id,
            name: name.to_string(),
            class,
            ty,
            is_static,
        });
        id
    }

    /// Declare a method with a body. Instance methods get a `this` variable.
    ///
    /// `subsignature` is the dispatch key, e.g. `"int get(int)"`; the simple
    /// name is the identifier in front of the parameter list.
    pub fn add_method(&mut self, class: ClassId, subsignature: &str, is_static: bool) -> MethodId {
        self.push_method(class, subsignature, is_static, false)
    }

    /// Declare an abstract (or interface) method without a body.
    pub fn add_abstract_method(&mut self, class: ClassId, subsignature: &str) -> MethodId {
        self.push_method(class, subsignature, false, true)
    }

    fn push_method(
        &mut self,
        class: ClassId,
        subsignature: &str,
        is_static: bool,
        is_abstract: bool,
    ) -> MethodId {
        let id = MethodId(self.methods.len());
        let name = simple_name(subsignature);
        self.methods.push(Method {
            id,
            name,
            class,
            subsignature: subsignature.to_string(),
            is_static,
            is_abstract,
            params: Vec::new(),
            this: None,
            stmts: Vec::new(),
            return_vars: Vec::new(),
        });
        if !is_static {
            let this = self.add_var(id, "this", Type::Class(class));
            self.methods[id.0].this = Some(this);
        }
        id
    }

    pub fn add_var(&mut self, method: MethodId, name: &str, ty: Type) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(Var {
            id,
            name: name.to_string(),
            ty,
            method,
        });
        id
    }

    /// Declare a formal parameter of `method` (appended in order).
    pub fn add_param(&mut self, method: MethodId, name: &str, ty: Type) -> VarId {
        let var = self.add_var(method, name, ty);
        self.methods[method.0].params.push(var);
        var
    }

    /// The `this` variable of an instance method.
    pub fn this_var(&self, method: MethodId) -> Option<VarId> {
        self.methods.get(method.0).and_then(|m| m.this)
    }

    /// Append a statement; returns its program index.
    pub fn push_stmt(&mut self, method: MethodId, stmt: Stmt) -> usize {
        let stmts = &mut self.methods[method.0].stmts;
        stmts.push(stmt);
        stmts.len() - 1
    }

    /// Program index the next pushed statement of `method` will get.
    pub fn next_index(&self, method: MethodId) -> usize {
        self.methods[method.0].stmts.len()
    }

    /// Overwrite an already pushed statement (used to patch forward jumps).
    pub fn set_stmt(&mut self, method: MethodId, index: usize, stmt: Stmt) {
        self.methods[method.0].stmts[index] = stmt;
    }

    pub fn set_entry(&mut self, method: MethodId) {
        self.entry = Some(method);
    }

    /// Validate and freeze the program.
    ///
    /// # Errors
    ///
    /// Returns an error when a statement refers to an undeclared entity or a
    /// variable of another method, when a jump leaves the method body, or when
    /// a class declares two methods with the same subsignature.
    pub fn build(mut self) -> Result<Program> {
        if let Some(entry) = self.entry {
            if entry.0 >= self.methods.len() {
                return Err(FlowError::UnknownMethod(entry));
            }
        }

        for method in &self.methods {
            let class = self
                .classes
                .get_mut(method.class.0)
                .ok_or(FlowError::UnknownClass(method.class))?;
            if class
                .methods
                .insert(method.subsignature.clone(), method.id)
                .is_some()
            {
                return Err(FlowError::DuplicateMethod {
                    class: class.name.clone(),
                    subsignature: method.subsignature.clone(),
                });
            }
        }

        for class in &self.classes {
            for parent in class.superclass.iter().chain(class.interfaces.iter()) {
                if parent.0 >= self.classes.len() {
                    return Err(FlowError::UnknownClass(*parent));
                }
            }
        }

        for method in &self.methods {
            self.validate_method(method)?;
        }

        let mut related = vec![VarRelatedStmts::default(); self.vars.len()];
        for method in &mut self.methods {
            method.return_vars = method
                .stmts
                .iter()
                .filter_map(|s| match s {
                    Stmt::Return { value } => *value,
                    _ => None,
                })
                .collect();

            for (index, stmt) in method.stmts.iter().enumerate() {
                let at = StmtRef::new(method.id, index);
                match stmt {
                    Stmt::Assign {
                        rhs: Exp::InstanceField { base, .. },
                        ..
                    } => related[base.0].load_fields.push(at),
                    Stmt::Assign {
                        rhs: Exp::ArrayAccess { base, .. },
                        ..
                    } => related[base.0].load_arrays.push(at),
                    Stmt::StoreField {
                        base: Some(base), ..
                    } => related[base.0].store_fields.push(at),
                    Stmt::StoreArray { base, .. } => related[base.0].store_arrays.push(at),
                    Stmt::Invoke(invoke) => {
                        if let Some(receiver) = invoke.receiver {
                            related[receiver.0].invokes.push(at);
                        }
                    }
                    _ => {}
                }
            }
        }

        let hierarchy = ClassHierarchy::new(&self.classes);
        Ok(Program {
            classes: self.classes,
            methods: self.methods,
            vars: self.vars,
            fields: self.fields,
            entry: self.entry,
            related,
            hierarchy,
        })
    }

    fn validate_method(&self, method: &Method) -> Result<()> {
        let check_var = |var: VarId| -> Result<()> {
            let decl = self.vars.get(var.0).ok_or(FlowError::UnknownVar(var))?;
            if decl.method != method.id {
                return Err(FlowError::ForeignVar {
                    var,
                    owner: decl.method,
                    method: method.id,
                });
            }
            Ok(())
        };
        let check_field = |field: FieldId| -> Result<()> {
            if field.0 >= self.fields.len() {
                return Err(FlowError::UnknownField(field));
            }
            Ok(())
        };
        let check_type = |ty: &Type| -> Result<()> {
            let mut ty = ty;
            while let Type::Array(elem) = ty {
                ty = elem;
            }
            match ty {
                Type::Class(c) if c.0 >= self.classes.len() => Err(FlowError::UnknownClass(*c)),
                _ => Ok(()),
            }
        };

        for var in method.params.iter().chain(method.this.iter()) {
            check_var(*var)?;
        }

        let len = method.stmts.len();
        for (index, stmt) in method.stmts.iter().enumerate() {
            for var in stmt.uses().into_iter().chain(stmt.def()) {
                check_var(var)?;
            }
            for target in stmt.jump_targets() {
                if target >= len {
                    return Err(FlowError::JumpOutOfRange {
                        method: method.subsignature.clone(),
                        target,
                        len,
                    });
                }
            }
            match stmt {
                Stmt::Assign { rhs, .. } => match rhs {
                    Exp::InstanceField { field, .. } | Exp::StaticField(field) => {
                        check_field(*field)?
                    }
                    Exp::New(ty) | Exp::Cast { ty, .. } => check_type(ty)?,
                    _ => {}
                },
                Stmt::StoreField { field, .. } => check_field(*field)?,
                Stmt::Invoke(invoke) => {
                    if invoke.method_ref.class.0 >= self.classes.len() {
                        return Err(FlowError::UnknownClass(invoke.method_ref.class));
                    }
                    if let Some(needed) = invoke.kind.needs_receiver() {
                        if needed != invoke.receiver.is_some() {
                            return Err(FlowError::ReceiverMismatch {
                                method: method.subsignature.clone(),
                                index,
                                kind: invoke.kind,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// `"int get(int)"` -> `"get"`.
fn simple_name(subsignature: &str) -> String {
    let head = subsignature.split('(').next().unwrap_or(subsignature);
    head.rsplit(' ').next().unwrap_or(head).trim().to_string()
}
