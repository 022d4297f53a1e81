//! The code-generation core: a per-declaration driver plus the expression
//! and statement generators it dispatches to.
//!
//! One `Generator` value is the whole generation context — emission log,
//! definition registry, identifier allocator, instantiation cache,
//! diagnostics — threaded explicitly through every call. Generation is a
//! single synchronous depth-first pass: all work for a subtree completes
//! before control returns to its caller, and the log's final order is the
//! only externally observable contract.

pub mod generics;
pub mod log;
pub mod regions;
pub mod registry;

mod expr;
mod stmt;

use self::generics::InstantiationResolver;
use self::log::EmissionLog;
use self::registry::{DefinitionRegistry, MemberKind, RegisterOutcome};
use crate::ast::{Block, FieldDecl, Member, MethodDecl, Module, ParamDecl, PropertyDecl, StmtKind, TypeDecl, TypeDeclKind};
use crate::diagnostic::Diagnostic;
use crate::naming::{ElementKind, NameGenerator};
use crate::op::Op;
use crate::sem::{SemanticModel, TypeId, TypeInfo};
use crate::spelling;
use crate::{GenError, GenOptions};

/// The generation context. Owns every mutable structure of one run.
pub struct Generator<'a> {
    module: &'a Module,
    sem: &'a SemanticModel,
    opts: GenOptions,

    pub(crate) log: EmissionLog,
    pub(crate) vars: DefinitionRegistry,
    pub(crate) names: NameGenerator,
    pub(crate) generics: InstantiationResolver,
    pub(crate) diags: Vec<Diagnostic>,

    module_var: String,
    // Per-body state, reset when a member body begins.
    pub(crate) il_var: String,
    pub(crate) method_var: String,
    /// The enclosing type declaration is a value type (struct).
    pub(crate) in_value_type: bool,
    pub(crate) in_static_body: bool,
    pub(crate) return_by_ref: bool,
    pub(crate) break_targets: Vec<String>,
}

impl<'a> Generator<'a> {
    pub fn new(module: &'a Module, sem: &'a SemanticModel, opts: GenOptions) -> Self {
        Self {
            module,
            sem,
            opts,
            log: EmissionLog::new(),
            vars: DefinitionRegistry::new(),
            names: NameGenerator::new(),
            generics: InstantiationResolver::new(),
            diags: Vec::new(),
            module_var: String::new(),
            il_var: String::new(),
            method_var: String::new(),
            in_value_type: false,
            in_static_body: true,
            return_by_ref: false,
            break_targets: Vec::new(),
        }
    }

    pub(crate) fn sem(&self) -> &'a SemanticModel {
        self.sem
    }

    pub(crate) fn opts(&self) -> &GenOptions {
        &self.opts
    }

    /// Generate the whole module. Returns the emitted program text and the
    /// diagnostics gathered along the way.
    pub fn run(mut self) -> Result<(String, Vec<Diagnostic>), GenError> {
        let module = self.module;

        self.log.emit(spelling::banner(&format!("Module: {}", module.name)));
        let module_var = self.names.id(ElementKind::Module, &module.name);
        self.log.emit(spelling::module_def(&module_var, &module.name));
        self.module_var = module_var;

        for decl in &module.types {
            self.gen_type(decl)?;
        }

        // Auxiliary annotation pass. Reaches property declarations a second
        // time; generation must not repeat (see gen_property).
        self.gen_annotations()?;

        self.log.emit(spelling::blank());
        let module_var = self.module_var.clone();
        self.log
            .emit(spelling::module_write(&module_var, &format!("{}.bin", module.name)));

        Ok((self.log.render(), self.diags))
    }

    // ─── Declarations ─────────────────────────────────────────────

    fn gen_type(&mut self, decl: &'a TypeDecl) -> Result<(), GenError> {
        let kind = match decl.kind {
            TypeDeclKind::Class => "Class",
            TypeDeclKind::Struct => "Struct",
        };
        self.log.emit(spelling::blank());
        self.log
            .emit(spelling::banner(&format!("{}: {}", kind, decl.name)));

        let type_var = self.names.id(ElementKind::Type, &decl.name);
        self.log.emit(spelling::type_def(&type_var, &decl.name, kind));
        let module_var = self.module_var.clone();
        self.log.emit(spelling::module_add_type(&module_var, &type_var));
        self.vars
            .register(MemberKind::Type, "", &decl.name, &type_var);

        for member in &decl.members {
            match member {
                Member::Field(f) => self.gen_field(decl, f)?,
                Member::Method(m) => self.gen_method(decl, m)?,
                Member::Property(p) => {
                    self.gen_property(decl, p)?;
                }
            }
        }
        Ok(())
    }

    fn gen_field(&mut self, owner: &TypeDecl, field: &FieldDecl) -> Result<(), GenError> {
        let ty = self.resolve_type(field.ty)?;
        let field_var = self.names.id(ElementKind::Field, &field.name);
        self.log.emit(spelling::blank());
        self.log
            .emit(spelling::banner(&format!("Field: {}.{}", owner.name, field.name)));
        self.log
            .emit(spelling::field_def(&field_var, &field.name, &ty, field.is_static));
        let type_var = self.type_var_of(&owner.name)?;
        self.log.emit(spelling::type_add_field(&type_var, &field_var));
        self.vars
            .register(MemberKind::Field, &owner.name, &field.name, &field_var);
        Ok(())
    }

    fn gen_method(&mut self, owner: &'a TypeDecl, method: &'a MethodDecl) -> Result<(), GenError> {
        let sig = self.param_sig(&method.params);
        let method_var = self.names.id(ElementKind::Method, &method.name);
        match self
            .vars
            .register_method(&owner.name, &method.name, &sig, &method_var)
        {
            RegisterOutcome::AlreadyProcessed => return Ok(()),
            RegisterOutcome::Registered => {}
        }

        self.log.emit(spelling::blank());
        self.log
            .emit(spelling::banner(&format!("Method: {}.{}", owner.name, method.name)));
        let return_ty = self.resolve_type(method.return_ty)?;
        self.log.emit(spelling::method_def(
            &method_var,
            &method.name,
            &return_ty,
            method.is_static,
        ));
        let type_var = self.type_var_of(&owner.name)?;
        self.log.emit(spelling::type_add_method(&type_var, &method_var));

        self.gen_member_body(
            owner,
            &method_var,
            &method.name,
            &method.params,
            method.is_static,
            method.returns_by_ref,
            method.body.as_ref(),
        )
    }

    /// Parameter declarations, scope management and statement generation
    /// shared by methods and property accessors.
    #[allow(clippy::too_many_arguments)]
    fn gen_member_body(
        &mut self,
        owner: &'a TypeDecl,
        method_var: &str,
        hint: &str,
        params: &'a [ParamDecl],
        is_static: bool,
        returns_by_ref: bool,
        body: Option<&'a Block>,
    ) -> Result<(), GenError> {
        self.vars.push_scope(MemberKind::Method, hint);

        for param in params {
            let ty = self.resolve_param_type(param)?;
            let param_var = self.names.id(ElementKind::Parameter, &param.name);
            self.log
                .emit(spelling::param_def(&param_var, &param.name, &ty));
            self.log.emit(spelling::method_add_param(method_var, &param_var));
            self.vars
                .register(MemberKind::Parameter, "", &param.name, &param_var);
        }

        if let Some(block) = body {
            let il_var = self.names.id(ElementKind::IlProcessor, hint);
            self.log.emit(spelling::il_processor(&il_var, method_var));

            self.il_var = il_var;
            self.method_var = method_var.to_string();
            self.in_value_type = matches!(owner.kind, TypeDeclKind::Struct);
            self.in_static_body = is_static;
            self.return_by_ref = returns_by_ref;
            self.generics.clear();
            self.break_targets.clear();

            self.gen_block(block)?;
            if !ends_with_return(block) {
                self.inst(Op::Ret);
            }
        }

        self.vars.pop_scope();
        Ok(())
    }

    /// Generate a property and its accessor methods. Safe to reach through
    /// more than one traversal path: a property whose accessor methods
    /// already completed is skipped and its definition identifier returned.
    fn gen_property(&mut self, owner: &'a TypeDecl, prop: &'a PropertyDecl) -> Result<String, GenError> {
        let prop_key = if prop.is_indexer { "Item" } else { prop.name.as_str() };
        let getter_name = format!("get_{}", prop_key);
        let setter_name = format!("set_{}", prop_key);
        let getter_sig = self.param_sig(&prop.index_params);
        let mut setter_params: Vec<ParamDecl> = prop.index_params.to_vec();
        setter_params.push(ParamDecl {
            name: "value".to_string(),
            ty: prop.ty,
            by_ref: false,
        });
        let setter_sig = self.param_sig(&setter_params);

        // Already processed? The accessor methods carry the truth: the
        // property definition itself is only bookkeeping around them.
        let probe = if prop.getter.is_some() {
            self.vars.lookup_method(&owner.name, &getter_name, Some(&getter_sig))
        } else {
            self.vars.lookup_method(&owner.name, &setter_name, Some(&setter_sig))
        };
        if probe.is_some() {
            if let Some(existing) = self.vars.lookup(MemberKind::Property, prop_key, Some(&owner.name)) {
                return Ok(existing.to_string());
            }
        }

        self.log.emit(spelling::blank());
        self.log
            .emit(spelling::banner(&format!("Property: {}.{}", owner.name, prop.name)));
        let ty = self.resolve_type(prop.ty)?;
        let prop_var = self.names.id(ElementKind::Property, prop_key);
        self.log.emit(spelling::property_def(&prop_var, prop_key, &ty));
        let type_var = self.type_var_of(&owner.name)?;
        self.log.emit(spelling::type_add_property(&type_var, &prop_var));
        self.vars
            .register(MemberKind::Property, &owner.name, prop_key, &prop_var);

        if let Some(getter_body) = &prop.getter {
            let method_var = self.names.id(ElementKind::Method, &getter_name);
            if self
                .vars
                .register_method(&owner.name, &getter_name, &getter_sig, &method_var)
                == RegisterOutcome::Registered
            {
                self.log.emit(spelling::blank());
                self.log.emit(spelling::method_def(&method_var, &getter_name, &ty, prop.is_static));
                self.log.emit(spelling::type_add_method(&type_var, &method_var));
                self.gen_accessor_body(owner, &method_var, &getter_name, prop, false, Some(getter_body))?;
                self.log.emit(spelling::property_set_getter(&prop_var, &method_var));
            }
        }

        if let Some(setter_body) = &prop.setter {
            let method_var = self.names.id(ElementKind::Method, &setter_name);
            if self
                .vars
                .register_method(&owner.name, &setter_name, &setter_sig, &method_var)
                == RegisterOutcome::Registered
            {
                let void_ty = self.void_spelling();
                self.log.emit(spelling::blank());
                self.log.emit(spelling::method_def(&method_var, &setter_name, &void_ty, prop.is_static));
                self.log.emit(spelling::type_add_method(&type_var, &method_var));
                self.gen_accessor_body(owner, &method_var, &setter_name, prop, true, Some(setter_body))?;
                self.log.emit(spelling::property_set_setter(&prop_var, &method_var));
            }
        }

        Ok(prop_var)
    }

    fn gen_accessor_body(
        &mut self,
        owner: &'a TypeDecl,
        method_var: &str,
        hint: &str,
        prop: &'a PropertyDecl,
        is_setter: bool,
        body: Option<&'a Block>,
    ) -> Result<(), GenError> {
        // The setter's trailing `value` parameter lives only in this call;
        // declare it inline rather than through gen_member_body's slice.
        self.vars.push_scope(MemberKind::Method, hint);

        for param in &prop.index_params {
            let ty = self.resolve_param_type(param)?;
            let param_var = self.names.id(ElementKind::Parameter, &param.name);
            self.log.emit(spelling::param_def(&param_var, &param.name, &ty));
            self.log.emit(spelling::method_add_param(method_var, &param_var));
            self.vars
                .register(MemberKind::Parameter, "", &param.name, &param_var);
        }
        if is_setter {
            let ty = self.resolve_type(prop.ty)?;
            let param_var = self.names.id(ElementKind::Parameter, "value");
            self.log.emit(spelling::param_def(&param_var, "value", &ty));
            self.log.emit(spelling::method_add_param(method_var, &param_var));
            self.vars
                .register(MemberKind::Parameter, "", "value", &param_var);
        }

        if let Some(block) = body {
            let il_var = self.names.id(ElementKind::IlProcessor, hint);
            self.log.emit(spelling::il_processor(&il_var, method_var));
            self.il_var = il_var;
            self.method_var = method_var.to_string();
            self.in_value_type = matches!(owner.kind, TypeDeclKind::Struct);
            self.in_static_body = prop.is_static;
            self.return_by_ref = false;
            self.generics.clear();
            self.break_targets.clear();

            self.gen_block(block)?;
            if !ends_with_return(block) {
                self.inst(Op::Ret);
            }
        }

        self.vars.pop_scope();
        Ok(())
    }

    /// The auxiliary pass emitting property annotations. This is the second
    /// traversal path over property declarations.
    fn gen_annotations(&mut self) -> Result<(), GenError> {
        let module = self.module;
        for decl in &module.types {
            for member in &decl.members {
                if let Member::Property(prop) = member {
                    if prop.annotations.is_empty() {
                        continue;
                    }
                    let prop_var = self.gen_property(decl, prop)?;
                    for annotation in &prop.annotations {
                        let ann_var = self.names.id(ElementKind::Annotation, annotation);
                        self.log.emit(spelling::annotation_def(&ann_var, annotation));
                        self.log.emit(spelling::add_annotation(&prop_var, &ann_var));
                    }
                }
            }
        }
        Ok(())
    }

    // ─── Shared helpers ───────────────────────────────────────────

    /// Resolve a semantic type to its output-level reference form. Types
    /// declared in this unit resolve to their registered definition
    /// identifier; everything else goes through the formatting layer.
    pub(crate) fn resolve_type(&self, ty: TypeId) -> Result<String, GenError> {
        match self.sem.type_info(ty)? {
            TypeInfo::Named { name, .. } => match self.vars.lookup(MemberKind::Type, name, None) {
                Some(var) => Ok(var.to_string()),
                None => Ok(spelling::typeref(name)),
            },
            TypeInfo::Array(inner) => Ok(spelling::typeref_array(&self.resolve_type(*inner)?)),
            TypeInfo::ByRef(inner) => Ok(spelling::typeref_by_ref(&self.resolve_type(*inner)?)),
            TypeInfo::Pointer(inner) => Ok(spelling::typeref_pointer(&self.resolve_type(*inner)?)),
            TypeInfo::GenericInst { def, args } => {
                let def = self.resolve_type(*def)?;
                let args = args
                    .iter()
                    .map(|a| self.resolve_type(*a))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(spelling::typeref_generic_inst(&def, &args))
            }
            TypeInfo::TypeParam { name } => Ok(spelling::generic_param(name)),
        }
    }

    fn resolve_param_type(&self, param: &ParamDecl) -> Result<String, GenError> {
        let ty = self.resolve_type(param.ty)?;
        Ok(if param.by_ref {
            spelling::typeref_by_ref(&ty)
        } else {
            ty
        })
    }

    pub(crate) fn param_sig(&self, params: &[ParamDecl]) -> Vec<String> {
        params
            .iter()
            .map(|p| {
                let name = self.sem.type_name(p.ty);
                if p.by_ref {
                    format!("ref {}", name)
                } else {
                    name
                }
            })
            .collect()
    }

    fn void_spelling(&self) -> String {
        spelling::typeref("Void")
    }

    fn type_var_of(&self, name: &str) -> Result<String, GenError> {
        self.vars
            .lookup(MemberKind::Type, name, None)
            .map(|s| s.to_string())
            .ok_or_else(|| GenError::MissingDefinition {
                name: name.to_string(),
            })
    }

    /// Emit an operand-less instruction through the current il processor.
    pub(crate) fn inst(&mut self, op: Op) {
        let record = spelling::instruction(&self.il_var, op, None);
        self.log.emit(record);
    }

    pub(crate) fn inst_with(&mut self, op: Op, operand: &str) {
        let record = spelling::instruction(&self.il_var, op, Some(operand));
        self.log.emit(record);
    }

    /// Create an addressable instruction without placing it.
    pub(crate) fn create_label(&mut self, hint: &str, op: Op) -> String {
        let label = self.names.label(hint);
        let record = spelling::create_instruction(&label, &self.il_var, op, None);
        self.log.emit(record);
        self.vars.register(MemberKind::Label, "", hint, &label);
        label
    }

    /// Place a previously created instruction at the current position.
    pub(crate) fn place_label(&mut self, label: &str) {
        let record = spelling::append(&self.il_var, label);
        self.log.emit(record);
    }

    /// Create an addressable instruction and place it immediately.
    pub(crate) fn append_new_label(&mut self, hint: &str, op: Op) -> String {
        let label = self.create_label(hint, op);
        self.place_label(&label);
        label
    }

    /// Declare a local variable of the current body and register it.
    pub(crate) fn add_local(&mut self, name: &str, spelled_ty: &str) -> String {
        let local_var = self.names.id(ElementKind::LocalVariable, name);
        self.log.emit(spelling::local_def(&local_var, spelled_ty));
        let method_var = self.method_var.clone();
        self.log.emit(spelling::body_add_local(&method_var, &local_var));
        self.vars
            .register(MemberKind::LocalVariable, "", name, &local_var);
        local_var
    }

    pub(crate) fn source_comment(&mut self, text: &str) {
        if self.opts.source_comments {
            self.log.emit(spelling::blank());
            self.log.emit(spelling::comment(text));
        }
    }
}

fn ends_with_return(block: &Block) -> bool {
    matches!(
        block.stmts.last().map(|s| &s.kind),
        Some(StmtKind::Return(_)) | Some(StmtKind::Throw(_))
    )
}
