//! The formatting layer: every statement of the emitted builder program is
//! spelled here, and only here.
//!
//! The generator decides *which* records exist and in *what order*; this
//! module owns the concrete text. Changing an output convention is a local
//! edit — no generator logic refers to the spellings.

use crate::op::Op;

// ─── Comments ─────────────────────────────────────────────────────

pub fn comment(text: &str) -> String {
    format!("// {}", text)
}

pub fn banner(text: &str) -> String {
    format!("// ** {} **", text)
}

pub fn blank() -> String {
    String::new()
}

/// Inline marker for a construct the generator does not translate.
pub fn unsupported(kind: &str, line: u32, col: u32, summary: &str) -> String {
    format!(
        "/* '{}' construct is not supported at {},{}: {} */",
        kind, line, col, summary
    )
}

// ─── Declarations ─────────────────────────────────────────────────

pub fn module_def(var: &str, name: &str) -> String {
    format!("let {} = ModuleDef::new({:?});", var, name)
}

pub fn module_add_type(module_var: &str, type_var: &str) -> String {
    format!("{}.types.add({});", module_var, type_var)
}

pub fn module_write(module_var: &str, file: &str) -> String {
    format!("{}.write({:?});", module_var, file)
}

pub fn type_def(var: &str, name: &str, kind: &str) -> String {
    format!("let {} = TypeDef::new({:?}, TypeKind::{});", var, name, kind)
}

pub fn field_def(var: &str, name: &str, ty: &str, is_static: bool) -> String {
    format!(
        "let {} = FieldDef::new({:?}, {}, {});",
        var,
        name,
        ty,
        scope(is_static)
    )
}

pub fn type_add_field(type_var: &str, field_var: &str) -> String {
    format!("{}.fields.add({});", type_var, field_var)
}

pub fn method_def(var: &str, name: &str, return_ty: &str, is_static: bool) -> String {
    format!(
        "let {} = MethodDef::new({:?}, {}, {});",
        var,
        name,
        return_ty,
        scope(is_static)
    )
}

pub fn type_add_method(type_var: &str, method_var: &str) -> String {
    format!("{}.methods.add({});", type_var, method_var)
}

pub fn param_def(var: &str, name: &str, ty: &str) -> String {
    format!("let {} = ParamDef::new({:?}, {});", var, name, ty)
}

pub fn method_add_param(method_var: &str, param_var: &str) -> String {
    format!("{}.params.add({});", method_var, param_var)
}

pub fn property_def(var: &str, name: &str, ty: &str) -> String {
    format!("let {} = PropertyDef::new({:?}, {});", var, name, ty)
}

pub fn type_add_property(type_var: &str, prop_var: &str) -> String {
    format!("{}.properties.add({});", type_var, prop_var)
}

pub fn property_set_getter(prop_var: &str, method_var: &str) -> String {
    format!("{}.getter = {};", prop_var, method_var)
}

pub fn property_set_setter(prop_var: &str, method_var: &str) -> String {
    format!("{}.setter = {};", prop_var, method_var)
}

pub fn local_def(var: &str, ty: &str) -> String {
    format!("let {} = LocalVar::new({});", var, ty)
}

pub fn body_add_local(method_var: &str, local_var: &str) -> String {
    format!("{}.body.locals.add({});", method_var, local_var)
}

pub fn il_processor(var: &str, method_var: &str) -> String {
    format!("let {} = {}.body.il();", var, method_var)
}

pub fn annotation_def(var: &str, name: &str) -> String {
    format!("let {} = Annotation::new({:?});", var, name)
}

pub fn add_annotation(target_var: &str, annotation_var: &str) -> String {
    format!("{}.annotations.add({});", target_var, annotation_var)
}

// ─── Instructions ─────────────────────────────────────────────────

pub fn instruction(il_var: &str, op: Op, operand: Option<&str>) -> String {
    match operand {
        Some(operand) => format!("{}.emit(Op::{}, {});", il_var, op, operand),
        None => format!("{}.emit(Op::{});", il_var, op),
    }
}

/// A created-but-unplaced instruction, addressable as a branch target.
pub fn create_instruction(label_var: &str, il_var: &str, op: Op, operand: Option<&str>) -> String {
    match operand {
        Some(operand) => format!("let {} = {}.create(Op::{}, {});", label_var, il_var, op, operand),
        None => format!("let {} = {}.create(Op::{});", label_var, il_var, op),
    }
}

pub fn append(il_var: &str, label_var: &str) -> String {
    format!("{}.append({});", il_var, label_var)
}

// ─── Exception regions ────────────────────────────────────────────

pub fn region_catch(
    method_var: &str,
    catch_type: &str,
    try_start: &str,
    try_end: &str,
    handler_start: &str,
    handler_end: &str,
) -> String {
    format!(
        "{}.body.regions.add(Region::catch({}, {}, {}, {}, {}));",
        method_var, catch_type, try_start, try_end, handler_start, handler_end
    )
}

pub fn region_finally(
    method_var: &str,
    try_start: &str,
    try_end: &str,
    handler_start: &str,
    handler_end: &str,
) -> String {
    format!(
        "{}.body.regions.add(Region::finally({}, {}, {}, {}));",
        method_var, try_start, try_end, handler_start, handler_end
    )
}

// ─── References ───────────────────────────────────────────────────

/// Reference to a type not declared in this unit.
pub fn typeref(name: &str) -> String {
    format!("typeref({:?})", name)
}

pub fn typeref_by_ref(inner: &str) -> String {
    format!("{}.by_ref()", inner)
}

pub fn typeref_pointer(inner: &str) -> String {
    format!("{}.ptr()", inner)
}

pub fn typeref_array(inner: &str) -> String {
    format!("{}.array()", inner)
}

pub fn typeref_generic_inst(def: &str, args: &[String]) -> String {
    format!("{}.of({})", def, args.join(", "))
}

pub fn generic_param(name: &str) -> String {
    format!("generic_param({:?})", name)
}

/// Reference to a method not resolvable through the registry.
pub fn method_ref(owner: &str, name: &str) -> String {
    format!("method_ref({:?}, {:?})", owner, name)
}

pub fn field_ref(owner: &str, name: &str) -> String {
    format!("field_ref({:?}, {:?})", owner, name)
}

pub fn ctor_ref(ty: &str) -> String {
    format!("ctor_ref({})", ty)
}

/// Open-method reference line for a generic instantiation.
pub fn open_method_ref(var: &str, target: &str) -> String {
    format!("let {} = MethodRef::open({});", var, target)
}

pub fn generic_inst_def(var: &str, open_ref_var: &str) -> String {
    format!("let {} = GenericInst::new({});", var, open_ref_var)
}

pub fn generic_inst_add_arg(inst_var: &str, ty: &str) -> String {
    format!("{}.type_args.add({});", inst_var, ty)
}

// ─── Operands ─────────────────────────────────────────────────────

pub fn int_operand(value: i64) -> String {
    value.to_string()
}

pub fn str_operand(value: &str) -> String {
    format!("{:?}", value)
}

fn scope(is_static: bool) -> &'static str {
    if is_static {
        "Scope::Static"
    } else {
        "Scope::Instance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_spelling() {
        assert_eq!(
            instruction("il_run_3", Op::Stloc, Some("lv_x_4")),
            "il_run_3.emit(Op::Stloc, lv_x_4);"
        );
        assert_eq!(instruction("il_run_3", Op::Ret, None), "il_run_3.emit(Op::Ret);");
    }

    #[test]
    fn test_create_and_append() {
        assert_eq!(
            create_instruction("lbl_fel_7", "il_run_3", Op::Nop, None),
            "let lbl_fel_7 = il_run_3.create(Op::Nop);"
        );
        assert_eq!(append("il_run_3", "lbl_fel_7"), "il_run_3.append(lbl_fel_7);");
    }

    #[test]
    fn test_typeref_shapes() {
        let base = typeref("Int32");
        assert_eq!(base, "typeref(\"Int32\")");
        assert_eq!(typeref_by_ref(&base), "typeref(\"Int32\").by_ref()");
        assert_eq!(typeref_array(&base), "typeref(\"Int32\").array()");
        assert_eq!(
            typeref_generic_inst(&typeref("List"), &[base.clone()]),
            "typeref(\"List\").of(typeref(\"Int32\"))"
        );
    }

    #[test]
    fn test_region_spellings() {
        let catch = region_catch("m_run_1", "typeref(\"Oops\")", "a", "b", "c", "d");
        assert_eq!(
            catch,
            "m_run_1.body.regions.add(Region::catch(typeref(\"Oops\"), a, b, c, d));"
        );
        let fin = region_finally("m_run_1", "a", "b", "c", "d");
        assert_eq!(fin, "m_run_1.body.regions.add(Region::finally(a, b, c, d));");
    }

    #[test]
    fn test_unsupported_marker() {
        assert_eq!(
            unsupported("while", 4, 9, "while (i < n)"),
            "/* 'while' construct is not supported at 4,9: while (i < n) */"
        );
    }
}
