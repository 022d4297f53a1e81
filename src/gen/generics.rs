//! Generic instantiation records.
//!
//! A call to a generic method declared in the unit being generated cannot
//! reference the open definition directly: the emitted program must wrap it
//! in an instantiation construct carrying the resolved type arguments in
//! declaration order, and call that. Instantiations are cached per body so
//! repeated call sites reuse one record — a saving, not a requirement;
//! duplicate emission across bodies is permitted.

use std::collections::HashMap;

use super::log::EmissionLog;
use crate::naming::{ElementKind, NameGenerator};
use crate::sem::{SymbolId, TypeId};
use crate::spelling;

#[derive(Debug, Default)]
pub struct InstantiationResolver {
    cache: HashMap<(SymbolId, Vec<TypeId>), String>,
}

impl InstantiationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget body-local instantiations. Called when a new body begins.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Emit (or reuse) the instantiation of `method` with `type_args`.
    /// `open_target` is the output-level reference to the open declaration;
    /// `spelled_args` are the resolved type references, declaration order.
    /// Returns the identifier the call instruction uses as its operand.
    pub fn instantiate(
        &mut self,
        log: &mut EmissionLog,
        names: &mut NameGenerator,
        method: SymbolId,
        method_name: &str,
        open_target: &str,
        type_args: &[TypeId],
        spelled_args: &[String],
    ) -> String {
        let key = (method, type_args.to_vec());
        if let Some(existing) = self.cache.get(&key) {
            return existing.clone();
        }

        let open_var = names.id(ElementKind::MemberReference, method_name);
        log.emit(spelling::open_method_ref(&open_var, open_target));

        let inst_var = names.id(ElementKind::GenericInstance, method_name);
        log.emit(spelling::generic_inst_def(&inst_var, &open_var));
        for arg in spelled_args {
            log.emit(spelling::generic_inst_add_arg(&inst_var, arg));
        }

        self.cache.insert(key, inst_var.clone());
        inst_var
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn run_instantiate(
        resolver: &mut InstantiationResolver,
        log: &mut EmissionLog,
        names: &mut NameGenerator,
        args: &[TypeId],
    ) -> String {
        let spelled: Vec<String> = args.iter().map(|a| format!("typeref(\"T{}\")", a)).collect();
        resolver.instantiate(log, names, 5, "sum", "m_sum_0", args, &spelled)
    }

    #[test]
    fn test_single_call_emits_three_records() {
        let mut resolver = InstantiationResolver::new();
        let mut log = EmissionLog::new();
        let mut names = NameGenerator::new();
        let inst = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        let lines: Vec<&str> = log.iter().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("MethodRef::open(m_sum_0)"));
        assert!(lines[1].contains("GenericInst::new("));
        assert!(lines[2].contains(".type_args.add(typeref(\"T0\"))"));
        assert!(lines[2].starts_with(&inst));
    }

    #[test]
    fn test_repeated_call_reuses_instantiation() {
        let mut resolver = InstantiationResolver::new();
        let mut log = EmissionLog::new();
        let mut names = NameGenerator::new();
        let first = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        let len_after_first = log.len();
        let second = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        assert_eq!(first, second);
        assert_eq!(log.len(), len_after_first, "reuse must not emit records");
    }

    #[test]
    fn test_different_args_get_new_instantiation() {
        let mut resolver = InstantiationResolver::new();
        let mut log = EmissionLog::new();
        let mut names = NameGenerator::new();
        let a = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        let b = run_instantiate(&mut resolver, &mut log, &mut names, &[1]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_clear_allows_re_emission() {
        let mut resolver = InstantiationResolver::new();
        let mut log = EmissionLog::new();
        let mut names = NameGenerator::new();
        let a = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        resolver.clear();
        let b = run_instantiate(&mut resolver, &mut log, &mut names, &[0]);
        assert_ne!(a, b, "a new body may emit its own instantiation");
    }

    #[test]
    fn test_type_args_added_in_declaration_order() {
        let mut resolver = InstantiationResolver::new();
        let mut log = EmissionLog::new();
        let mut names = NameGenerator::new();
        run_instantiate(&mut resolver, &mut log, &mut names, &[2, 0, 1]);
        let adds: Vec<&str> = log.iter().filter(|l| l.contains(".type_args.add")).collect();
        assert_eq!(adds.len(), 3);
        assert!(adds[0].contains("T2"));
        assert!(adds[1].contains("T0"));
        assert!(adds[2].contains("T1"));
    }
}
