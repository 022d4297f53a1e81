//! The scoped definition registry: maps what the source program declares to
//! the identifiers the emitted program declares for them.
//!
//! Member-level definitions (types, fields, properties, methods, module
//! references) are visible from any nested scope and resolve by kind, name,
//! owner type and — for methods — parameter signature. Locals, parameters
//! and labels live in the scope of one body and resolve only in the
//! innermost scope; there is no implicit outward shadowing for them.

/// Declaration kinds a definition identifier can be registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Type,
    Method,
    Field,
    Property,
    Parameter,
    LocalVariable,
    Label,
    ModuleReference,
}

impl MemberKind {
    fn is_scoped(self) -> bool {
        matches!(
            self,
            MemberKind::Parameter | MemberKind::LocalVariable | MemberKind::Label
        )
    }
}

/// Outcome of a method registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// The same (owner, name, signature) completed earlier; the caller must
    /// skip duplicate generation.
    AlreadyProcessed,
}

#[derive(Clone, Debug)]
struct Binding {
    kind: MemberKind,
    owner: String,
    name: String,
    id: String,
}

#[derive(Clone, Debug)]
struct MethodBinding {
    owner: String,
    name: String,
    sig: Vec<String>,
    id: String,
}

#[derive(Debug)]
struct Scope {
    #[allow(dead_code)]
    owner_kind: MemberKind,
    #[allow(dead_code)]
    owner_name: String,
    bindings: Vec<Binding>,
}

#[derive(Debug)]
pub struct DefinitionRegistry {
    members: Vec<Binding>,
    methods: Vec<MethodBinding>,
    scopes: Vec<Scope>,
    last: Vec<(MemberKind, String)>,
}

impl Default for DefinitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            methods: Vec::new(),
            scopes: vec![Scope {
                owner_kind: MemberKind::ModuleReference,
                owner_name: String::new(),
                bindings: Vec::new(),
            }],
            last: Vec::new(),
        }
    }

    /// Enter the body of `owner_name` (a method, accessor, lambda or local
    /// function). Locals, parameters and labels registered afterwards die
    /// with the matching `pop_scope`.
    pub fn push_scope(&mut self, owner_kind: MemberKind, owner_name: &str) {
        self.scopes.push(Scope {
            owner_kind,
            owner_name: owner_name.to_string(),
            bindings: Vec::new(),
        });
    }

    pub fn pop_scope(&mut self) {
        // The root scope survives so module-level registrations always have
        // a home.
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Register a non-method definition under (kind, owner, name).
    pub fn register(&mut self, kind: MemberKind, owner: &str, name: &str, id: &str) {
        let binding = Binding {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            id: id.to_string(),
        };
        if kind.is_scoped() {
            self.scopes
                .last_mut()
                .expect("registry always has a root scope")
                .bindings
                .push(binding);
        } else {
            self.members.push(binding);
        }
        self.remember_last(kind, id);
    }

    /// Register a method under (owner, name, parameter signature). Reports
    /// `AlreadyProcessed` when that exact method completed earlier, so
    /// callers reached through a second traversal path skip regeneration.
    pub fn register_method(
        &mut self,
        owner: &str,
        name: &str,
        sig: &[String],
        id: &str,
    ) -> RegisterOutcome {
        if self.lookup_method(owner, name, Some(sig)).is_some() {
            return RegisterOutcome::AlreadyProcessed;
        }
        self.methods.push(MethodBinding {
            owner: owner.to_string(),
            name: name.to_string(),
            sig: sig.to_vec(),
            id: id.to_string(),
        });
        self.remember_last(MemberKind::Method, id);
        RegisterOutcome::Registered
    }

    /// Resolve (kind, name, owner). Scoped kinds consult only the innermost
    /// scope; member kinds search all registrations, newest first.
    pub fn lookup(&self, kind: MemberKind, name: &str, owner: Option<&str>) -> Option<&str> {
        let matches = |b: &Binding| {
            b.kind == kind && b.name == name && owner.map(|o| b.owner == o).unwrap_or(true)
        };
        if kind.is_scoped() {
            let scope = self.scopes.last()?;
            scope
                .bindings
                .iter()
                .rev()
                .find(|b| matches(b))
                .map(|b| b.id.as_str())
        } else {
            self.members
                .iter()
                .rev()
                .find(|b| matches(b))
                .map(|b| b.id.as_str())
        }
    }

    /// Resolve a method by owner, name and (optionally) signature.
    pub fn lookup_method(&self, owner: &str, name: &str, sig: Option<&[String]>) -> Option<&str> {
        self.methods
            .iter()
            .rev()
            .find(|m| {
                m.owner == owner
                    && m.name == name
                    && sig.map(|s| m.sig.as_slice() == s).unwrap_or(true)
            })
            .map(|m| m.id.as_str())
    }

    /// The most recently registered identifier of `kind` — the enclosing
    /// type or method while its members are being generated.
    pub fn last_of(&self, kind: MemberKind) -> Option<&str> {
        self.last
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
    }

    fn remember_last(&mut self, kind: MemberKind, id: &str) {
        self.last.push((kind, id.to_string()));
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_member_lookup_by_owner() {
        let mut reg = DefinitionRegistry::new();
        reg.register(MemberKind::Field, "Calculator", "total", "fld_total_0");
        reg.register(MemberKind::Field, "Display", "total", "fld_total_1");
        assert_eq!(
            reg.lookup(MemberKind::Field, "total", Some("Calculator")),
            Some("fld_total_0")
        );
        assert_eq!(
            reg.lookup(MemberKind::Field, "total", Some("Display")),
            Some("fld_total_1")
        );
        assert_eq!(reg.lookup(MemberKind::Field, "missing", None), None);
    }

    #[test]
    fn test_locals_die_with_scope() {
        let mut reg = DefinitionRegistry::new();
        reg.push_scope(MemberKind::Method, "run");
        reg.register(MemberKind::LocalVariable, "", "x", "lv_x_0");
        assert_eq!(reg.lookup(MemberKind::LocalVariable, "x", None), Some("lv_x_0"));
        reg.pop_scope();
        assert_eq!(reg.lookup(MemberKind::LocalVariable, "x", None), None);
    }

    #[test]
    fn test_locals_do_not_resolve_from_outer_scope() {
        let mut reg = DefinitionRegistry::new();
        reg.push_scope(MemberKind::Method, "outer");
        reg.register(MemberKind::LocalVariable, "", "x", "lv_x_outer");
        reg.push_scope(MemberKind::Method, "lambda");
        // Innermost scope only: the outer local must not leak in.
        assert_eq!(reg.lookup(MemberKind::LocalVariable, "x", None), None);
        reg.pop_scope();
        assert_eq!(reg.lookup(MemberKind::LocalVariable, "x", None), Some("lv_x_outer"));
    }

    #[test]
    fn test_members_resolve_from_nested_scopes() {
        let mut reg = DefinitionRegistry::new();
        reg.register(MemberKind::Field, "Calculator", "total", "fld_total_0");
        reg.push_scope(MemberKind::Method, "run");
        reg.push_scope(MemberKind::Method, "localfn");
        assert_eq!(
            reg.lookup(MemberKind::Field, "total", Some("Calculator")),
            Some("fld_total_0")
        );
    }

    #[test]
    fn test_method_signature_disambiguation() {
        let mut reg = DefinitionRegistry::new();
        reg.register_method("Calculator", "add", &sig(&["Int32"]), "m_add_0");
        reg.register_method("Calculator", "add", &sig(&["Int32", "Int32"]), "m_add_1");
        assert_eq!(
            reg.lookup_method("Calculator", "add", Some(&sig(&["Int32"]))),
            Some("m_add_0")
        );
        assert_eq!(
            reg.lookup_method("Calculator", "add", Some(&sig(&["Int32", "Int32"]))),
            Some("m_add_1")
        );
        assert_eq!(
            reg.lookup_method("Calculator", "add", Some(&sig(&["Float64"]))),
            None
        );
    }

    #[test]
    fn test_duplicate_method_reports_already_processed() {
        let mut reg = DefinitionRegistry::new();
        let first = reg.register_method("Point", "get_X", &[], "m_get_X_0");
        assert_eq!(first, RegisterOutcome::Registered);
        let second = reg.register_method("Point", "get_X", &[], "m_get_X_9");
        assert_eq!(second, RegisterOutcome::AlreadyProcessed);
        // The original identifier survives.
        assert_eq!(reg.lookup_method("Point", "get_X", Some(&[])), Some("m_get_X_0"));
    }

    #[test]
    fn test_last_of_tracks_enclosing_declaration() {
        let mut reg = DefinitionRegistry::new();
        reg.register(MemberKind::Type, "", "Calculator", "cls_Calculator_0");
        reg.register_method("Calculator", "run", &[], "m_run_1");
        assert_eq!(reg.last_of(MemberKind::Type), Some("cls_Calculator_0"));
        assert_eq!(reg.last_of(MemberKind::Method), Some("m_run_1"));
        assert_eq!(reg.last_of(MemberKind::Property), None);
    }
}
