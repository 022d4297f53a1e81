//! Unique identifier allocation for the emitted builder program.
//!
//! Every declaration the generator writes gets a fresh identifier built from
//! a kind prefix, a sanitized hint, and a monotonic counter. The counter is
//! shared across kinds, so two identifiers never collide within one run even
//! when hints repeat.

use std::fmt;

/// The kinds of output-level declarations that receive identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Module,
    Type,
    Field,
    Property,
    Method,
    Parameter,
    LocalVariable,
    Label,
    IlProcessor,
    MemberReference,
    GenericInstance,
    Annotation,
    Temporary,
}

impl ElementKind {
    fn prefix(self) -> &'static str {
        match self {
            ElementKind::Module => "mod",
            ElementKind::Type => "cls",
            ElementKind::Field => "fld",
            ElementKind::Property => "prop",
            ElementKind::Method => "m",
            ElementKind::Parameter => "p",
            ElementKind::LocalVariable => "lv",
            ElementKind::Label => "lbl",
            ElementKind::IlProcessor => "il",
            ElementKind::MemberReference => "mr",
            ElementKind::GenericInstance => "gi",
            ElementKind::Annotation => "ca",
            ElementKind::Temporary => "tmp",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Allocates collision-free identifiers for one generation run.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next: u32,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier of `kind`, carrying `hint` for
    /// readability. Hints are sanitized to identifier characters.
    pub fn id(&mut self, kind: ElementKind, hint: &str) -> String {
        let n = self.next;
        self.next += 1;
        let hint = sanitize(hint);
        if hint.is_empty() {
            format!("{}_{}", kind.prefix(), n)
        } else {
            format!("{}_{}_{}", kind.prefix(), hint, n)
        }
    }

    /// A label identifier (`lbl_…`), the most common synthetic kind.
    pub fn label(&mut self, hint: &str) -> String {
        self.id(ElementKind::Label, hint)
    }
}

fn sanitize(hint: &str) -> String {
    hint.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_across_kinds() {
        let mut names = NameGenerator::new();
        let a = names.id(ElementKind::Method, "run");
        let b = names.id(ElementKind::Method, "run");
        let c = names.id(ElementKind::Label, "run");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_prefix_and_hint() {
        let mut names = NameGenerator::new();
        assert_eq!(names.id(ElementKind::Type, "Calculator"), "cls_Calculator_0");
        assert_eq!(names.id(ElementKind::LocalVariable, "x"), "lv_x_1");
        assert_eq!(names.label("fel"), "lbl_fel_2");
    }

    #[test]
    fn test_hint_sanitization() {
        let mut names = NameGenerator::new();
        let id = names.id(ElementKind::Method, "get_Item[0]");
        assert_eq!(id, "m_get_Item_0__0");
    }

    #[test]
    fn test_empty_hint() {
        let mut names = NameGenerator::new();
        assert_eq!(names.id(ElementKind::Temporary, ""), "tmp_0");
    }
}
