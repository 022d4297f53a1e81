//! The read-only semantic model handed over by the front-end.
//!
//! Resolution already happened upstream: every name, member access, call and
//! indexer in the tree is bound to a symbol here, keyed by `NodeId`. The
//! core only queries; a missing binding is an input-contract violation and
//! aborts generation (`GenError::UnresolvedSymbol`), never a user-facing
//! diagnostic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{ExprNode, NodeId};
use crate::GenError;

/// Index into `SemanticModel::types`.
pub type TypeId = u32;
/// Index into `SemanticModel::symbols`.
pub type SymbolId = u32;

// ─── Types ────────────────────────────────────────────────────────

/// Built-in types the generator must distinguish (indirect-load selection,
/// constant loading). Everything else is just a named type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialType {
    Bool,
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Object,
    Void,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Value,
    Reference,
}

/// One semantic type. By-ref, pointer, array and generic-instantiation
/// shapes wrap another entry, so the resolver can recurse structurally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TypeInfo {
    Named {
        name: String,
        kind: TypeKind,
        #[serde(default)]
        special: Option<SpecialType>,
    },
    Array(TypeId),
    ByRef(TypeId),
    Pointer(TypeId),
    GenericInst {
        def: TypeId,
        args: Vec<TypeId>,
    },
    TypeParam {
        name: String,
    },
}

// ─── Symbols ──────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
    Property,
    Method,
    Type,
}

/// One resolved declaration. Only the fields relevant to a kind are
/// populated; the rest default.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub declaring_type: Option<TypeId>,
    /// Value type for locals/parameters/fields/properties, return type for
    /// methods.
    pub ty: TypeId,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    /// By-ref binding: ref local, ref parameter, ref-returning method or
    /// ref-returning indexer/property.
    #[serde(default)]
    pub is_by_ref: bool,
    /// Declared in the unit being generated (resolvable via the registry).
    #[serde(default)]
    pub same_unit: bool,
    /// Methods: parameter types, for overload disambiguation.
    #[serde(default)]
    pub param_sig: Vec<TypeId>,
    /// Parameters: zero-based declaration ordinal.
    #[serde(default)]
    pub param_ordinal: Option<u32>,
    /// Open generic methods: generic parameter names, declaration order.
    #[serde(default)]
    pub type_params: Vec<String>,
    /// Properties: accessor method symbols.
    #[serde(default)]
    pub getter: Option<SymbolId>,
    #[serde(default)]
    pub setter: Option<SymbolId>,
    #[serde(default)]
    pub is_indexer: bool,
}

// ─── Model ────────────────────────────────────────────────────────

/// A user-defined implicit conversion required when `node` flows into a
/// sink of type `target`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversion {
    pub node: NodeId,
    pub target: TypeId,
    pub method: SymbolId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SemanticModel {
    pub symbols: Vec<Symbol>,
    pub types: Vec<TypeInfo>,
    /// Expression node → resolved symbol.
    pub bindings: HashMap<NodeId, SymbolId>,
    /// Expression node → static type.
    pub node_types: HashMap<NodeId, TypeId>,
    pub conversions: Vec<Conversion>,
}

impl SemanticModel {
    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol, GenError> {
        self.symbols
            .get(id as usize)
            .ok_or(GenError::UnknownSymbol(id))
    }

    pub fn type_info(&self, id: TypeId) -> Result<&TypeInfo, GenError> {
        self.types.get(id as usize).ok_or(GenError::UnknownType(id))
    }

    /// The symbol an expression node resolved to. Absence is fatal: the
    /// input contract guarantees resolution.
    pub fn symbol_of(&self, node: &ExprNode) -> Result<&Symbol, GenError> {
        let id = self.binding_of(node)?;
        self.symbol(id)
    }

    pub fn binding_of(&self, node: &ExprNode) -> Result<SymbolId, GenError> {
        self.bindings
            .get(&node.id)
            .copied()
            .ok_or(GenError::UnresolvedSymbol {
                line: node.span.line,
                col: node.span.col,
            })
    }

    pub fn try_symbol_of(&self, node: &ExprNode) -> Option<&Symbol> {
        let id = self.bindings.get(&node.id)?;
        self.symbols.get(*id as usize)
    }

    /// Static type of an expression node.
    pub fn type_of(&self, node: &ExprNode) -> Result<TypeId, GenError> {
        self.node_types
            .get(&node.id)
            .copied()
            .ok_or(GenError::UnresolvedSymbol {
                line: node.span.line,
                col: node.span.col,
            })
    }

    /// Implicit-conversion classification between an expression and a sink
    /// type: the user-conversion method to call, if one is required.
    pub fn classify_conversion(&self, node: NodeId, target: TypeId) -> Option<SymbolId> {
        self.conversions
            .iter()
            .find(|c| c.node == node && c.target == target)
            .map(|c| c.method)
    }

    pub fn is_value_type(&self, id: TypeId) -> bool {
        match self.types.get(id as usize) {
            Some(TypeInfo::Named { kind, .. }) => *kind == TypeKind::Value,
            Some(TypeInfo::GenericInst { def, .. }) => self.is_value_type(*def),
            _ => false,
        }
    }

    pub fn is_type_parameter(&self, id: TypeId) -> bool {
        matches!(self.types.get(id as usize), Some(TypeInfo::TypeParam { .. }))
    }

    pub fn is_by_ref_type(&self, id: TypeId) -> bool {
        matches!(self.types.get(id as usize), Some(TypeInfo::ByRef(_)))
    }

    /// Strip one by-ref wrapper, if present.
    pub fn deref_type(&self, id: TypeId) -> TypeId {
        match self.types.get(id as usize) {
            Some(TypeInfo::ByRef(inner)) => *inner,
            _ => id,
        }
    }

    pub fn special_of(&self, id: TypeId) -> Option<SpecialType> {
        match self.types.get(id as usize) {
            Some(TypeInfo::Named { special, .. }) => *special,
            Some(TypeInfo::ByRef(inner)) => self.special_of(*inner),
            _ => None,
        }
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        self.special_of(id) == Some(SpecialType::Void)
    }

    /// Human-readable type name, used for signatures and identifier hints.
    pub fn type_name(&self, id: TypeId) -> String {
        match self.types.get(id as usize) {
            Some(TypeInfo::Named { name, .. }) => name.clone(),
            Some(TypeInfo::Array(inner)) => format!("{}[]", self.type_name(*inner)),
            Some(TypeInfo::ByRef(inner)) => format!("ref {}", self.type_name(*inner)),
            Some(TypeInfo::Pointer(inner)) => format!("{}*", self.type_name(*inner)),
            Some(TypeInfo::GenericInst { def, args }) => {
                let args: Vec<String> = args.iter().map(|a| self.type_name(*a)).collect();
                format!("{}<{}>", self.type_name(*def), args.join(", "))
            }
            Some(TypeInfo::TypeParam { name }) => name.clone(),
            None => format!("?{}", id),
        }
    }

    /// Signature rendering for method registration and lookup.
    pub fn signature(&self, params: &[TypeId]) -> Vec<String> {
        params.iter().map(|p| self.type_name(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use crate::span::Span;

    fn model_with_types() -> SemanticModel {
        let mut m = SemanticModel::default();
        m.types = vec![
            TypeInfo::Named {
                name: "Int32".into(),
                kind: TypeKind::Value,
                special: Some(SpecialType::Int32),
            },
            TypeInfo::Named {
                name: "Object".into(),
                kind: TypeKind::Reference,
                special: Some(SpecialType::Object),
            },
            TypeInfo::ByRef(0),
            TypeInfo::Array(0),
            TypeInfo::GenericInst { def: 0, args: vec![1] },
            TypeInfo::TypeParam { name: "T".into() },
        ];
        m
    }

    #[test]
    fn test_type_names() {
        let m = model_with_types();
        assert_eq!(m.type_name(0), "Int32");
        assert_eq!(m.type_name(2), "ref Int32");
        assert_eq!(m.type_name(3), "Int32[]");
        assert_eq!(m.type_name(4), "Int32<Object>");
        assert_eq!(m.type_name(5), "T");
    }

    #[test]
    fn test_value_type_queries() {
        let m = model_with_types();
        assert!(m.is_value_type(0));
        assert!(!m.is_value_type(1));
        assert!(!m.is_value_type(5));
        assert!(m.is_type_parameter(5));
        assert!(m.is_by_ref_type(2));
        assert_eq!(m.deref_type(2), 0);
        assert_eq!(m.deref_type(0), 0);
    }

    #[test]
    fn test_special_through_byref() {
        let m = model_with_types();
        assert_eq!(m.special_of(2), Some(SpecialType::Int32));
    }

    #[test]
    fn test_missing_binding_is_fatal() {
        let m = model_with_types();
        let node = ExprNode {
            id: 9,
            kind: ExprKind::Name("ghost".into()),
            span: Span::new(0, 5, 3, 7),
        };
        match m.symbol_of(&node) {
            Err(GenError::UnresolvedSymbol { line, col }) => {
                assert_eq!(line, 3);
                assert_eq!(col, 7);
            }
            other => panic!("expected UnresolvedSymbol, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_conversion_classification() {
        let mut m = model_with_types();
        m.conversions.push(Conversion {
            node: 4,
            target: 1,
            method: 0,
        });
        assert_eq!(m.classify_conversion(4, 1), Some(0));
        assert_eq!(m.classify_conversion(4, 0), None);
        assert_eq!(m.classify_conversion(5, 1), None);
    }
}
