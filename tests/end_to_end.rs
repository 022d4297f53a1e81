use ilify::ast::*;
use ilify::diagnostic::Severity;
use ilify::sem::*;
use ilify::span::Span;
use ilify::{generate, generate_with_options, CompilationInput, GenOptions};

const INT: TypeId = 0;
const VOID: TypeId = 1;

struct Builder {
    model: SemanticModel,
    next_node: NodeId,
}

impl Builder {
    fn new() -> Self {
        let mut model = SemanticModel::default();
        model.types = vec![
            TypeInfo::Named {
                name: "Int32".into(),
                kind: TypeKind::Value,
                special: Some(SpecialType::Int32),
            },
            TypeInfo::Named {
                name: "Void".into(),
                kind: TypeKind::Value,
                special: Some(SpecialType::Void),
            },
        ];
        Self {
            model,
            next_node: 0,
        }
    }

    fn named_ref(&mut self, name: &str) -> TypeId {
        self.model.types.push(TypeInfo::Named {
            name: name.into(),
            kind: TypeKind::Reference,
            special: None,
        });
        (self.model.types.len() - 1) as TypeId
    }

    fn symbol(&mut self, sym: Symbol) -> SymbolId {
        self.model.symbols.push(sym);
        (self.model.symbols.len() - 1) as SymbolId
    }

    fn expr(&mut self, kind: ExprKind) -> ExprNode {
        let id = self.next_node;
        self.next_node += 1;
        ExprNode {
            id,
            kind,
            span: Span::dummy(),
        }
    }

    fn bound(&mut self, kind: ExprKind, sym: SymbolId) -> ExprNode {
        let node = self.expr(kind);
        self.model.bindings.insert(node.id, sym);
        node
    }
}

fn plain_symbol(name: &str, kind: SymbolKind, ty: TypeId) -> Symbol {
    Symbol {
        name: name.into(),
        kind,
        declaring_type: None,
        ty,
        is_static: false,
        is_virtual: false,
        is_by_ref: false,
        same_unit: false,
        param_sig: vec![],
        param_ordinal: None,
        type_params: vec![],
        getter: None,
        setter: None,
        is_indexer: false,
    }
}

fn stmt(kind: StmtKind) -> StmtNode {
    StmtNode {
        kind,
        span: Span::dummy(),
    }
}

/// One class, one static method, `return 41 + 1`.
fn tiny_input() -> CompilationInput {
    let mut b = Builder::new();
    let lhs = b.expr(ExprKind::IntLit(41));
    let rhs = b.expr(ExprKind::IntLit(1));
    let sum = b.expr(ExprKind::Binary {
        op: BinOp::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    });

    let module = Module {
        name: "tiny".into(),
        types: vec![TypeDecl {
            name: "Box".into(),
            kind: TypeDeclKind::Class,
            members: vec![Member::Method(MethodDecl {
                name: "answer".into(),
                is_static: true,
                type_params: vec![],
                params: vec![],
                return_ty: INT,
                returns_by_ref: false,
                body: Some(Block {
                    stmts: vec![stmt(StmtKind::Return(Some(sum)))],
                }),
                span: Span::dummy(),
            })],
            span: Span::dummy(),
        }],
    };

    CompilationInput {
        source_name: "tiny.src".into(),
        source: None,
        module,
        model: b.model,
    }
}

/// A class with an instance field and a method mutating it through the
/// implicit receiver.
fn account_input() -> CompilationInput {
    let mut b = Builder::new();
    let account_ty = b.named_ref("Account");
    let balance = b.symbol({
        let mut s = plain_symbol("balance", SymbolKind::Field, INT);
        s.declaring_type = Some(account_ty);
        s
    });
    let amount = b.symbol({
        let mut s = plain_symbol("amount", SymbolKind::Parameter, INT);
        s.param_ordinal = Some(0);
        s
    });

    let target = b.bound(ExprKind::Name("balance".into()), balance);
    let lhs = b.bound(ExprKind::Name("balance".into()), balance);
    let rhs = b.bound(ExprKind::Name("amount".into()), amount);
    let sum = b.expr(ExprKind::Binary {
        op: BinOp::Add,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    });
    let assign = b.expr(ExprKind::Assign {
        target: Box::new(target),
        value: Box::new(sum),
    });

    let module = Module {
        name: "bank".into(),
        types: vec![TypeDecl {
            name: "Account".into(),
            kind: TypeDeclKind::Class,
            members: vec![
                Member::Field(FieldDecl {
                    name: "balance".into(),
                    ty: INT,
                    is_static: false,
                    span: Span::dummy(),
                }),
                Member::Method(MethodDecl {
                    name: "deposit".into(),
                    is_static: false,
                    type_params: vec![],
                    params: vec![ParamDecl {
                        name: "amount".into(),
                        ty: INT,
                        by_ref: false,
                    }],
                    return_ty: VOID,
                    returns_by_ref: false,
                    body: Some(Block {
                        stmts: vec![stmt(StmtKind::Expr(assign))],
                    }),
                    span: Span::dummy(),
                }),
            ],
            span: Span::dummy(),
        }],
    };

    CompilationInput {
        source_name: "bank.src".into(),
        source: None,
        module,
        model: b.model,
    }
}

fn line_pos(out: &str, needle: &str) -> usize {
    out.lines()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("missing '{}' in output:\n{}", needle, out))
}

#[test]
fn test_tiny_module_snapshot() {
    let input = tiny_input();
    let output = generate(&input).expect("generation").text;
    insta::assert_snapshot!("tiny_module", output);
}

#[test]
fn test_account_deposit_shape() {
    let input = account_input();
    let out = generate(&input).expect("generation").text;

    // Declarations frame the body.
    assert!(out.contains("FieldDef::new(\"balance\""));
    assert!(out.contains("MethodDef::new(\"deposit\""));
    assert!(out.contains("ParamDef::new(\"amount\""));

    // The spliced receiver sits below the value computation, and the field
    // load inside the value carries its own receiver.
    let first_this = line_pos(&out, "Op::Ldarg_0");
    let field_load = line_pos(&out, "Ldfld, fld_balance");
    let param_load = line_pos(&out, "Op::Ldarg_1");
    let add = line_pos(&out, "Op::Add");
    let store = line_pos(&out, "Stfld, fld_balance");
    assert!(first_this < field_load);
    assert!(field_load < param_load);
    assert!(param_load < add);
    assert!(add < store);
    assert_eq!(
        out.lines().filter(|l| l.contains("Op::Ldarg_0")).count(),
        2,
        "store receiver plus load receiver:\n{}",
        out
    );
}

#[test]
fn test_generation_is_deterministic_across_json_roundtrip() {
    let input = account_input();
    let first = generate(&input).expect("generation").text;

    let json = serde_json::to_string(&input).expect("serialize");
    let reloaded: CompilationInput = serde_json::from_str(&json).expect("deserialize");
    let second = generate(&reloaded).expect("generation").text;

    assert_eq!(first, second);
}

#[test]
fn test_output_written_to_file() {
    let input = tiny_input();
    let output = generate(&input).expect("generation");

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tiny.gen");
    std::fs::write(&path, &output.text).expect("write output");
    let read_back = std::fs::read_to_string(&path).expect("read output");
    assert_eq!(read_back, output.text);
}

#[test]
fn test_unsupported_construct_surfaces_warning() {
    let mut b = Builder::new();
    let cond = b.expr(ExprKind::BoolLit(true));
    let module = Module {
        name: "app".into(),
        types: vec![TypeDecl {
            name: "Runner".into(),
            kind: TypeDeclKind::Class,
            members: vec![Member::Method(MethodDecl {
                name: "spin".into(),
                is_static: true,
                type_params: vec![],
                params: vec![],
                return_ty: VOID,
                returns_by_ref: false,
                body: Some(Block {
                    stmts: vec![StmtNode {
                        kind: StmtKind::While {
                            cond,
                            body: Block { stmts: vec![] },
                        },
                        span: Span::new(5, 25, 3, 5),
                    }],
                }),
                span: Span::dummy(),
            })],
            span: Span::dummy(),
        }],
    };
    let input = CompilationInput {
        source_name: "app.src".into(),
        source: Some("class Runner { static void spin() { while (true) {} } }".into()),
        module,
        model: b.model,
    };

    let output = generate(&input).expect("permissive generation");
    assert!(output.text.contains("'while' construct is not supported at 3,5"));
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].severity, Severity::Warning);

    // Strict mode rejects the same input.
    let err = generate_with_options(&input, &GenOptions::default().with_strict(true));
    assert!(err.is_err());
}
