use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ilify::ast::*;
use ilify::sem::*;
use ilify::span::Span;
use ilify::{generate, CompilationInput};

const INT: TypeId = 0;
const VOID: TypeId = 1;

fn stmt(kind: StmtKind) -> StmtNode {
    StmtNode {
        kind,
        span: Span::dummy(),
    }
}

fn expr(next: &mut NodeId, kind: ExprKind) -> ExprNode {
    let id = *next;
    *next += 1;
    ExprNode {
        id,
        kind,
        span: Span::dummy(),
    }
}

/// A module with `methods` static methods, each declaring a local and
/// assigning a sum into it — enough body work to exercise the log, the
/// registry and the assignment paths together.
fn synthetic_input(methods: usize) -> CompilationInput {
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
        TypeInfo::Array(INT),
    ];
    let mut next_node: NodeId = 0;

    let mut members = Vec::with_capacity(methods);
    for i in 0..methods {
        let local_sym = model.symbols.len() as SymbolId;
        model.symbols.push(Symbol {
            name: "acc".into(),
            kind: SymbolKind::Local,
            declaring_type: None,
            ty: INT,
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
        });

        let init = expr(&mut next_node, ExprKind::IntLit(0));
        let lhs = expr(&mut next_node, ExprKind::Name("acc".into()));
        model.bindings.insert(lhs.id, local_sym);
        let rhs = expr(&mut next_node, ExprKind::IntLit(i as i64));
        let sum = expr(
            &mut next_node,
            ExprKind::Binary {
                op: BinOp::Add,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
        );
        let target = expr(&mut next_node, ExprKind::Name("acc".into()));
        model.bindings.insert(target.id, local_sym);
        let assign = expr(
            &mut next_node,
            ExprKind::Assign {
                target: Box::new(target),
                value: Box::new(sum),
            },
        );

        members.push(Member::Method(MethodDecl {
            name: format!("work_{}", i),
            is_static: true,
            type_params: vec![],
            params: vec![],
            return_ty: VOID,
            returns_by_ref: false,
            body: Some(Block {
                stmts: vec![
                    stmt(StmtKind::LocalDecl(vec![LocalDecl {
                        name: "acc".into(),
                        ty: INT,
                        by_ref: false,
                        init: Some(init),
                    }])),
                    stmt(StmtKind::Expr(assign)),
                ],
            }),
            span: Span::dummy(),
        }));
    }

    CompilationInput {
        source_name: "bench.src".into(),
        source: None,
        module: Module {
            name: "bench".into(),
            types: vec![TypeDecl {
                name: "Workload".into(),
                kind: TypeDeclKind::Class,
                members,
                span: Span::dummy(),
            }],
        },
        model,
    }
}

fn bench_generate(c: &mut Criterion) {
    let small = synthetic_input(4);
    let large = synthetic_input(64);

    c.bench_function("generate_small_module", |b| {
        b.iter(|| generate(black_box(&small)).expect("generation"))
    });
    c.bench_function("generate_large_module", |b| {
        b.iter(|| generate(black_box(&large)).expect("generation"))
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
