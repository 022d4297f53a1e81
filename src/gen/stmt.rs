//! Statement code generation.
//!
//! Control-flow constructs are shaped here: labels are created before the
//! code that branches to them, placed once their position is reached, and
//! try constructs accumulate region markers into a table flushed when the
//! whole construct is known. Statement kinds outside the supported set
//! degrade to an inline comment naming the construct and source position;
//! generation continues with their siblings.

use super::expr::Usage;
use super::regions::RegionTable;
use super::registry::MemberKind;
use super::Generator;
use crate::ast::{
    Block, CaseLabel, CatchClause, ExprNode, LocalDecl, StmtKind, StmtNode, SwitchSection,
    UsingResource,
};
use crate::diagnostic::Diagnostic;
use crate::op::Op;
use crate::sem::TypeId;
use crate::spelling;
use crate::GenError;

/// What runs in a protected construct's finally handler: a source-level
/// block, or the dispose call a using-statement desugars to.
enum FinallyHandler<'b> {
    Block(&'b Block),
    Dispose { local_var: String, ty: TypeId },
}

impl<'a> Generator<'a> {
    pub(crate) fn gen_block(&mut self, block: &'a Block) -> Result<(), GenError> {
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn gen_stmt(&mut self, stmt: &'a StmtNode) -> Result<(), GenError> {
        self.source_comment(&stmt.kind.summary());
        match &stmt.kind {
            StmtKind::LocalDecl(decls) => {
                for decl in decls {
                    self.gen_local_decl(decl)?;
                }
                Ok(())
            }
            StmtKind::Expr(e) => self.gen_expr_discarding(e),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    let by_ref = self.return_by_ref;
                    self.gen_expr(value, Usage::Sink { by_ref })?;
                }
                self.inst(Op::Ret);
                Ok(())
            }
            StmtKind::Throw(value) => {
                match value {
                    Some(value) => {
                        self.gen_expr(value, Usage::Load)?;
                        self.inst(Op::Throw);
                    }
                    None => self.inst(Op::Rethrow),
                }
                Ok(())
            }
            StmtKind::If {
                cond,
                then_block,
                else_block,
            } => self.gen_if(cond, then_block, else_block.as_ref()),
            StmtKind::For {
                init,
                cond,
                incr,
                body,
            } => self.gen_for(init, cond.as_ref(), incr, body),
            StmtKind::Switch {
                scrutinee,
                sections,
            } => self.gen_switch(scrutinee, sections),
            StmtKind::Break => match self.break_targets.last().cloned() {
                Some(target) => {
                    self.inst_with(Op::Br, &target);
                    Ok(())
                }
                None => Err(GenError::InvalidInput(
                    "break outside of a breakable construct".to_string(),
                )),
            },
            StmtKind::Try {
                block,
                catches,
                finally,
            } => self.gen_protected(
                block,
                catches,
                finally.as_ref().map(FinallyHandler::Block),
            ),
            StmtKind::Using { resource, body } => self.gen_using(resource, body),
            StmtKind::Block(block) => self.gen_block(block),

            StmtKind::While { .. } => self.gen_unsupported("while", stmt),
            StmtKind::DoWhile { .. } => self.gen_unsupported("do", stmt),
            StmtKind::ForEach { .. } => self.gen_unsupported("foreach", stmt),
            StmtKind::Lock { .. } => self.gen_unsupported("lock", stmt),
            StmtKind::Unsafe(_) => self.gen_unsupported("unsafe", stmt),
            StmtKind::Checked(_) => self.gen_unsupported("checked", stmt),
            StmtKind::Continue => self.gen_unsupported("continue", stmt),
            StmtKind::Goto(_) => self.gen_unsupported("goto", stmt),
            StmtKind::Yield(_) => self.gen_unsupported("yield", stmt),
        }
    }

    fn gen_unsupported(&mut self, name: &str, stmt: &StmtNode) -> Result<(), GenError> {
        if self.opts().strict {
            return Err(GenError::UnsupportedConstruct {
                name: name.to_string(),
                line: stmt.span.line,
                col: stmt.span.col,
            });
        }
        let summary = stmt.kind.summary();
        self.log.emit(spelling::unsupported(
            name,
            stmt.span.line,
            stmt.span.col,
            &summary,
        ));
        self.diags.push(Diagnostic::warning(
            format!("'{}' construct is not supported; emitted as a comment", name),
            stmt.span,
        ));
        Ok(())
    }

    fn gen_local_decl(&mut self, decl: &'a LocalDecl) -> Result<(), GenError> {
        let ty = self.resolve_type(decl.ty)?;
        let ty = if decl.by_ref {
            spelling::typeref_by_ref(&ty)
        } else {
            ty
        };
        let local_var = self.add_local(&decl.name, &ty);
        if let Some(init) = &decl.init {
            let pushed = self.gen_expr(init, Usage::Sink { by_ref: decl.by_ref })?;
            if pushed {
                self.inst_with(Op::Stloc, &local_var);
            }
        }
        Ok(())
    }

    fn gen_if(
        &mut self,
        cond: &'a ExprNode,
        then_block: &'a Block,
        else_block: Option<&'a Block>,
    ) -> Result<(), GenError> {
        self.gen_expr(cond, Usage::Load)?;
        match else_block {
            Some(else_block) => {
                let else_label = self.create_label("else", Op::Nop);
                self.inst_with(Op::Brfalse, &else_label);
                self.gen_block(then_block)?;
                let end_label = self.create_label("endif", Op::Nop);
                self.inst_with(Op::Br, &end_label);
                self.place_label(&else_label);
                self.gen_block(else_block)?;
                self.place_label(&end_label);
            }
            None => {
                let end_label = self.create_label("endif", Op::Nop);
                self.inst_with(Op::Brfalse, &end_label);
                self.gen_block(then_block)?;
                self.place_label(&end_label);
            }
        }
        Ok(())
    }

    /// init; end-label creation; condition label; condition; conditional
    /// branch to end; body; increments (stack-discarding); branch back to
    /// the condition; end label placement. The condition is evaluated once
    /// per iteration attempt.
    fn gen_for(
        &mut self,
        init: &'a [StmtNode],
        cond: Option<&'a ExprNode>,
        incr: &'a [ExprNode],
        body: &'a Block,
    ) -> Result<(), GenError> {
        for stmt in init {
            self.gen_stmt(stmt)?;
        }

        let end_label = self.create_label("fel", Op::Nop);
        let cond_label = self.append_new_label("fcl", Op::Nop);

        if let Some(cond) = cond {
            self.gen_expr(cond, Usage::Load)?;
            self.inst_with(Op::Brfalse, &end_label);
        }

        self.break_targets.push(end_label.clone());
        self.gen_block(body)?;
        self.break_targets.pop();

        for inc in incr {
            self.gen_expr_discarding(inc)?;
        }
        self.inst_with(Op::Br, &cond_label);
        self.place_label(&end_label);
        Ok(())
    }

    /// The governing expression is evaluated once into a temporary; each
    /// non-default case contributes an equality test and a conditional
    /// branch, the default clause exactly one unconditional branch at its
    /// textual position. No implicit fallthrough between cases.
    fn gen_switch(
        &mut self,
        scrutinee: &'a ExprNode,
        sections: &'a [SwitchSection],
    ) -> Result<(), GenError> {
        let sem = self.sem();
        let scrutinee_ty = sem.type_of(scrutinee)?;
        let ty_spelled = self.resolve_type(scrutinee_ty)?;
        let tmp = self.add_local("switchCondition", &ty_spelled);
        self.gen_expr(scrutinee, Usage::Load)?;
        self.inst_with(Op::Stloc, &tmp);

        let end_label = self.create_label("endOfSwitch", Op::Nop);
        self.break_targets.push(end_label.clone());

        let mut case_labels = Vec::with_capacity(sections.len());
        for _ in sections {
            case_labels.push(self.create_label("caseCode", Op::Nop));
        }

        for (i, section) in sections.iter().enumerate() {
            if matches!(section.labels.first(), Some(CaseLabel::Default)) {
                // None of the tests matched by the time execution reaches
                // this point in the test chain.
                self.inst_with(Op::Br, &case_labels[i]);
                continue;
            }
            for label in &section.labels {
                if let CaseLabel::Case(value) = label {
                    if self.opts().source_comments {
                        let text = format!("case {} (condition)", value.summary());
                        self.log.emit(spelling::comment(&text));
                    }
                    self.inst_with(Op::Ldloc, &tmp);
                    self.gen_expr(value, Usage::Load)?;
                    self.inst_with(Op::Beq, &case_labels[i]);
                }
            }
        }

        // No label matched: jump past the whole switch.
        self.inst_with(Op::Br, &end_label);

        for (i, section) in sections.iter().enumerate() {
            if self.opts().source_comments {
                let text = match section.labels.first() {
                    Some(CaseLabel::Case(value)) => format!("case {} (code)", value.summary()),
                    _ => "default (code)".to_string(),
                };
                self.log.emit(spelling::comment(&text));
            }
            self.place_label(&case_labels[i]);
            for stmt in &section.stmts {
                self.gen_stmt(stmt)?;
            }
        }

        if self.opts().source_comments {
            self.log.emit(spelling::comment("End of switch"));
        }
        self.place_label(&end_label);
        self.break_targets.pop();
        Ok(())
    }

    /// Shared try/catch/finally shaping: the protected block, a leave to
    /// the first instruction after the construct, handlers in source order,
    /// and one region-table flush once every marker is bound.
    fn gen_protected(
        &mut self,
        block: &'a Block,
        catches: &'a [CatchClause],
        finally: Option<FinallyHandler<'a>>,
    ) -> Result<(), GenError> {
        let mut table = RegionTable::new(catches.len(), finally.is_some());

        let try_start = self.append_new_label("tryStart", Op::Nop);
        table.set_try_start(&try_start);

        self.gen_block(block)?;

        let after = self.create_label("afterTryCatch", Op::Nop);
        table.set_exit(&after);
        self.inst_with(Op::Leave, &after);

        for (i, catch) in catches.iter().enumerate() {
            // The handler begins by popping the exception object.
            let handler_start = self.append_new_label("catchHandler", Op::Pop);
            let catch_ty = self.resolve_type(catch.ty)?;
            table.begin_catch(i, &handler_start, &catch_ty);
            self.gen_block(&catch.block)?;
            self.inst_with(Op::Leave, &after);
        }

        if let Some(handler) = finally {
            // No leading pop: the finally path does not carry an exception
            // object, and it ends in endfinally, never a leave.
            let handler_start = self.append_new_label("finallyHandler", Op::Nop);
            table.begin_finally(&handler_start);
            match handler {
                FinallyHandler::Block(b) => self.gen_block(b)?,
                FinallyHandler::Dispose { local_var, ty } => self.gen_dispose(&local_var, ty)?,
            }
            self.inst(Op::Endfinally);
        }

        self.place_label(&after);

        let method_var = self.method_var.clone();
        table.flush(&method_var, &mut self.log);
        Ok(())
    }

    fn gen_using(&mut self, resource: &'a UsingResource, body: &'a Block) -> Result<(), GenError> {
        let (local_var, ty) = match resource {
            UsingResource::Decl(decl) => {
                self.gen_local_decl(decl)?;
                let local_var = self
                    .vars
                    .lookup(MemberKind::LocalVariable, &decl.name, None)
                    .map(String::from)
                    .ok_or_else(|| GenError::MissingDefinition {
                        name: decl.name.clone(),
                    })?;
                (local_var, decl.ty)
            }
            UsingResource::Expr(e) => {
                let ty = self.sem().type_of(e)?;
                self.gen_expr(e, Usage::Load)?;
                let ty_spelled = self.resolve_type(ty)?;
                let tmp = self.add_local("tempDisp", &ty_spelled);
                self.inst_with(Op::Stloc, &tmp);
                (tmp, ty)
            }
        };
        self.gen_protected(body, &[], Some(FinallyHandler::Dispose { local_var, ty }))
    }

    /// The finally body of a using-statement. Value types dispose
    /// unconditionally through their address; type parameters and
    /// references may be null at runtime and get a guard branch.
    fn gen_dispose(&mut self, local_var: &str, ty: TypeId) -> Result<(), GenError> {
        let sem = self.sem();
        let dispose = spelling::method_ref("IDisposable", "Dispose");
        if sem.is_value_type(ty) {
            self.inst_with(Op::Ldloca, local_var);
            let ty_spelled = self.resolve_type(ty)?;
            self.inst_with(Op::Constrained, &ty_spelled);
            self.inst_with(Op::Callvirt, &dispose);
        } else if sem.is_type_parameter(ty) {
            self.inst_with(Op::Ldloc, local_var);
            let end_label = self.create_label("endFinally", Op::Nop);
            self.inst_with(Op::Brfalse, &end_label);
            self.inst_with(Op::Ldloca, local_var);
            let ty_spelled = self.resolve_type(ty)?;
            self.inst_with(Op::Constrained, &ty_spelled);
            self.inst_with(Op::Callvirt, &dispose);
            self.place_label(&end_label);
        } else {
            self.inst_with(Op::Ldloc, local_var);
            let end_label = self.create_label("endFinally", Op::Nop);
            self.inst_with(Op::Brfalse, &end_label);
            self.inst_with(Op::Ldloc, local_var);
            self.inst_with(Op::Callvirt, &dispose);
            self.place_label(&end_label);
        }
        Ok(())
    }
}
