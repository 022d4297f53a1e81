//! Expression code generation.
//!
//! Each expression kind decides two things: what must reach the operand
//! stack and in which representation (address or value), and whether
//! already-emitted records must be relocated so operands land in the order
//! the stack machine requires. The second concern is what the emission
//! log's markers exist for: an assignment captures the marker *before*
//! visiting its value subtree, and the target's records are reconciled
//! against that marker afterwards.

use super::registry::MemberKind;
use crate::ast::{BinOp, ExprKind, ExprNode};
use crate::op::Op;
use crate::sem::{SpecialType, Symbol, SymbolKind, TypeId};
use crate::spelling;
use crate::GenError;

use super::Generator;

/// How the surrounding context consumes the value being generated.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Usage {
    /// Plain value load.
    Load,
    /// Receiver of a member or indexer call: value types load their address.
    CallTarget,
    /// Operand of the address-of operator.
    AddressOf,
    /// Value flowing into a sink (assignment target, matched parameter,
    /// declared return) whose by-ref-ness drives reconciliation.
    Sink { by_ref: bool },
}

impl Usage {
    fn wants_address(self, is_value_type: bool, source_by_ref: bool) -> bool {
        match self {
            Usage::AddressOf => !source_by_ref,
            Usage::CallTarget => is_value_type && !source_by_ref,
            // A by-ref sink fed from a non-by-ref source takes the address.
            Usage::Sink { by_ref: true } => !source_by_ref,
            _ => false,
        }
    }

    fn reconciles(self, source_by_ref: bool) -> bool {
        matches!(self, Usage::Sink { by_ref: false }) && source_by_ref
    }
}

impl<'a> Generator<'a> {
    /// Generate one expression. Returns whether a value was left on the
    /// operand stack.
    pub(crate) fn gen_expr(&mut self, e: &'a ExprNode, usage: Usage) -> Result<bool, GenError> {
        match &e.kind {
            ExprKind::IntLit(value) => {
                let op = match self.sem().node_types.get(&e.id) {
                    Some(ty) if self.sem().special_of(*ty) == Some(SpecialType::Int64) => Op::LdcI8,
                    _ => Op::LdcI4,
                };
                self.inst_with(op, &spelling::int_operand(*value));
                Ok(true)
            }
            ExprKind::BoolLit(value) => {
                self.inst_with(Op::LdcI4, &spelling::int_operand(i64::from(*value)));
                Ok(true)
            }
            ExprKind::StrLit(value) => {
                self.inst_with(Op::Ldstr, &spelling::str_operand(value));
                Ok(true)
            }
            ExprKind::NullLit => {
                self.inst(Op::Ldnull);
                Ok(true)
            }
            ExprKind::Name(_) => self.gen_name(e, usage),
            ExprKind::Member { target, .. } => self.gen_member(e, target, usage),
            ExprKind::Index { target, args } => self.gen_element(e, target, args, usage),
            ExprKind::Call {
                callee,
                args,
                type_args,
            } => self.gen_call(e, callee, args, type_args),
            ExprKind::New { ty, args } => {
                for arg in args {
                    self.gen_expr(arg, Usage::Load)?;
                }
                let ctor = spelling::ctor_ref(&self.resolve_type(*ty)?);
                self.inst_with(Op::Newobj, &ctor);
                Ok(true)
            }
            ExprKind::Assign { target, value } => self.gen_assignment(e, target, value),
            ExprKind::Binary { op, lhs, rhs } => {
                // Operands feed an arithmetic sink: by-ref sources reconcile.
                self.gen_expr(lhs, Usage::Sink { by_ref: false })?;
                self.gen_expr(rhs, Usage::Sink { by_ref: false })?;
                self.inst(binary_op(*op));
                Ok(true)
            }
            ExprKind::AddressOf(inner) => {
                self.gen_expr(inner, Usage::AddressOf)?;
                Ok(true)
            }
        }
    }

    /// Generate an expression used as a statement, discarding any value it
    /// leaves behind.
    pub(crate) fn gen_expr_discarding(&mut self, e: &'a ExprNode) -> Result<(), GenError> {
        if self.gen_expr(e, Usage::Load)? {
            self.inst(Op::Pop);
        }
        Ok(())
    }

    // ─── Names ────────────────────────────────────────────────────

    fn gen_name(&mut self, e: &'a ExprNode, usage: Usage) -> Result<bool, GenError> {
        let sem = self.sem();
        let sym = sem.symbol_of(e)?;
        match sym.kind {
            SymbolKind::Local | SymbolKind::Parameter => self.gen_var_load(sym, usage),
            SymbolKind::Field => self.gen_field_access(sym, usage, false),
            SymbolKind::Property => {
                if !sym.is_static {
                    self.inst(Op::Ldarg0);
                }
                self.call_property_getter(sym, false)?;
                Ok(true)
            }
            // A bare method group or type name produces no value by itself;
            // the enclosing call or member access consumes it.
            SymbolKind::Method | SymbolKind::Type => Ok(false),
        }
    }

    /// Load a local or parameter: address when the context requires one,
    /// value otherwise, with an indirect load reconciling by-ref sources
    /// against non-by-ref sinks.
    fn gen_var_load(&mut self, sym: &Symbol, usage: Usage) -> Result<bool, GenError> {
        let sem = self.sem();
        let is_value = sem.is_value_type(sem.deref_type(sym.ty));

        if usage.wants_address(is_value, sym.is_by_ref) {
            match sym.kind {
                SymbolKind::Local => {
                    let var = self.local_operand(&sym.name)?;
                    self.inst_with(Op::Ldloca, &var);
                }
                _ => {
                    let var = self.param_operand(&sym.name)?;
                    self.inst_with(Op::Ldarga, &var);
                }
            }
            return Ok(true);
        }

        match sym.kind {
            SymbolKind::Local => {
                let var = self.local_operand(&sym.name)?;
                self.inst_with(Op::Ldloc, &var);
            }
            _ => {
                let slot = sym.param_ordinal.unwrap_or(0) + u32::from(!self.in_static_body);
                match Op::short_ldarg(slot) {
                    Some(op) => self.inst(op),
                    None => self.inst_with(Op::Ldarg, &spelling::int_operand(i64::from(slot))),
                }
            }
        }

        if usage.reconciles(sym.is_by_ref) {
            let special = sem.special_of(sem.deref_type(sym.ty));
            self.inst(ldind_for(special));
        }
        Ok(true)
    }

    fn gen_field_access(
        &mut self,
        sym: &Symbol,
        usage: Usage,
        receiver_on_stack: bool,
    ) -> Result<bool, GenError> {
        if !sym.is_static && !receiver_on_stack {
            // Implicit receiver of an unqualified instance field.
            self.inst(Op::Ldarg0);
        }
        let operand = self.field_operand(sym)?;
        let sem = self.sem();
        let wants_address = usage.wants_address(sem.is_value_type(sym.ty), false);
        let op = match (sym.is_static, wants_address) {
            (true, true) => Op::Ldsflda,
            (true, false) => Op::Ldsfld,
            (false, true) => Op::Ldflda,
            (false, false) => Op::Ldfld,
        };
        self.inst_with(op, &operand);
        Ok(true)
    }

    // ─── Member access ────────────────────────────────────────────

    fn gen_member(
        &mut self,
        e: &'a ExprNode,
        target: &'a ExprNode,
        usage: Usage,
    ) -> Result<bool, GenError> {
        let sem = self.sem();
        let sym = sem.symbol_of(e)?;
        let mut receiver_on_stack = false;
        if !sym.is_static {
            // A value-type receiver of a member access loads its address.
            self.gen_expr(target, Usage::CallTarget)?;
            receiver_on_stack = true;
        }
        match sym.kind {
            SymbolKind::Field => self.gen_field_access(sym, usage, receiver_on_stack),
            SymbolKind::Property => {
                self.call_property_getter(sym, self.receiver_is_value_type(target)?)?;
                Ok(true)
            }
            // The enclosing call emits the invocation itself.
            SymbolKind::Method => Ok(false),
            _ => Ok(true),
        }
    }

    // ─── Element access ───────────────────────────────────────────

    /// Element access in load position: arrays use the element-load
    /// instruction, indexers call their getter. Ref-returning indexers
    /// reconcile like any by-ref source.
    fn gen_element(
        &mut self,
        e: &'a ExprNode,
        target: &'a ExprNode,
        args: &'a [ExprNode],
        usage: Usage,
    ) -> Result<bool, GenError> {
        self.gen_expr(target, Usage::CallTarget)?;
        for arg in args {
            self.gen_expr(arg, Usage::Load)?;
        }
        let sem = self.sem();
        match sem.try_symbol_of(e) {
            Some(sym) if sym.kind == SymbolKind::Property => {
                let receiver_vt = self.receiver_is_value_type(target)?;
                self.call_property_getter(sym, receiver_vt)?;
                if usage.reconciles(sym.is_by_ref) {
                    let special = sem.special_of(sem.deref_type(sym.ty));
                    self.inst(ldind_for(special));
                }
                Ok(true)
            }
            // No bound symbol: plain array element access.
            _ => {
                self.inst(Op::Ldelem);
                Ok(true)
            }
        }
    }

    // ─── Calls ────────────────────────────────────────────────────

    fn gen_call(
        &mut self,
        e: &'a ExprNode,
        callee: &'a ExprNode,
        args: &'a [ExprNode],
        type_args: &'a [TypeId],
    ) -> Result<bool, GenError> {
        let sem = self.sem();
        let sym = sem.symbol_of(e)?;

        let mut receiver_vt = false;
        if !sym.is_static {
            match &callee.kind {
                ExprKind::Member { target, .. } => {
                    self.gen_expr(target, Usage::CallTarget)?;
                    receiver_vt = self.receiver_is_value_type(target)?;
                }
                // Unqualified instance call: the receiver is the implicit
                // first argument.
                _ => {
                    self.inst(Op::Ldarg0);
                    receiver_vt = self.in_value_type;
                }
            }
        }

        for (i, arg) in args.iter().enumerate() {
            let param_by_ref = sym
                .param_sig
                .get(i)
                .map(|ty| sem.is_by_ref_type(*ty))
                .unwrap_or(false);
            self.gen_expr(arg, Usage::Sink { by_ref: param_by_ref })?;
        }

        let operand = if !type_args.is_empty() && sym.same_unit {
            let open_target = self.method_operand(sym)?;
            let spelled_args = type_args
                .iter()
                .map(|a| self.resolve_type(*a))
                .collect::<Result<Vec<_>, _>>()?;
            let method_id = sem.binding_of(e)?;
            self.generics.instantiate(
                &mut self.log,
                &mut self.names,
                method_id,
                &sym.name,
                &open_target,
                type_args,
                &spelled_args,
            )
        } else {
            self.method_operand(sym)?
        };

        self.inst_with(self.call_op_for(sym, receiver_vt), &operand);
        Ok(!sem.is_void(sym.ty))
    }

    // ─── Assignment ───────────────────────────────────────────────

    /// The visitor reaches the value subtree before the target, but the
    /// stack machine wants target-then-value. The marker captured before
    /// the value records is what makes the reconciliation possible —
    /// capturing it late silently corrupts instruction order.
    fn gen_assignment(
        &mut self,
        _e: &'a ExprNode,
        target: &'a ExprNode,
        value: &'a ExprNode,
    ) -> Result<bool, GenError> {
        let sem = self.sem();

        // A by-ref target stores through the reference it already holds:
        // load the reference before the value so no relocation is needed.
        let mut store_indirect = false;
        if let ExprKind::Name(_) = &target.kind {
            let sym = sem.symbol_of(target)?;
            if sym.is_by_ref
                && matches!(sym.kind, SymbolKind::Local | SymbolKind::Parameter)
            {
                match sym.kind {
                    SymbolKind::Local => {
                        let var = self.local_operand(&sym.name)?;
                        self.inst_with(Op::Ldloc, &var);
                    }
                    _ => {
                        let slot = sym.param_ordinal.unwrap_or(0) + u32::from(!self.in_static_body);
                        match Op::short_ldarg(slot) {
                            Some(op) => self.inst(op),
                            None => {
                                self.inst_with(Op::Ldarg, &spelling::int_operand(i64::from(slot)))
                            }
                        }
                    }
                }
                store_indirect = true;
            }
        }

        let preceding = self.log.cursor();
        self.gen_expr(value, Usage::Sink { by_ref: false })?;

        match &target.kind {
            ExprKind::Name(_) => {
                let sym = sem.symbol_of(target)?;

                // Instance member target: the implicit receiver must sit
                // below the value, which already exists — splice it in.
                if matches!(sym.kind, SymbolKind::Field | SymbolKind::Property) && !sym.is_static {
                    let record = spelling::instruction(&self.il_var, Op::Ldarg0, None);
                    self.log.insert_after(preceding, record);
                }

                // Implicit user conversion runs before the store.
                if let Some(target_ty) = sem.node_types.get(&target.id) {
                    if let Some(conv) = sem.classify_conversion(value.id, *target_ty) {
                        let conv_sym = sem.symbol(conv)?;
                        let operand = self.method_operand(conv_sym)?;
                        self.inst_with(Op::Call, &operand);
                    }
                }

                match sym.kind {
                    SymbolKind::Local => {
                        if store_indirect {
                            self.inst(stind_for(sem.special_of(sem.deref_type(sym.ty))));
                        } else {
                            let var = self.local_operand(&sym.name)?;
                            self.inst_with(Op::Stloc, &var);
                        }
                    }
                    SymbolKind::Parameter => {
                        if store_indirect {
                            self.inst(stind_for(sem.special_of(sem.deref_type(sym.ty))));
                        } else {
                            let var = self.param_operand(&sym.name)?;
                            self.inst_with(Op::Starg, &var);
                        }
                    }
                    SymbolKind::Field => {
                        let operand = self.field_operand(sym)?;
                        let op = if sym.is_static { Op::Stsfld } else { Op::Stfld };
                        self.inst_with(op, &operand);
                    }
                    SymbolKind::Property => {
                        self.call_property_setter(sym, false)?;
                    }
                    _ => {
                        return Err(GenError::UnresolvedSymbol {
                            line: target.span.line,
                            col: target.span.col,
                        })
                    }
                }
            }
            ExprKind::Member {
                target: receiver,
                ..
            } => {
                let sym = sem.symbol_of(target)?;
                let value_end = self.log.cursor();
                if !sym.is_static {
                    self.gen_expr(receiver, Usage::CallTarget)?;
                }
                // Receiver records were emitted after the value: move the
                // value range behind them.
                self.log.move_range_to_end(preceding, value_end);
                match sym.kind {
                    SymbolKind::Field => {
                        let operand = self.field_operand(sym)?;
                        let op = if sym.is_static { Op::Stsfld } else { Op::Stfld };
                        self.inst_with(op, &operand);
                    }
                    SymbolKind::Property => {
                        let receiver_vt = self.receiver_is_value_type(receiver)?;
                        self.call_property_setter(sym, receiver_vt)?;
                    }
                    _ => {
                        return Err(GenError::UnresolvedSymbol {
                            line: target.span.line,
                            col: target.span.col,
                        })
                    }
                }
            }
            ExprKind::Index {
                target: receiver,
                args,
            } => {
                let value_end = self.log.cursor();
                self.gen_expr(receiver, Usage::CallTarget)?;
                for arg in args {
                    self.gen_expr(arg, Usage::Load)?;
                }
                match sem.try_symbol_of(target) {
                    Some(sym) if sym.kind == SymbolKind::Property && sym.is_by_ref => {
                        // Ref-returning indexer: load the reference first,
                        // then bring the value back on top and store through.
                        let receiver_vt = self.receiver_is_value_type(receiver)?;
                        self.call_property_getter(sym, receiver_vt)?;
                        self.log.move_range_to_end(preceding, value_end);
                        self.inst(stind_for(sem.special_of(sem.deref_type(sym.ty))));
                    }
                    Some(sym) if sym.kind == SymbolKind::Property => {
                        self.log.move_range_to_end(preceding, value_end);
                        let receiver_vt = self.receiver_is_value_type(receiver)?;
                        self.call_property_setter(sym, receiver_vt)?;
                    }
                    _ => {
                        self.log.move_range_to_end(preceding, value_end);
                        self.inst(Op::Stelem);
                    }
                }
            }
            _ => {
                return Err(GenError::UnresolvedSymbol {
                    line: target.span.line,
                    col: target.span.col,
                })
            }
        }
        Ok(false)
    }

    // ─── Call plumbing ────────────────────────────────────────────

    fn receiver_is_value_type(&self, receiver: &ExprNode) -> Result<bool, GenError> {
        let sem = self.sem();
        Ok(match sem.node_types.get(&receiver.id) {
            Some(ty) => sem.is_value_type(sem.deref_type(*ty)),
            None => match sem.try_symbol_of(receiver) {
                Some(sym) => sem.is_value_type(sem.deref_type(sym.ty)),
                None => false,
            },
        })
    }

    /// Call-form selection: statics always bind directly; a non-virtual
    /// member of this unit or of a value-type receiver binds directly;
    /// everything else dispatches virtually.
    pub(crate) fn call_op_for(&self, sym: &Symbol, receiver_value_type: bool) -> Op {
        if sym.is_static {
            Op::Call
        } else if (sym.same_unit || receiver_value_type) && !sym.is_virtual {
            Op::Call
        } else {
            Op::Callvirt
        }
    }

    /// Output-level reference to a method: its registered definition when
    /// declared in this unit, an external reference otherwise.
    pub(crate) fn method_operand(&self, sym: &Symbol) -> Result<String, GenError> {
        let sem = self.sem();
        let owner = sym
            .declaring_type
            .map(|t| sem.type_name(t))
            .unwrap_or_default();
        if sym.same_unit {
            let sig = sem.signature(&sym.param_sig);
            if let Some(var) = self.vars.lookup_method(&owner, &sym.name, Some(&sig)) {
                return Ok(var.to_string());
            }
        }
        Ok(spelling::method_ref(&owner, &sym.name))
    }

    fn field_operand(&self, sym: &Symbol) -> Result<String, GenError> {
        let sem = self.sem();
        let owner = sym
            .declaring_type
            .map(|t| sem.type_name(t))
            .unwrap_or_default();
        if let Some(var) = self.vars.lookup(MemberKind::Field, &sym.name, Some(&owner)) {
            return Ok(var.to_string());
        }
        Ok(spelling::field_ref(&owner, &sym.name))
    }

    fn call_property_getter(&mut self, sym: &Symbol, receiver_vt: bool) -> Result<(), GenError> {
        let sem = self.sem();
        let getter = sym.getter.ok_or_else(|| GenError::MissingDefinition {
            name: format!("get_{}", sym.name),
        })?;
        let getter_sym = sem.symbol(getter)?;
        let operand = self.method_operand(getter_sym)?;
        self.inst_with(self.call_op_for(getter_sym, receiver_vt), &operand);
        Ok(())
    }

    fn call_property_setter(&mut self, sym: &Symbol, receiver_vt: bool) -> Result<(), GenError> {
        let sem = self.sem();
        let setter = sym.setter.ok_or_else(|| GenError::MissingDefinition {
            name: format!("set_{}", sym.name),
        })?;
        let setter_sym = sem.symbol(setter)?;
        let operand = self.method_operand(setter_sym)?;
        self.inst_with(self.call_op_for(setter_sym, receiver_vt), &operand);
        Ok(())
    }

    fn local_operand(&self, name: &str) -> Result<String, GenError> {
        self.vars
            .lookup(MemberKind::LocalVariable, name, None)
            .map(|s| s.to_string())
            .ok_or_else(|| GenError::MissingDefinition {
                name: name.to_string(),
            })
    }

    fn param_operand(&self, name: &str) -> Result<String, GenError> {
        self.vars
            .lookup(MemberKind::Parameter, name, None)
            .map(|s| s.to_string())
            .ok_or_else(|| GenError::MissingDefinition {
                name: name.to_string(),
            })
    }
}

fn binary_op(op: BinOp) -> Op {
    match op {
        BinOp::Add => Op::Add,
        BinOp::Sub => Op::Sub,
        BinOp::Mul => Op::Mul,
        BinOp::Div => Op::Div,
        BinOp::Rem => Op::Rem,
        BinOp::Eq => Op::Ceq,
        BinOp::Lt => Op::Clt,
        BinOp::Gt => Op::Cgt,
    }
}

/// Indirect-load selection for a by-ref source's pointee type.
pub(crate) fn ldind_for(special: Option<SpecialType>) -> Op {
    match special {
        Some(SpecialType::Int8) => Op::LdindI1,
        Some(SpecialType::UInt8) | Some(SpecialType::Bool) => Op::LdindU1,
        Some(SpecialType::Int16) => Op::LdindI2,
        Some(SpecialType::UInt16) | Some(SpecialType::Char) => Op::LdindU2,
        Some(SpecialType::Int32) => Op::LdindI4,
        Some(SpecialType::UInt32) => Op::LdindU4,
        Some(SpecialType::Int64) | Some(SpecialType::UInt64) => Op::LdindI8,
        Some(SpecialType::Float32) => Op::LdindR4,
        Some(SpecialType::Float64) => Op::LdindR8,
        _ => Op::LdindRef,
    }
}

/// Indirect-store selection for a by-ref target's pointee type.
pub(crate) fn stind_for(special: Option<SpecialType>) -> Op {
    match special {
        Some(SpecialType::Int64) | Some(SpecialType::UInt64) => Op::StindI8,
        Some(SpecialType::Float32) => Op::StindR4,
        Some(SpecialType::Float64) => Op::StindR8,
        Some(SpecialType::Object) | Some(SpecialType::String) | None => Op::StindRef,
        Some(_) => Op::StindI4,
    }
}
