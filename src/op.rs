//! Op — the closed instruction set of the target stack machine.
//!
//! Every instruction the generator can emit is a variant here; the
//! formatting layer spells `il.emit(Op::X, operand)` statements from them.
//! Operands (definition identifiers, literals, label identifiers) travel
//! separately so one variant covers every operand instance.

use std::fmt;

// ─── Instructions ─────────────────────────────────────────────────

/// A stack-machine instruction, grouped by concern:
///
/// loads/stores for arguments, locals, fields and elements; address
/// loads; indirect loads/stores for by-reference values; constants;
/// calls; branches; protected-region control; stack management.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    // ── Constants ──
    LdcI4,
    LdcI8,
    LdcR8,
    Ldstr,
    Ldnull,

    // ── Arguments ──
    Ldarg0,
    Ldarg1,
    Ldarg2,
    Ldarg3,
    Ldarg,
    Ldarga,
    Starg,

    // ── Locals ──
    Ldloc,
    Stloc,
    Ldloca,

    // ── Fields ──
    Ldfld,
    Stfld,
    Ldflda,
    Ldsfld,
    Stsfld,
    Ldsflda,

    // ── Array elements ──
    Ldelem,
    Stelem,

    // ── Indirect (by-reference) access ──
    LdindI1,
    LdindU1,
    LdindI2,
    LdindU2,
    LdindI4,
    LdindU4,
    LdindI8,
    LdindR4,
    LdindR8,
    LdindRef,
    StindI4,
    StindI8,
    StindR4,
    StindR8,
    StindRef,

    // ── Calls ──
    Call,
    Callvirt,
    Newobj,
    Constrained,

    // ── Branches ──
    Br,
    Brfalse,
    Brtrue,
    Beq,

    // ── Protected regions ──
    Leave,
    Endfinally,
    Throw,
    Rethrow,

    // ── Arithmetic / comparison ──
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Ceq,
    Clt,
    Cgt,

    // ── Stack management ──
    Nop,
    Pop,
    Dup,
    Ret,
}

// ─── Display ──────────────────────────────────────────────────────

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::LdcI4 => "Ldc_I4",
            Op::LdcI8 => "Ldc_I8",
            Op::LdcR8 => "Ldc_R8",
            Op::Ldstr => "Ldstr",
            Op::Ldnull => "Ldnull",
            Op::Ldarg0 => "Ldarg_0",
            Op::Ldarg1 => "Ldarg_1",
            Op::Ldarg2 => "Ldarg_2",
            Op::Ldarg3 => "Ldarg_3",
            Op::Ldarg => "Ldarg",
            Op::Ldarga => "Ldarga",
            Op::Starg => "Starg",
            Op::Ldloc => "Ldloc",
            Op::Stloc => "Stloc",
            Op::Ldloca => "Ldloca",
            Op::Ldfld => "Ldfld",
            Op::Stfld => "Stfld",
            Op::Ldflda => "Ldflda",
            Op::Ldsfld => "Ldsfld",
            Op::Stsfld => "Stsfld",
            Op::Ldsflda => "Ldsflda",
            Op::Ldelem => "Ldelem",
            Op::Stelem => "Stelem",
            Op::LdindI1 => "Ldind_I1",
            Op::LdindU1 => "Ldind_U1",
            Op::LdindI2 => "Ldind_I2",
            Op::LdindU2 => "Ldind_U2",
            Op::LdindI4 => "Ldind_I4",
            Op::LdindU4 => "Ldind_U4",
            Op::LdindI8 => "Ldind_I8",
            Op::LdindR4 => "Ldind_R4",
            Op::LdindR8 => "Ldind_R8",
            Op::LdindRef => "Ldind_Ref",
            Op::StindI4 => "Stind_I4",
            Op::StindI8 => "Stind_I8",
            Op::StindR4 => "Stind_R4",
            Op::StindR8 => "Stind_R8",
            Op::StindRef => "Stind_Ref",
            Op::Call => "Call",
            Op::Callvirt => "Callvirt",
            Op::Newobj => "Newobj",
            Op::Constrained => "Constrained",
            Op::Br => "Br",
            Op::Brfalse => "Brfalse",
            Op::Brtrue => "Brtrue",
            Op::Beq => "Beq",
            Op::Leave => "Leave",
            Op::Endfinally => "Endfinally",
            Op::Throw => "Throw",
            Op::Rethrow => "Rethrow",
            Op::Add => "Add",
            Op::Sub => "Sub",
            Op::Mul => "Mul",
            Op::Div => "Div",
            Op::Rem => "Rem",
            Op::Ceq => "Ceq",
            Op::Clt => "Clt",
            Op::Cgt => "Cgt",
            Op::Nop => "Nop",
            Op::Pop => "Pop",
            Op::Dup => "Dup",
            Op::Ret => "Ret",
        };
        write!(f, "{}", name)
    }
}

impl Op {
    /// Short-form argument load for the first four slots, if one exists.
    pub fn short_ldarg(slot: u32) -> Option<Op> {
        match slot {
            0 => Some(Op::Ldarg0),
            1 => Some(Op::Ldarg1),
            2 => Some(Op::Ldarg2),
            3 => Some(Op::Ldarg3),
            _ => None,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_display() {
        assert_eq!(format!("{}", Op::LdcI4), "Ldc_I4");
        assert_eq!(format!("{}", Op::Ldarg0), "Ldarg_0");
        assert_eq!(format!("{}", Op::Stloc), "Stloc");
        assert_eq!(format!("{}", Op::Brfalse), "Brfalse");
        assert_eq!(format!("{}", Op::Endfinally), "Endfinally");
        assert_eq!(format!("{}", Op::LdindRef), "Ldind_Ref");
        assert_eq!(format!("{}", Op::Ret), "Ret");
    }

    #[test]
    fn test_short_ldarg_forms() {
        assert_eq!(Op::short_ldarg(0), Some(Op::Ldarg0));
        assert_eq!(Op::short_ldarg(3), Some(Op::Ldarg3));
        assert_eq!(Op::short_ldarg(4), None);
    }
}
