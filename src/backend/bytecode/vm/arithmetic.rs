//! Arithmetic operations for the AVM.
//!
//! Integers are 32-bit two's complement and arithmetic wraps. Binary
//! operations consume the top operand and overwrite the one beneath it in
//! place; unary operations rewrite the top. Shifts treat the left operand as
//! unsigned, so `shr` is logical.

use tracing::trace;

use super::types::{VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// `a b → op(a, b)`
    fn binary_int(&mut self, op: impl FnOnce(i32, i32) -> VmResult<i32>) -> VmResult<()> {
        self.require(2)?;
        let b = self.int_at(0)?;
        let a = self.int_at(1)?;
        let result = op(a, b)?;
        self.drop_top(1)?;
        let slot = self
            .stack
            .at_mut(0)
            .and_then(|top| top.as_integer_mut())
            .ok_or(VmError::WrongType)?;
        *slot = result;
        Ok(())
    }

    /// `a → op(a)`
    fn unary_int(&mut self, op: impl FnOnce(i32) -> i32) -> VmResult<()> {
        self.require(1)?;
        let slot = self
            .stack
            .at_mut(0)
            .and_then(|top| top.as_integer_mut())
            .ok_or(VmError::WrongType)?;
        *slot = op(*slot);
        Ok(())
    }

    pub(super) fn op_add(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "add");
        self.binary_int(|a, b| Ok(a.wrapping_add(b)))
    }

    pub(super) fn op_sub(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "sub");
        self.binary_int(|a, b| Ok(a.wrapping_sub(b)))
    }

    pub(super) fn op_mul(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "mul");
        self.binary_int(|a, b| Ok(a.wrapping_mul(b)))
    }

    pub(super) fn op_div(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "div");
        self.binary_int(|a, b| {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            Ok(a.wrapping_div(b))
        })
    }

    pub(super) fn op_mod(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "mod");
        self.binary_int(|a, b| {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            Ok(a.wrapping_rem(b))
        })
    }

    pub(super) fn op_inc(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "inc");
        self.unary_int(|a| a.wrapping_add(1))
    }

    pub(super) fn op_dec(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "dec");
        self.unary_int(|a| a.wrapping_sub(1))
    }

    pub(super) fn op_shl(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "shl");
        self.binary_int(|a, b| {
            let shifted = u32::try_from(b)
                .ok()
                .and_then(|b| (a as u32).checked_shl(b))
                .unwrap_or(0);
            Ok(shifted as i32)
        })
    }

    pub(super) fn op_shr(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "shr");
        self.binary_int(|a, b| {
            let shifted = u32::try_from(b)
                .ok()
                .and_then(|b| (a as u32).checked_shr(b))
                .unwrap_or(0);
            Ok(shifted as i32)
        })
    }

    pub(super) fn op_and(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "and");
        self.binary_int(|a, b| Ok(a & b))
    }

    pub(super) fn op_or(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "or");
        self.binary_int(|a, b| Ok(a | b))
    }

    /// `not` and `eqz`: logical negation
    pub(super) fn op_eqz(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "eqz");
        self.unary_int(|a| (a == 0) as i32)
    }

    pub(super) fn op_neqz(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::arithmetic", "neqz");
        self.unary_int(|a| (a != 0) as i32)
    }
}
