//! Comparison operations for the AVM.
//!
//! Both operands are popped and replaced by 1 or 0. Integers compare
//! numerically; strings compare bytewise, a proper prefix ordering first.

use std::cmp::Ordering;
use tracing::trace;

use crate::backend::models::Object;
use super::types::{VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// Order `a` (second) against `b` (top), then pop both
    fn compare(&mut self) -> VmResult<Ordering> {
        self.require(2)?;
        let b = self.peek(0)?;
        let a = self.peek(1)?;
        if a.object_type() != b.object_type() {
            return Err(VmError::DifferentTypes);
        }
        let ordering = match (a, b) {
            (Object::Integer(a), Object::Integer(b)) => a.cmp(b),
            (Object::String(a), Object::String(b)) => a.as_slice().cmp(b.as_slice()),
            _ => return Err(VmError::WrongType),
        };
        self.drop_top(2)?;
        Ok(ordering)
    }

    pub(super) fn op_eq(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "eq");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_eq())
    }

    pub(super) fn op_neq(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "neq");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_ne())
    }

    pub(super) fn op_lt(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "lt");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_lt())
    }

    pub(super) fn op_lte(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "lte");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_le())
    }

    pub(super) fn op_gt(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "gt");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_gt())
    }

    pub(super) fn op_gte(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::comparison", "gte");
        let ordering = self.compare()?;
        self.push_bool(ordering.is_ge())
    }
}
