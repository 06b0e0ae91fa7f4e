//! Accumulator operations for the AVM.
//!
//! The accumulator is a single register owned by the VM. Code invoked through
//! `refval` starts with an empty accumulator, and the caller's value is put
//! back when it returns.

use tracing::trace;

use super::types::{VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// `a → ` stores a, releasing the previous value
    pub(super) fn op_aset(&mut self) -> VmResult<()> {
        let value = self.pop()?;
        trace!(target: "avm::vm::state", kind = %value.object_type(), "aset");
        if let Some(previous) = self.vm.acc.replace(value) {
            self.vm.release(previous);
        }
        Ok(())
    }

    /// `→ copy(acc)`
    pub(super) fn op_aget(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::state", "aget");
        let value = self.vm.acc.as_ref().ok_or(VmError::AccNotSet)?;
        let copy = match value.as_integer() {
            Some(int) => self.vm.integer(int),
            None => value.clone(),
        };
        self.push(copy)
    }
}
