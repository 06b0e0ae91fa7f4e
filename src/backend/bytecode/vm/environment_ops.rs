//! Binding operations for the AVM.
//!
//! Definitions map a reference hash to an owned object in the VM's
//! dictionary. Resolving a reference bound to code runs that code in place,
//! which is how named procedures are expressed.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::backend::models::Object;
use super::types::{Cursor, Flow, VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// `ref value → ` binds value to ref, releasing any previous value
    pub(super) fn op_def(&mut self) -> VmResult<()> {
        self.require(2)?;
        let key = self.peek(1)?.as_ref_hash().ok_or(VmError::RefExpected)?;
        let value = self.pop()?;
        self.pop()?;
        debug!(target: "avm::vm::binding", key, kind = %value.object_type(), "def");
        self.vm.bind(key, value);
        Ok(())
    }

    /// `ref → ` removes the binding if there is one
    pub(super) fn op_undef(&mut self) -> VmResult<()> {
        self.require(1)?;
        let key = self.peek(0)?.as_ref_hash().ok_or(VmError::RefExpected)?;
        self.pop()?;
        let removed = self.vm.unbind(key);
        debug!(target: "avm::vm::binding", key, removed, "undef");
        Ok(())
    }

    /// Resolve the inline hash: bound code runs as a subroutine with its own
    /// accumulator, anything else is pushed as a copy.
    pub(super) fn op_ref_val(&mut self, cursor: &mut Cursor<'_>) -> VmResult<Flow> {
        let key = cursor.read_be(4, VmError::RefTruncated)?;
        let code = match self.vm.lookup(key).ok_or(VmError::RefNotBind)? {
            Object::Code(code) => Arc::clone(code),
            Object::Integer(value) => {
                let value = **value;
                trace!(target: "avm::vm::binding", key, "refval push");
                self.push_int(value)?;
                return Ok(Flow::Continue(()));
            }
            other => {
                let copy = other.clone();
                trace!(target: "avm::vm::binding", key, "refval push");
                self.push(copy)?;
                return Ok(Flow::Continue(()));
            }
        };

        trace!(target: "avm::vm::binding", key, len = code.len(), "refval call");
        let saved_acc = self.vm.acc.take();
        let result = self.execute(&code);
        if let Some(acc) = self.vm.acc.take() {
            self.vm.release(acc);
        }
        self.vm.acc = saved_acc;
        result
    }
}
