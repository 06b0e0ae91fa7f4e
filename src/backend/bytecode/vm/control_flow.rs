//! Control flow operations for the AVM.
//!
//! Conditionals and loops take their bodies as code objects from the stack
//! and run them through [`Machine::execute`]. A `break` inside a body travels
//! outward as [`Flow::Break`] through conditionals and reference calls until
//! the nearest `repeat` or `for` absorbs it.

use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::trace;

use crate::backend::models::Object;
use super::types::{Flow, VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// Check that the object at `index` is executable
    fn expect_code(&self, index: usize) -> VmResult<()> {
        match self.peek(index)? {
            Object::Code(_) => Ok(()),
            _ => Err(VmError::TypeNotExec),
        }
    }

    /// Truth value of the condition at `index`
    fn condition_at(&self, index: usize) -> VmResult<bool> {
        self.peek(index)?.truthiness().ok_or(VmError::WrongType)
    }

    /// Pop a code object whose type has already been checked
    fn pop_code(&mut self) -> VmResult<Arc<[u8]>> {
        match self.pop()? {
            Object::Code(code) => Ok(code),
            _ => Err(VmError::TypeNotExec),
        }
    }

    /// `cond action → …`
    pub(super) fn op_if(&mut self) -> VmResult<Flow> {
        self.require(2)?;
        self.expect_code(0)?;
        let taken = self.condition_at(1)?;
        let action = self.pop_code()?;
        self.drop_top(1)?;
        trace!(target: "avm::vm::control", taken, "if");

        if taken {
            self.execute(&action)
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    /// `cond then else → …`
    pub(super) fn op_if_else(&mut self) -> VmResult<Flow> {
        self.require(3)?;
        self.expect_code(0)?;
        self.expect_code(1)?;
        let taken = self.condition_at(2)?;
        let otherwise = self.pop_code()?;
        let then = self.pop_code()?;
        self.drop_top(1)?;
        trace!(target: "avm::vm::control", taken, "ifelse");

        self.execute(if taken { &then } else { &otherwise })
    }

    /// `count action → …` runs action count times
    pub(super) fn op_repeat(&mut self) -> VmResult<()> {
        self.require(2)?;
        self.expect_code(0)?;
        let count = self.int_at(1)?;
        if count < 0 {
            return Err(VmError::NegativeTimes);
        }
        let action = self.pop_code()?;
        self.drop_top(1)?;
        trace!(target: "avm::vm::control", count, "repeat");

        for _ in 0..count {
            if self.execute(&action)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// `value count → value × count`
    pub(super) fn op_times(&mut self) -> VmResult<()> {
        self.require(2)?;
        let count = self.int_at(0)?;
        if count < 0 {
            return Err(VmError::NegativeTimes);
        }
        self.drop_top(1)?;
        let value = self.pop()?;
        trace!(target: "avm::vm::control", count, "times");

        if count == 0 {
            self.vm.release(value);
            return Ok(());
        }
        for _ in 1..count {
            let copy = self.vm.copy(&value);
            self.push(copy)?;
        }
        self.push(value)
    }

    /// `initial increment limit action → …` runs action for each loop value
    /// from initial to limit inclusive, pushing the value first.
    pub(super) fn op_for(&mut self) -> VmResult<()> {
        self.require(4)?;
        self.expect_code(0)?;
        let limit = self.int_at(1)?;
        let increment = self.int_at(2)?;
        let initial = self.int_at(3)?;
        if increment == 0
            || (limit > initial && increment < 0)
            || (limit < initial && increment > 0)
        {
            return Err(VmError::BadIncrement);
        }
        let action = self.pop_code()?;
        self.drop_top(3)?;
        trace!(target: "avm::vm::control", initial, increment, limit, "for");

        let mut i = initial;
        while (increment > 0 && i <= limit) || (increment < 0 && i >= limit) {
            self.push_int(i)?;
            if self.execute(&action)?.is_break() {
                break;
            }
            match i.checked_add(increment) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(())
    }

    pub(super) fn op_break(&mut self) -> Flow {
        trace!(target: "avm::vm::control", depth = self.depth, "break");
        ControlFlow::Break(())
    }
}
