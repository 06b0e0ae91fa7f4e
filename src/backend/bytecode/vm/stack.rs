//! Stack operations for the AVM.
//!
//! This module contains the operand helpers shared by every handler and the
//! stack manipulation opcodes: pop, swap, dup, count, index, copy, roll,
//! rev and the mark operations.
//!
//! Handlers check depth and operand types before removing anything, so a
//! failing instruction leaves the stack as it found it.

use tracing::trace;

use crate::backend::models::Object;
use super::types::{VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    // === Operand Helpers ===

    #[inline]
    pub(super) fn require(&self, n: usize) -> VmResult<()> {
        if self.stack.size() < n {
            return Err(VmError::NotEnoughArgs);
        }
        Ok(())
    }

    #[inline]
    pub(super) fn peek(&self, index: usize) -> VmResult<&Object> {
        self.stack.at(index).ok_or(VmError::NotEnoughArgs)
    }

    /// Integer value at `index` from the top
    #[inline]
    pub(super) fn int_at(&self, index: usize) -> VmResult<i32> {
        self.peek(index)?.as_integer().ok_or(VmError::WrongType)
    }

    #[inline]
    pub(super) fn push(&mut self, object: Object) -> VmResult<()> {
        self.stack.push(object)
    }

    #[inline]
    pub(super) fn push_int(&mut self, value: i32) -> VmResult<()> {
        let object = self.vm.integer(value);
        self.stack.push(object)
    }

    #[inline]
    pub(super) fn push_bool(&mut self, value: bool) -> VmResult<()> {
        self.push_int(value as i32)
    }

    #[inline]
    pub(super) fn pop(&mut self) -> VmResult<Object> {
        self.stack.pop().ok_or(VmError::NotEnoughArgs)
    }

    /// Pop and release the top `n` objects
    pub(super) fn drop_top(&mut self, n: usize) -> VmResult<()> {
        for object in self.stack.discard(n)? {
            self.vm.release(object);
        }
        Ok(())
    }

    /// Validate a count operand against the objects available beneath it
    #[inline]
    pub(super) fn span(&self, n: i32, below: usize) -> VmResult<usize> {
        let available = self.stack.size() - below;
        match usize::try_from(n) {
            Ok(n) if n <= available => Ok(n),
            _ => Err(VmError::StackRange),
        }
    }

    // === Stack Operations ===

    pub(super) fn op_pop(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "pop");
        self.require(1)?;
        self.drop_top(1)
    }

    pub(super) fn op_swap(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "swap");
        self.stack.swap_top()
    }

    pub(super) fn op_dup(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "dup");
        let top = self.stack.at(0).ok_or(VmError::NotEnoughArgs)?;
        let copy = self.vm.copy(top);
        self.push(copy)
    }

    pub(super) fn op_count(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", depth = self.stack.size(), "count");
        let depth = i32::try_from(self.stack.size()).map_err(|_| VmError::StackRange)?;
        self.push_int(depth)
    }

    /// `… i → … copy(stack[i])`, with `i` counted once the index is popped
    pub(super) fn op_index(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "index");
        self.require(1)?;
        let index = self.int_at(0)?;
        let index = match usize::try_from(index) {
            Ok(i) if i + 1 < self.stack.size() => i,
            _ => return Err(VmError::StackRange),
        };
        self.drop_top(1)?;
        let source = self.stack.at(index).ok_or(VmError::StackRange)?;
        let copy = self.vm.copy(source);
        self.push(copy)
    }

    /// `x1 … xn n → x1 … xn x1' … xn'`
    pub(super) fn op_copy(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "copy");
        self.require(1)?;
        let n = self.span(self.int_at(0)?, 1)?;
        self.drop_top(1)?;
        // Each copy pushes the next original down to depth n-1.
        for _ in 0..n {
            let source = self.stack.at(n - 1).ok_or(VmError::StackRange)?;
            let copy = self.vm.copy(source);
            self.push(copy)?;
        }
        Ok(())
    }

    /// `x1 … xn n d → rotated`, new index `i` taking old index `(i + d) mod n`
    pub(super) fn op_roll(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "roll");
        self.require(2)?;
        let d = self.int_at(0)?;
        let n = self.int_at(1)?;
        let span = self.span(n, 2)?;
        if d >= n || d <= -n {
            return Err(VmError::DeltaRange);
        }
        self.drop_top(2)?;
        self.stack.rotate_top(span, d as isize)
    }

    /// `x1 … xn n → xn … x1`
    pub(super) fn op_rev(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "rev");
        self.require(1)?;
        let n = self.span(self.int_at(0)?, 1)?;
        self.drop_top(1)?;
        self.stack.reverse_top(n)
    }

    pub(super) fn op_mark(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "mark");
        self.push(Object::Mark)
    }

    pub(super) fn op_is_mark(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "ismark");
        let top = self.pop()?;
        let is_mark = top.is_mark();
        self.vm.release(top);
        self.push_bool(is_mark)
    }

    /// Push the distance from the top to the nearest mark
    pub(super) fn op_ctm(&mut self) -> VmResult<()> {
        trace!(target: "avm::vm::stack", "ctm");
        let distance = self.stack.nearest_mark().ok_or(VmError::MarkNotFound)?;
        let distance = i32::try_from(distance).map_err(|_| VmError::StackRange)?;
        self.push_int(distance)
    }
}
