//! Byte string operations for the AVM.
//!
//! Strings are mutable byte buffers. Bytes move to and from the stack as
//! integers in `0..=255`.

use tracing::trace;

use crate::backend::models::Object;
use super::types::{VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    /// Bytes of the string at `index`
    fn string_at(&self, index: usize) -> VmResult<&[u8]> {
        self.peek(index)?.as_bytes().ok_or(VmError::WrongType)
    }

    /// Mutable bytes of the string on top
    fn top_string_mut(&mut self) -> VmResult<&mut Vec<u8>> {
        self.stack
            .at_mut(0)
            .ok_or(VmError::NotEnoughArgs)?
            .as_bytes_mut()
            .ok_or(VmError::WrongType)
    }

    /// `str i → str byte`; negative indices count from the end
    pub(super) fn op_at(&mut self) -> VmResult<()> {
        self.require(2)?;
        let index = self.int_at(0)?;
        let bytes = self.string_at(1)?;
        let len = bytes.len() as i64;
        let position = if index < 0 { len + index as i64 } else { index as i64 };
        if !(0..len).contains(&position) {
            return Err(VmError::RangeCheck);
        }
        let byte = bytes[position as usize];
        trace!(target: "avm::vm::string", index, byte, "at");
        self.drop_top(1)?;
        self.push_int(byte as i32)
    }

    /// `str → str' first`, or `str → -1` when empty
    pub(super) fn op_head(&mut self) -> VmResult<()> {
        self.require(1)?;
        let bytes = self.top_string_mut()?;
        if bytes.is_empty() {
            self.drop_top(1)?;
            return self.push_int(-1);
        }
        let first = bytes.remove(0);
        trace!(target: "avm::vm::string", byte = first, "head");
        self.push_int(first as i32)
    }

    /// `str → str' last`, or `str → -1` when empty
    pub(super) fn op_tail(&mut self) -> VmResult<()> {
        self.require(1)?;
        match self.top_string_mut()?.pop() {
            Some(last) => {
                trace!(target: "avm::vm::string", byte = last, "tail");
                self.push_int(last as i32)
            }
            None => {
                self.drop_top(1)?;
                self.push_int(-1)
            }
        }
    }

    /// `str → str len`
    pub(super) fn op_len(&mut self) -> VmResult<()> {
        self.require(1)?;
        let len = self.string_at(0)?.len();
        let len = i32::try_from(len).map_err(|_| VmError::RangeCheck)?;
        self.push_int(len)
    }

    /// `str → b0 … bn-1` with the last byte on top
    pub(super) fn op_expl(&mut self) -> VmResult<()> {
        self.require(1)?;
        self.string_at(0)?;
        let bytes = match self.pop()? {
            Object::String(bytes) => bytes,
            _ => return Err(VmError::WrongType),
        };
        trace!(target: "avm::vm::string", len = bytes.len(), "expl");
        for byte in bytes {
            self.push_int(byte as i32)?;
        }
        Ok(())
    }

    /// `a b → a‖b`
    pub(super) fn op_join(&mut self) -> VmResult<()> {
        self.require(2)?;
        self.string_at(0)?;
        self.string_at(1)?;
        let tail = match self.pop()? {
            Object::String(bytes) => bytes,
            _ => return Err(VmError::WrongType),
        };
        trace!(target: "avm::vm::string", len = tail.len(), "join");
        self.top_string_mut()?.extend_from_slice(&tail);
        Ok(())
    }

    /// `b0 … bn-1 n → str`, the inverse of `expl`
    pub(super) fn op_impl(&mut self) -> VmResult<()> {
        self.require(1)?;
        let n = self.int_at(0)?;
        let n = usize::try_from(n).map_err(|_| VmError::StackRange)?;
        if self.stack.size() - 1 < n {
            return Err(VmError::NotEnoughArgs);
        }

        // The deepest of the n values is the first byte.
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(n).map_err(|_| VmError::NoMem)?;
        for index in (1..=n).rev() {
            let value = self.int_at(index)?;
            let byte = u8::try_from(value).map_err(|_| VmError::CharValue)?;
            bytes.push(byte);
        }
        trace!(target: "avm::vm::string", len = n, "impl");

        self.drop_top(n + 1)?;
        self.push(Object::String(bytes))
    }

    pub(super) fn op_split(&mut self) -> VmResult<()> {
        Err(VmError::Unimplemented)
    }
}
