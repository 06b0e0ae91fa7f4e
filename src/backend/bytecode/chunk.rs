//! Bytecode construction
//!
//! [`CodeBuilder`] appends encoded instructions to a byte buffer, always
//! picking the shortest encoding for literals. Built code is a plain byte
//! vector: the machine reads it directly and nested blocks are embedded as
//! code literals.

use super::opcodes::Opcode;
use crate::backend::bytecode::vm::{VmError, VmResult};

/// Builder for bytecode buffers
#[derive(Debug, Clone, Default)]
pub struct CodeBuilder {
    code: Vec<u8>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self {
            code: Vec::with_capacity(64),
        }
    }

    /// Current length of the emitted code
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Emitted bytes so far
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Emit an opcode without operands
    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        self.code.push(opcode.to_byte());
        self
    }

    /// Append raw bytes
    pub fn emit_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Emit an integer literal using the shortest encoding
    pub fn emit_int(&mut self, value: i32) -> &mut Self {
        if let Some(op) = Opcode::for_small_value(value) {
            return self.emit(op);
        }
        let bytes = value.to_be_bytes();
        if i8::try_from(value).is_ok() {
            self.emit(Opcode::Int8).emit_raw(&bytes[3..])
        } else if i16::try_from(value).is_ok() {
            self.emit(Opcode::Int16).emit_raw(&bytes[2..])
        } else if (-(1 << 23)..(1 << 23)).contains(&value) {
            self.emit(Opcode::Int24).emit_raw(&bytes[1..])
        } else {
            self.emit(Opcode::Int32).emit_raw(&bytes)
        }
    }

    /// Emit a string literal. Strings longer than 65535 bytes have no
    /// encoding and fail with `InvalidArg`.
    pub fn emit_str(&mut self, bytes: &[u8]) -> VmResult<&mut Self> {
        let len = bytes.len();
        if let Ok(len) = u8::try_from(len) {
            self.emit(Opcode::Str8).emit_raw(&[len]);
        } else if let Ok(len) = u16::try_from(len) {
            self.emit(Opcode::Str16).emit_raw(&len.to_be_bytes());
        } else {
            return Err(VmError::InvalidArg);
        }
        Ok(self.emit_raw(bytes))
    }

    /// Emit a code literal wrapping `block`
    pub fn emit_code(&mut self, block: &[u8]) -> VmResult<&mut Self> {
        let len = u32::try_from(block.len()).map_err(|_| VmError::InvalidArg)?;
        let prefix = len.to_be_bytes();
        if len <= 0xFF {
            self.emit(Opcode::Code8).emit_raw(&prefix[3..]);
        } else if len <= 0xFFFF {
            self.emit(Opcode::Code16).emit_raw(&prefix[2..]);
        } else if len <= 0xFF_FFFF {
            self.emit(Opcode::Code24).emit_raw(&prefix[1..]);
        } else {
            self.emit(Opcode::Code32).emit_raw(&prefix);
        }
        Ok(self.emit_raw(block))
    }

    /// Emit `ref` pushing a reference to `hash`
    pub fn emit_ref(&mut self, hash: u32) -> &mut Self {
        self.emit(Opcode::Ref).emit_raw(&hash.to_be_bytes())
    }

    /// Emit `refval` resolving `hash`
    pub fn emit_ref_val(&mut self, hash: u32) -> &mut Self {
        self.emit(Opcode::RefVal).emit_raw(&hash.to_be_bytes())
    }

    /// Finish and return the bytecode
    pub fn build(self) -> Vec<u8> {
        self.code
    }
}
