//! Literal decoding for the AVM.
//!
//! Integer literals are big-endian and sign-extended from their encoded
//! width. String and code literals carry a big-endian length prefix followed
//! by the body.

use std::sync::Arc;
use tracing::trace;

use crate::backend::bytecode::opcodes::Opcode;
use crate::backend::models::Object;
use super::types::{Cursor, VmError, VmResult};
use super::Machine;

impl Machine<'_> {
    pub(super) fn op_int(&mut self, cursor: &mut Cursor<'_>, width: usize) -> VmResult<()> {
        let value = cursor.read_be_signed(width, VmError::OperandTruncated)?;
        trace!(target: "avm::vm::value", value, width, "int");
        self.push_int(value)
    }

    pub(super) fn op_push_small(&mut self, opcode: Opcode) -> VmResult<()> {
        let value = opcode.small_value().ok_or(VmError::InvalidOpcode)?;
        self.push_int(value)
    }

    pub(super) fn op_str(&mut self, cursor: &mut Cursor<'_>, width: usize) -> VmResult<()> {
        let len = cursor.read_be(width, VmError::OperandTruncated)? as usize;
        let bytes = cursor.take(len, VmError::StrTruncated)?;
        trace!(target: "avm::vm::value", len, "str");
        self.push(Object::String(bytes.to_vec()))
    }

    pub(super) fn op_code(&mut self, cursor: &mut Cursor<'_>, width: usize) -> VmResult<()> {
        let len = cursor.read_be(width, VmError::OperandTruncated)? as usize;
        let bytes = cursor.take(len, VmError::CodeTruncated)?;
        trace!(target: "avm::vm::value", len, "code");
        self.push(Object::Code(Arc::from(bytes)))
    }

    pub(super) fn op_ref(&mut self, cursor: &mut Cursor<'_>) -> VmResult<()> {
        let hash = cursor.read_be(4, VmError::RefTruncated)?;
        trace!(target: "avm::vm::value", hash, "ref");
        self.push(Object::Ref(hash))
    }
}
