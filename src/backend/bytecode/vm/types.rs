//! Type definitions for the AVM.
//!
//! - VmError: Error types that can occur during execution
//! - Flow: Early-exit signal threaded through nested execution
//! - Cursor: Read position over one instruction stream

use std::ops::ControlFlow;

/// Result of VM execution
pub type VmResult<T> = Result<T, VmError>;

/// Outcome of an instruction that completed without error. `Break` is the
/// early-exit signal raised by `break`; loops consume it.
pub type Flow = ControlFlow<()>;

/// Version tag reported by every VM instance
pub const AVM_VERSION: u16 = 0x0001;

/// Error code meaning "no error"
pub const NO_ERROR: u16 = 0x0000;

/// Errors that can occur during VM execution.
///
/// Each variant has a stable 16-bit code; the high byte groups codes by
/// concern (system, decoding, stack discipline, operand contracts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VmError {
    // === System (0x00xx) ===
    /// Invalid argument passed by the host
    InvalidArg,
    /// Allocation failed
    NoMem,

    // === Decoding (0x01xx) ===
    /// Zero opcode byte
    NullOpcode,
    /// Opcode byte not assigned to any instruction
    InvalidOpcode,
    /// No code to execute
    NoCode,
    /// Malformed variable-length integer
    BadVlint,
    /// String literal body runs past the end of the code
    StrTruncated,
    /// Code literal body runs past the end of the code
    CodeTruncated,
    /// Reference hash runs past the end of the code
    RefTruncated,
    /// Integer operand or length prefix runs past the end of the code
    OperandTruncated,

    // === Stack discipline (0x02xx) ===
    /// Discarding more objects than the stack holds
    InvalidDiscard,

    // === Operand contracts (0x03xx) ===
    NotEnoughArgs,
    WrongType,
    /// A reference was expected
    RefExpected,
    /// Operands of a binary operation have different types
    DifferentTypes,
    /// Action operand is not code
    TypeNotExec,
    /// Negative repeat count
    NegativeTimes,
    /// Loop increment is zero or moves away from the limit
    BadIncrement,
    /// Stack index or count out of range
    StackRange,
    /// Rotation distance not smaller than the rotated span
    DeltaRange,
    /// Value does not fit in a byte
    CharValue,
    MarkNotFound,
    /// Accumulator read while empty
    AccNotSet,
    /// Reference has no binding
    RefNotBind,
    /// String index out of range
    RangeCheck,
    DivisionByZero,
    Unimplemented,
}

impl VmError {
    /// Stable numeric code
    pub fn code(self) -> u16 {
        match self {
            Self::InvalidArg => 0x0001,
            Self::NoMem => 0x0002,
            Self::NullOpcode => 0x0100,
            Self::InvalidOpcode => 0x0101,
            Self::NoCode => 0x0102,
            Self::BadVlint => 0x0103,
            Self::StrTruncated => 0x0104,
            Self::CodeTruncated => 0x0105,
            Self::RefTruncated => 0x0106,
            Self::OperandTruncated => 0x0107,
            Self::InvalidDiscard => 0x0200,
            Self::NotEnoughArgs => 0x0300,
            Self::WrongType => 0x0301,
            Self::RefExpected => 0x0302,
            Self::DifferentTypes => 0x0303,
            Self::TypeNotExec => 0x0304,
            Self::NegativeTimes => 0x0305,
            Self::BadIncrement => 0x0306,
            Self::StackRange => 0x0307,
            Self::DeltaRange => 0x0308,
            Self::CharValue => 0x0309,
            Self::MarkNotFound => 0x030A,
            Self::AccNotSet => 0x030B,
            Self::RefNotBind => 0x030C,
            Self::RangeCheck => 0x030D,
            Self::DivisionByZero => 0x030E,
            Self::Unimplemented => 0x030F,
        }
    }

    /// Inverse of [`VmError::code`]
    pub fn from_code(code: u16) -> Option<Self> {
        const ALL: [VmError; 27] = [
            VmError::InvalidArg, VmError::NoMem,
            VmError::NullOpcode, VmError::InvalidOpcode, VmError::NoCode, VmError::BadVlint,
            VmError::StrTruncated, VmError::CodeTruncated, VmError::RefTruncated,
            VmError::OperandTruncated,
            VmError::InvalidDiscard,
            VmError::NotEnoughArgs, VmError::WrongType, VmError::RefExpected,
            VmError::DifferentTypes, VmError::TypeNotExec, VmError::NegativeTimes,
            VmError::BadIncrement, VmError::StackRange, VmError::DeltaRange,
            VmError::CharValue, VmError::MarkNotFound, VmError::AccNotSet,
            VmError::RefNotBind, VmError::RangeCheck, VmError::DivisionByZero,
            VmError::Unimplemented,
        ];
        ALL.into_iter().find(|err| err.code() == code)
    }
}

impl std::fmt::Display for VmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::InvalidArg => "Invalid argument",
            Self::NoMem => "Out of memory",
            Self::NullOpcode => "Null opcode",
            Self::InvalidOpcode => "Invalid opcode",
            Self::NoCode => "No code",
            Self::BadVlint => "Malformed variable-length integer",
            Self::StrTruncated => "String literal truncated",
            Self::CodeTruncated => "Code literal truncated",
            Self::RefTruncated => "Reference truncated",
            Self::OperandTruncated => "Operand truncated",
            Self::InvalidDiscard => "Discarding more objects than the stack holds",
            Self::NotEnoughArgs => "Not enough arguments",
            Self::WrongType => "Wrong type",
            Self::RefExpected => "Reference expected",
            Self::DifferentTypes => "Operands have different types",
            Self::TypeNotExec => "Object is not executable",
            Self::NegativeTimes => "Negative repeat count",
            Self::BadIncrement => "Bad loop increment",
            Self::StackRange => "Stack index out of range",
            Self::DeltaRange => "Rotation out of range",
            Self::CharValue => "Character value out of range",
            Self::MarkNotFound => "Mark not found",
            Self::AccNotSet => "Accumulator not set",
            Self::RefNotBind => "Reference not bound",
            Self::RangeCheck => "String index out of range",
            Self::DivisionByZero => "Division by zero",
            Self::Unimplemented => "Unimplemented",
        };
        write!(f, "{} (0x{:04x})", message, self.code())
    }
}

impl std::error::Error for VmError {}

/// Read position within one instruction stream.
///
/// Every run and every nested block gets its own cursor; stack, bindings and
/// accumulator are shared.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    code: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self { code, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.code.len()
    }

    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.code.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    /// Take the next `len` bytes, or `err` if fewer remain
    #[inline]
    pub fn take(&mut self, len: usize, err: VmError) -> VmResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(err)?;
        let bytes = self.code.get(self.pos..end).ok_or(err)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Big-endian unsigned integer of `width` bytes (1 to 4)
    #[inline]
    pub fn read_be(&mut self, width: usize, err: VmError) -> VmResult<u32> {
        let bytes = self.take(width, err)?;
        Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
    }

    /// Big-endian signed integer of `width` bytes, sign-extended
    #[inline]
    pub fn read_be_signed(&mut self, width: usize, err: VmError) -> VmResult<i32> {
        let raw = self.read_be(width, err)?;
        let shift = 32 - 8 * width as u32;
        Ok(((raw << shift) as i32) >> shift)
    }
}
