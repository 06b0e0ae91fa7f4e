//! Bytecode opcodes for the AVM
//!
//! Every instruction is a single opcode byte followed by its operands.
//! Multi-byte operands are big-endian. Opcodes are grouped by category into
//! contiguous ranges; bytes outside the assigned ranges are invalid.

use std::fmt;

/// Bytecode opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Never valid; a zero byte in the stream is reported as an error
    Null = 0x00,

    // === Stack Operations (0x01-0x0F) ===
    /// Discard top of stack
    Pop = 0x01,
    /// Swap top two stack elements
    Swap = 0x02,
    /// Duplicate top of stack
    Dup = 0x03,
    /// Push the stack depth
    Count = 0x04,
    /// Pop i, push a copy of the object at index i
    Index = 0x05,
    /// Pop n, push copies of the top n objects
    Copy = 0x06,
    /// Pop d and n, rotate the top n objects by d
    Roll = 0x07,
    /// Pop n, reverse the top n objects
    Rev = 0x08,
    /// Push a mark
    Mark = 0x09,
    /// Replace top with 1 if it is a mark, 0 otherwise
    IsMark = 0x0A,
    /// Push the distance to the nearest mark
    Ctm = 0x0B,

    // === Literals (0x10-0x2F) ===
    Int8 = 0x10,
    Int16 = 0x11,
    Int24 = 0x12,
    Int32 = 0x13,
    Str8 = 0x14,
    Str16 = 0x15,
    Code8 = 0x16,
    Code16 = 0x17,
    Code24 = 0x18,
    Code32 = 0x19,
    /// Push a reference to a 4-byte name hash
    Ref = 0x1A,
    /// Resolve a 4-byte name hash: run bound code, push anything else
    RefVal = 0x1B,
    Push0 = 0x20,
    Push1 = 0x21,
    Push2 = 0x22,
    Push3 = 0x23,
    Push4 = 0x24,
    Push5 = 0x25,
    Push6 = 0x26,
    Push7 = 0x27,
    PushM1 = 0x29,
    PushM2 = 0x2A,
    PushM3 = 0x2B,
    PushM4 = 0x2C,
    PushM5 = 0x2D,
    PushM6 = 0x2E,
    PushM7 = 0x2F,

    // === Arithmetic (0x30-0x3F) ===
    Add = 0x30,
    Sub = 0x31,
    Mul = 0x32,
    Div = 0x33,
    Mod = 0x34,
    Inc = 0x35,
    Dec = 0x36,
    Shl = 0x37,
    Shr = 0x38,
    And = 0x39,
    Or = 0x3A,
    Not = 0x3B,
    EqZ = 0x3C,
    NeqZ = 0x3D,

    // === Comparison (0x40-0x4F) ===
    Eq = 0x40,
    Neq = 0x41,
    Lt = 0x42,
    Lte = 0x43,
    Gt = 0x44,
    Gte = 0x45,

    // === Bindings (0x50-0x5F) ===
    /// Pop value and reference, bind them
    Def = 0x50,
    /// Pop a reference, remove its binding
    Undef = 0x51,

    // === Control Flow (0x60-0x6F) ===
    If = 0x60,
    IfElse = 0x61,
    Repeat = 0x62,
    Times = 0x63,
    For = 0x64,
    Break = 0x65,
    Debug = 0x66,

    // === Accumulator (0x70-0x7F) ===
    ASet = 0x70,
    AGet = 0x71,

    // === Strings (0x80-0x8F) ===
    At = 0x80,
    Head = 0x81,
    Tail = 0x82,
    Len = 0x83,
    Expl = 0x84,
    Join = 0x85,
    Impl = 0x86,
    Split = 0x87,
}

impl Opcode {
    /// Every assigned opcode, in byte order
    pub const ALL: [Opcode; 78] = [
        Self::Null,
        Self::Pop, Self::Swap, Self::Dup, Self::Count, Self::Index, Self::Copy,
        Self::Roll, Self::Rev, Self::Mark, Self::IsMark, Self::Ctm,
        Self::Int8, Self::Int16, Self::Int24, Self::Int32, Self::Str8, Self::Str16,
        Self::Code8, Self::Code16, Self::Code24, Self::Code32, Self::Ref, Self::RefVal,
        Self::Push0, Self::Push1, Self::Push2, Self::Push3,
        Self::Push4, Self::Push5, Self::Push6, Self::Push7,
        Self::PushM1, Self::PushM2, Self::PushM3, Self::PushM4,
        Self::PushM5, Self::PushM6, Self::PushM7,
        Self::Add, Self::Sub, Self::Mul, Self::Div, Self::Mod, Self::Inc, Self::Dec,
        Self::Shl, Self::Shr, Self::And, Self::Or, Self::Not, Self::EqZ, Self::NeqZ,
        Self::Eq, Self::Neq, Self::Lt, Self::Lte, Self::Gt, Self::Gte,
        Self::Def, Self::Undef,
        Self::If, Self::IfElse, Self::Repeat, Self::Times, Self::For, Self::Break, Self::Debug,
        Self::ASet, Self::AGet,
        Self::At, Self::Head, Self::Tail, Self::Len, Self::Expl, Self::Join, Self::Impl,
        Self::Split,
    ];

    /// Convert byte to opcode, returns None if unassigned
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE[byte as usize]
    }

    /// Convert opcode to byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Number of fixed operand bytes following this opcode.
    ///
    /// For string and code literals this is the length prefix only; the body
    /// follows it.
    #[inline]
    pub fn immediate_size(self) -> usize {
        match self {
            Self::Int8 | Self::Str8 | Self::Code8 => 1,
            Self::Int16 | Self::Str16 | Self::Code16 => 2,
            Self::Int24 | Self::Code24 => 3,
            Self::Int32 | Self::Code32 | Self::Ref | Self::RefVal => 4,
            _ => 0,
        }
    }

    /// Value pushed by the one-byte integer shorthands
    #[inline]
    pub fn small_value(self) -> Option<i32> {
        let byte = self as u8;
        match byte {
            0x20..=0x27 => Some((byte - 0x20) as i32),
            0x29..=0x2F => Some(-((byte - 0x28) as i32)),
            _ => None,
        }
    }

    /// One-byte shorthand for `value`, if it has one
    #[inline]
    pub fn for_small_value(value: i32) -> Option<Self> {
        match value {
            0..=7 => Self::from_byte(0x20 + value as u8),
            -7..=-1 => Self::from_byte(0x28 + (-value) as u8),
            _ => None,
        }
    }

    /// Get the mnemonic name for this opcode
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Pop => "pop",
            Self::Swap => "swap",
            Self::Dup => "dup",
            Self::Count => "count",
            Self::Index => "index",
            Self::Copy => "copy",
            Self::Roll => "roll",
            Self::Rev => "rev",
            Self::Mark => "mark",
            Self::IsMark => "ismark",
            Self::Ctm => "ctm",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int24 => "int24",
            Self::Int32 => "int32",
            Self::Str8 => "str8",
            Self::Str16 => "str16",
            Self::Code8 => "code8",
            Self::Code16 => "code16",
            Self::Code24 => "code24",
            Self::Code32 => "code32",
            Self::Ref => "ref",
            Self::RefVal => "refval",
            Self::Push0 => "push0",
            Self::Push1 => "push1",
            Self::Push2 => "push2",
            Self::Push3 => "push3",
            Self::Push4 => "push4",
            Self::Push5 => "push5",
            Self::Push6 => "push6",
            Self::Push7 => "push7",
            Self::PushM1 => "pushm1",
            Self::PushM2 => "pushm2",
            Self::PushM3 => "pushm3",
            Self::PushM4 => "pushm4",
            Self::PushM5 => "pushm5",
            Self::PushM6 => "pushm6",
            Self::PushM7 => "pushm7",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::EqZ => "eqz",
            Self::NeqZ => "neqz",
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Def => "def",
            Self::Undef => "undef",
            Self::If => "if",
            Self::IfElse => "ifelse",
            Self::Repeat => "repeat",
            Self::Times => "times",
            Self::For => "for",
            Self::Break => "break",
            Self::Debug => "debug",
            Self::ASet => "aset",
            Self::AGet => "aget",
            Self::At => "at",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Len => "len",
            Self::Expl => "expl",
            Self::Join => "join",
            Self::Impl => "impl",
            Self::Split => "split",
        }
    }

    /// Look up an opcode by mnemonic, ignoring ASCII case
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Lookup table for byte -> Opcode conversion
static OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < Opcode::ALL.len() {
        let op = Opcode::ALL[i];
        table[op as usize] = Some(op);
        i += 1;
    }
    table
};
