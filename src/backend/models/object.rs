//! Object model for the AVM.
//!
//! Every value the machine manipulates is an [`Object`]. The set of variants
//! is closed; each variant carries a stable wire tag (see [`ObjectType`]).
//! Objects are owned by exactly one place (a stack slot, a dictionary entry,
//! the accumulator) and move between places by value.

use std::fmt;
use std::sync::Arc;

use crate::backend::bytecode::vm::{Vm, VmResult};
use crate::backend::stack::Stack;

/// Opaque native function handle. Never dispatched by an opcode; the host may
/// fetch it back out of a binding and call it itself.
pub type ExternalFn = fn(&mut Vm, &mut Stack) -> VmResult<()>;

/// Type tag of an object
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Mark = 1,
    Integer = 2,
    String = 3,
    Code = 4,
    Ref = 5,
    External = 6,
}

impl ObjectType {
    /// Lower-case name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Mark => "mark",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Code => "code",
            Self::Ref => "ref",
            Self::External => "external",
        }
    }

    /// Wire tag value
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A VM value.
///
/// Integers are boxed so that their allocations can be handed back to the
/// [`IntegerPool`](crate::backend::pool::IntegerPool) and reused. Code is
/// immutable, so sharing the buffer is indistinguishable from a deep copy and
/// lets a block keep running after the binding it came from is replaced.
#[derive(Debug, Clone)]
pub enum Object {
    /// Stack delimiter used by `mark`/`ctm`
    Mark,
    /// Signed 32-bit integer
    Integer(Box<i32>),
    /// Mutable byte string
    String(Vec<u8>),
    /// Quoted instruction stream
    Code(Arc<[u8]>),
    /// Name hash used as a dictionary key
    Ref(u32),
    /// Native function handle
    External(ExternalFn),
}

impl Object {
    // === Constructors ===

    #[inline]
    pub fn mark() -> Self {
        Object::Mark
    }

    /// Fresh integer allocation. Inside the engine integers come from
    /// [`Vm::integer`] so the pool is consulted first.
    #[inline]
    pub fn integer(value: i32) -> Self {
        Object::Integer(Box::new(value))
    }

    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(bytes.into())
    }

    pub fn text(text: &str) -> Self {
        Object::String(text.as_bytes().to_vec())
    }

    /// Zero-filled string of `size` bytes
    pub fn zeroed_string(size: usize) -> Self {
        Object::String(vec![0; size])
    }

    pub fn code(bytes: impl Into<Arc<[u8]>>) -> Self {
        Object::Code(bytes.into())
    }

    #[inline]
    pub fn reference(hash: u32) -> Self {
        Object::Ref(hash)
    }

    pub fn external(function: ExternalFn) -> Self {
        Object::External(function)
    }

    // === Inspection ===

    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Mark => ObjectType::Mark,
            Object::Integer(_) => ObjectType::Integer,
            Object::String(_) => ObjectType::String,
            Object::Code(_) => ObjectType::Code,
            Object::Ref(_) => ObjectType::Ref,
            Object::External(_) => ObjectType::External,
        }
    }

    /// Payload size in bytes for this object's tag
    pub fn raw_size(&self) -> usize {
        match self {
            Object::Mark => 0,
            Object::Integer(_) => std::mem::size_of::<i32>(),
            Object::String(bytes) => bytes.len(),
            Object::Code(code) => code.len(),
            Object::Ref(_) => std::mem::size_of::<u32>(),
            Object::External(_) => std::mem::size_of::<ExternalFn>(),
        }
    }

    #[inline]
    pub fn is_mark(&self) -> bool {
        matches!(self, Object::Mark)
    }

    #[inline]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Object::Integer(value) => Some(**value),
            _ => None,
        }
    }

    #[inline]
    pub fn as_integer_mut(&mut self) -> Option<&mut i32> {
        match self {
            Object::Integer(value) => Some(&mut **value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_bytes_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Object::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&Arc<[u8]>> {
        match self {
            Object::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn as_ref_hash(&self) -> Option<u32> {
        match self {
            Object::Ref(hash) => Some(*hash),
            _ => None,
        }
    }

    pub fn as_external(&self) -> Option<ExternalFn> {
        match self {
            Object::External(function) => Some(*function),
            _ => None,
        }
    }

    /// Truth value for conditionals: nonzero integers and nonempty strings
    /// are true. Other tags have no truth value.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Object::Integer(value) => Some(**value != 0),
            Object::String(bytes) => Some(!bytes.is_empty()),
            _ => None,
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Mark, Object::Mark) => true,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Code(a), Object::Code(b)) => a == b,
            (Object::Ref(a), Object::Ref(b)) => a == b,
            (Object::External(a), Object::External(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

impl Eq for Object {}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::integer(value)
    }
}

impl From<&str> for Object {
    fn from(text: &str) -> Self {
        Object::text(text)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Mark => write!(f, "<mark>"),
            Object::Integer(value) => write!(f, "{}", value),
            Object::String(bytes) => write!(f, "\"{}\"", bytes.escape_ascii()),
            Object::Code(code) => write!(f, "{{code: {} bytes}}", code.len()),
            Object::Ref(hash) => write!(f, "@{:08x}", hash),
            Object::External(_) => write!(f, "<external>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_vm: &mut Vm, _stack: &mut Stack) -> VmResult<()> {
        Ok(())
    }

    #[test]
    fn test_object_type_tags() {
        assert_eq!(Object::mark().object_type().tag(), 1);
        assert_eq!(Object::integer(3).object_type().tag(), 2);
        assert_eq!(Object::text("x").object_type().tag(), 3);
        assert_eq!(Object::code(vec![0x20u8]).object_type().tag(), 4);
        assert_eq!(Object::reference(7).object_type().tag(), 5);
        assert_eq!(Object::external(noop).object_type().tag(), 6);
    }

    #[test]
    fn test_raw_size() {
        assert_eq!(Object::mark().raw_size(), 0);
        assert_eq!(Object::integer(-1).raw_size(), 4);
        assert_eq!(Object::zeroed_string(9).raw_size(), 9);
        assert_eq!(Object::code(vec![1u8, 2, 3]).raw_size(), 3);
        assert_eq!(Object::reference(0).raw_size(), 4);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = Object::text("abc");
        let mut copy = original.clone();
        copy.as_bytes_mut().unwrap().push(b'd');
        assert_eq!(original.as_bytes(), Some(&b"abc"[..]));
        assert_eq!(copy.as_bytes(), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Object::integer(0).truthiness(), Some(false));
        assert_eq!(Object::integer(-4).truthiness(), Some(true));
        assert_eq!(Object::text("").truthiness(), Some(false));
        assert_eq!(Object::text("a").truthiness(), Some(true));
        assert_eq!(Object::mark().truthiness(), None);
        assert_eq!(Object::reference(1).truthiness(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Object::integer(-12).to_string(), "-12");
        assert_eq!(Object::text("a\n").to_string(), "\"a\\n\"");
        assert_eq!(Object::reference(0xabc).to_string(), "@00000abc");
        assert_eq!(Object::mark().to_string(), "<mark>");
    }
}
