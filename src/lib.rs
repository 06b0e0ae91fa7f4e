/// AVM - a minimal concatenative stack machine
///
/// This library provides a Forth/PostScript-style bytecode virtual machine:
/// programs push objects onto a stack and opcodes consume and produce them.
/// Quoted code blocks are first-class values, so conditionals, loops and
/// named procedures are all expressed by handing code objects to opcodes.
///
/// # Architecture
///
/// 1. **Assembly** (`asm` module)
///    - Tokenizes mnemonic source (`2 3 add`, `@x 5 def`, `{ dup mul }`)
///    - Emits the shortest encoding for every literal
///    - Hashes reference names with the same function the VM uses
///
/// 2. **Execution** (`backend` module)
///    - Object model: marks, integers, strings, code, references, externals
///    - Operand stack addressed from the top
///    - Binding dictionary keyed by 32-bit name hashes
///    - Integer recycling pool
///    - Opcode table and the execution engine
///
/// # Example
///
/// ```rust
/// use avm::asm::assemble;
/// use avm::backend::{Object, Stack, Vm};
///
/// let code = assemble("@square { dup mul } def  7 $square").unwrap();
///
/// let mut vm = Vm::new();
/// let mut stack = Stack::new();
/// vm.run(&code, &mut stack).unwrap();
///
/// assert_eq!(stack.pop(), Some(Object::integer(49)));
/// ```
///
/// # Errors
///
/// Execution stops at the first failing instruction. The error is returned
/// from `run` and also recorded on the VM together with the byte offset
/// where it was detected, so hosts can report it after the fact.
pub mod asm;
pub mod backend;

pub use asm::{assemble, AsmError, Assembler};
pub use backend::{Object, ObjectType, Stack, Vm, VmConfig, VmError, VmResult};
