//! Bytecode VM Module
//!
//! This module provides the AVM's instruction set and the stack machine that
//! executes it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 Assembler text / CodeBuilder                      │
//! │                 mnemonics → bytecode bytes                        │
//! └───────────────────────────────────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                           Vm::run                                 │
//! │                                                                   │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐               │
//! │  │ Stack       │  │ Dictionary  │  │ Accumulator │               │
//! │  │ (caller's)  │  │ (bindings)  │  │             │               │
//! │  └─────────────┘  └─────────────┘  └─────────────┘               │
//! │                                                                   │
//! │  ┌─────────────┐  ┌─────────────────────────────────────────┐    │
//! │  │ Integer     │  │ Cursor per code block                   │    │
//! │  │ pool        │  │  - nested blocks get a fresh cursor     │    │
//! │  └─────────────┘  │  - break unwinds to the nearest loop    │    │
//! │                   └─────────────────────────────────────────┘    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`opcodes`]: Instruction definitions and the byte → opcode table
//! - [`chunk`]: `CodeBuilder` for emitting bytecode
//! - [`vm`]: Virtual machine execution engine
//!
//! # Example
//!
//! ```
//! use avm::backend::bytecode::{CodeBuilder, Opcode, Vm};
//! use avm::backend::{Object, Stack};
//!
//! // 40 + 2
//! let mut builder = CodeBuilder::new();
//! builder.emit_int(40).emit_int(2).emit(Opcode::Add);
//! let code = builder.build();
//!
//! let mut vm = Vm::new();
//! let mut stack = Stack::new();
//! vm.run(&code, &mut stack).expect("execution failed");
//! assert_eq!(stack.at(0), Some(&Object::integer(42)));
//! ```

pub mod chunk;
pub mod opcodes;
pub mod vm;

pub use chunk::CodeBuilder;
pub use opcodes::Opcode;
pub use vm::{Flow, Vm, VmError, VmResult, AVM_VERSION, NO_ERROR};
