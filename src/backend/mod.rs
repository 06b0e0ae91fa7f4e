// Backend module for the AVM
//
// Leaf to root:
// - `stack`, `dict`, `pool`: containers the machine owns or borrows
// - `models`: the object model
// - `bytecode`: opcodes, code builder and the execution engine
// - `config`, `hash_utils`: VM configuration and reference hashing

pub mod bytecode;
pub mod config;
pub mod dict;
pub mod hash_utils;
pub mod models;
pub mod pool;
pub mod stack;

pub use bytecode::{CodeBuilder, Opcode, Vm, VmError, VmResult, NO_ERROR};
pub use config::{ConfigError, VmConfig};
pub use dict::Dict;
pub use hash_utils::{murmur3_32, HashFn, DEFAULT_HASH_SEED};
pub use models::*;
pub use pool::{IntegerPool, PoolStats};
pub use stack::Stack;
