//! Bytecode Virtual Machine
//!
//! [`Vm`] owns everything that outlives a single run: the binding dictionary,
//! the accumulator, the integer pool, the hash function and the error and
//! instruction bookkeeping. Executing code borrows a `Vm` and a caller-owned
//! [`Stack`] into a `Machine`, which walks the instruction stream with a
//! [`Cursor`]. Quoted code runs through the same machine with a fresh cursor,
//! so a block's stack and binding effects persist in its caller.
//!
//! This module is organized into submodules by functionality:
//! - `types`: Core type definitions (VmError, Flow, Cursor)
//! - `stack`: Stack manipulation operations
//! - `value_ops`: Literal decoding
//! - `arithmetic`: Integer arithmetic
//! - `comparison`: Comparison operations
//! - `environment_ops`: Bindings and reference resolution
//! - `control_flow`: Conditionals and loops
//! - `state_ops`: Accumulator operations
//! - `string_ops`: Byte string operations
//! - `debug_ops`: Debugging operations

use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::opcodes::Opcode;
use crate::backend::config::VmConfig;
use crate::backend::dict::Dict;
use crate::backend::hash_utils::{murmur3_32, HashFn};
use crate::backend::models::Object;
use crate::backend::pool::{IntegerPool, PoolStats};
use crate::backend::stack::Stack;

// === Submodules ===

mod arithmetic;
mod comparison;
mod control_flow;
mod debug_ops;
mod environment_ops;
mod stack;
mod state_ops;
mod string_ops;
mod types;
mod value_ops;


// === Re-exports ===

pub use types::{Cursor, Flow, VmError, VmResult, AVM_VERSION, NO_ERROR};

// === Vm Struct ===

/// A virtual machine instance
#[derive(Debug)]
pub struct Vm {
    version: u16,

    /// Hash used for reference names
    hash_fn: HashFn,
    hash_seed: u32,

    /// Code and top-level byte offset of the last failure
    error_code: u16,
    error_pos: Option<usize>,

    /// Successfully executed instructions, nested ones included
    instruction_count: u64,

    /// Single-slot register for `aset`/`aget`
    acc: Option<Object>,

    /// Bindings, created by the first definition
    vars: Option<Dict>,

    /// Recycler for integer allocations
    pool: Option<IntegerPool>,

    config: VmConfig,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    // === Constructors ===

    /// Create a VM with default configuration (no integer pool)
    pub fn new() -> Self {
        Self::unpooled(VmConfig::default())
    }

    /// Create a VM with custom configuration.
    ///
    /// Fails with `NoMem` when the integer pool cannot be reserved.
    pub fn with_config(config: VmConfig) -> VmResult<Self> {
        let pool_size = config.integer_pool_size;
        let mut vm = Self::unpooled(config);
        vm.tune(pool_size)?;
        Ok(vm)
    }

    fn unpooled(config: VmConfig) -> Self {
        Self {
            version: AVM_VERSION,
            hash_fn: murmur3_32,
            hash_seed: config.hash_seed,
            error_code: NO_ERROR,
            error_pos: None,
            instruction_count: 0,
            acc: None,
            vars: None,
            pool: None,
            config,
        }
    }

    /// Stack sized according to this VM's configuration
    pub fn new_stack(&self) -> Stack {
        Stack::with_reserve(self.config.stack_reserve)
    }

    // === Execution ===

    /// Execute `code` against `stack`.
    ///
    /// Runs until the code is exhausted, an instruction fails, or a `break`
    /// reaches the top level (which ends the run successfully). On failure the
    /// error code and the byte offset where it was detected are recorded.
    pub fn run(&mut self, code: &[u8], stack: &mut Stack) -> VmResult<()> {
        if code.is_empty() {
            return Ok(());
        }

        let mut cursor = Cursor::new(code);
        let result = Machine::new(self, stack).run_cursor(&mut cursor);

        match result {
            Ok(ControlFlow::Continue(())) => Ok(()),
            Ok(ControlFlow::Break(())) => {
                debug!(target: "avm::vm::step", pos = cursor.position(), "break at top level");
                Ok(())
            }
            Err(err) => {
                self.error_code = err.code();
                self.error_pos = Some(cursor.position());
                debug!(
                    target: "avm::vm::step",
                    code = err.code(),
                    pos = cursor.position(),
                    "execution failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    /// Reconfigure the integer pool. Any recycled integers are released; 0
    /// disables the pool.
    pub fn tune(&mut self, pool_size: usize) -> VmResult<()> {
        self.pool = None;
        self.config.integer_pool_size = pool_size;
        if pool_size > 0 {
            let pool = IntegerPool::new(pool_size).ok_or_else(|| {
                warn!(target: "avm::pool", size = pool_size, "could not reserve integer pool");
                VmError::NoMem
            })?;
            self.pool = Some(pool);
        }
        Ok(())
    }

    // === Hashing ===

    /// Replace the hash function; `None` restores the built-in one
    pub fn set_hash_fn(&mut self, hash_fn: Option<HashFn>) {
        self.hash_fn = hash_fn.unwrap_or(murmur3_32);
    }

    pub fn set_hash_seed(&mut self, seed: u32) {
        self.hash_seed = seed;
    }

    pub fn hash_seed(&self) -> u32 {
        self.hash_seed
    }

    pub fn hash_fn(&self) -> HashFn {
        self.hash_fn
    }

    /// Hash a reference name the way `ref`/`refval` operands are keyed
    pub fn hash(&self, name: impl AsRef<[u8]>) -> u32 {
        (self.hash_fn)(name.as_ref(), self.hash_seed)
    }

    // === Variables ===

    fn dict_mut(&mut self) -> &mut Dict {
        let size_exp = self.config.dict_size_exp;
        self.vars.get_or_insert_with(|| Dict::new(size_exp))
    }

    /// Bind `value` under a hash key, releasing any previous value
    pub(crate) fn bind(&mut self, key: u32, value: Object) {
        if let Some(previous) = self.dict_mut().set(key, value) {
            self.release(previous);
        }
    }

    /// Remove the binding for a hash key, releasing its value
    pub(crate) fn unbind(&mut self, key: u32) -> bool {
        match self.vars.as_mut().and_then(|vars| vars.remove(key)) {
            Some(value) => {
                self.release(value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn lookup(&self, key: u32) -> Option<&Object> {
        self.vars.as_ref()?.get(key)
    }

    /// Bind `value` to `name`, as `@name value def` would
    pub fn set_variable(&mut self, name: &str, value: Object) {
        let key = self.hash(name);
        self.bind(key, value);
    }

    /// Value bound to `name`
    pub fn variable(&self, name: &str) -> Option<&Object> {
        self.lookup(self.hash(name))
    }

    /// Remove the binding of `name`; returns whether one existed
    pub fn remove_variable(&mut self, name: &str) -> bool {
        let key = self.hash(name);
        self.unbind(key)
    }

    /// Number of live bindings
    pub fn binding_count(&self) -> usize {
        self.vars.as_ref().map_or(0, Dict::len)
    }

    // === Objects ===

    /// Integer object, reusing a pooled allocation when one is available
    pub fn integer(&mut self, value: i32) -> Object {
        match self.pool.as_mut() {
            Some(pool) => Object::Integer(pool.get(value)),
            None => Object::integer(value),
        }
    }

    /// Give up ownership of `object`, recycling integers through the pool
    pub fn release(&mut self, object: Object) {
        if let Some(pool) = self.pool.as_mut() {
            pool.release(object);
        }
    }

    /// Independent duplicate of `object`
    pub fn copy(&mut self, object: &Object) -> Object {
        match object {
            Object::Integer(value) => self.integer(**value),
            other => other.clone(),
        }
    }

    // === Introspection ===

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Code of the last failure, `NO_ERROR` if there was none
    pub fn error_code(&self) -> u16 {
        self.error_code
    }

    pub fn last_error(&self) -> Option<VmError> {
        VmError::from_code(self.error_code)
    }

    /// Byte offset in the top-level code where the last failure was detected
    pub fn error_position(&self) -> Option<usize> {
        self.error_pos
    }

    /// Forget the last failure
    pub fn clear_error(&mut self) {
        self.error_code = NO_ERROR;
        self.error_pos = None;
    }

    pub fn instruction_count(&self) -> u64 {
        self.instruction_count
    }

    pub fn accumulator(&self) -> Option<&Object> {
        self.acc.as_ref()
    }

    pub fn take_accumulator(&mut self) -> Option<Object> {
        self.acc.take()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.pool.as_ref().map(IntegerPool::stats)
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }
}

// === Machine ===

/// Execution state for one `run`: the VM and the stack it operates on
struct Machine<'a> {
    vm: &'a mut Vm,
    stack: &'a mut Stack,
    /// Nesting level of quoted code currently executing
    depth: usize,
}

impl<'a> Machine<'a> {
    fn new(vm: &'a mut Vm, stack: &'a mut Stack) -> Self {
        Self {
            vm,
            stack,
            depth: 0,
        }
    }

    /// Execute instructions until the cursor is exhausted or a `break`
    fn run_cursor(&mut self, cursor: &mut Cursor<'_>) -> VmResult<Flow> {
        while !cursor.at_end() {
            if self.step(cursor)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Run a quoted code block with its own cursor
    pub(super) fn execute(&mut self, code: &Arc<[u8]>) -> VmResult<Flow> {
        self.depth += 1;
        trace!(target: "avm::vm::call", depth = self.depth, len = code.len(), "enter block");

        let mut cursor = Cursor::new(code);
        let result = self.run_cursor(&mut cursor);

        if let Err(err) = &result {
            debug!(
                target: "avm::vm::call",
                depth = self.depth,
                pos = cursor.position(),
                "nested block failed: {}",
                err
            );
        }
        trace!(target: "avm::vm::call", depth = self.depth, "leave block");
        self.depth -= 1;
        result
    }

    /// Decode and execute one instruction
    fn step(&mut self, cursor: &mut Cursor<'_>) -> VmResult<Flow> {
        let ip = cursor.position();
        let byte = cursor.read_u8().ok_or(VmError::NoCode)?;
        let opcode = Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode)?;

        if self.vm.config.trace {
            trace!(
                target: "avm::vm::step",
                ip,
                depth = self.depth,
                opcode = %opcode,
                stack_depth = self.stack.size()
            );
        }

        let mut flow = ControlFlow::Continue(());

        match opcode {
            Opcode::Null => return Err(VmError::NullOpcode),

            // Stack operations
            Opcode::Pop => self.op_pop()?,
            Opcode::Swap => self.op_swap()?,
            Opcode::Dup => self.op_dup()?,
            Opcode::Count => self.op_count()?,
            Opcode::Index => self.op_index()?,
            Opcode::Copy => self.op_copy()?,
            Opcode::Roll => self.op_roll()?,
            Opcode::Rev => self.op_rev()?,
            Opcode::Mark => self.op_mark()?,
            Opcode::IsMark => self.op_is_mark()?,
            Opcode::Ctm => self.op_ctm()?,

            // Literals
            Opcode::Int8 => self.op_int(cursor, 1)?,
            Opcode::Int16 => self.op_int(cursor, 2)?,
            Opcode::Int24 => self.op_int(cursor, 3)?,
            Opcode::Int32 => self.op_int(cursor, 4)?,
            Opcode::Str8 => self.op_str(cursor, 1)?,
            Opcode::Str16 => self.op_str(cursor, 2)?,
            Opcode::Code8 => self.op_code(cursor, 1)?,
            Opcode::Code16 => self.op_code(cursor, 2)?,
            Opcode::Code24 => self.op_code(cursor, 3)?,
            Opcode::Code32 => self.op_code(cursor, 4)?,
            Opcode::Ref => self.op_ref(cursor)?,
            Opcode::RefVal => flow = self.op_ref_val(cursor)?,
            Opcode::Push0
            | Opcode::Push1
            | Opcode::Push2
            | Opcode::Push3
            | Opcode::Push4
            | Opcode::Push5
            | Opcode::Push6
            | Opcode::Push7
            | Opcode::PushM1
            | Opcode::PushM2
            | Opcode::PushM3
            | Opcode::PushM4
            | Opcode::PushM5
            | Opcode::PushM6
            | Opcode::PushM7 => self.op_push_small(opcode)?,

            // Arithmetic
            Opcode::Add => self.op_add()?,
            Opcode::Sub => self.op_sub()?,
            Opcode::Mul => self.op_mul()?,
            Opcode::Div => self.op_div()?,
            Opcode::Mod => self.op_mod()?,
            Opcode::Inc => self.op_inc()?,
            Opcode::Dec => self.op_dec()?,
            Opcode::Shl => self.op_shl()?,
            Opcode::Shr => self.op_shr()?,
            Opcode::And => self.op_and()?,
            Opcode::Or => self.op_or()?,
            Opcode::Not | Opcode::EqZ => self.op_eqz()?,
            Opcode::NeqZ => self.op_neqz()?,

            // Comparison
            Opcode::Eq => self.op_eq()?,
            Opcode::Neq => self.op_neq()?,
            Opcode::Lt => self.op_lt()?,
            Opcode::Lte => self.op_lte()?,
            Opcode::Gt => self.op_gt()?,
            Opcode::Gte => self.op_gte()?,

            // Bindings
            Opcode::Def => self.op_def()?,
            Opcode::Undef => self.op_undef()?,

            // Control flow
            Opcode::If => flow = self.op_if()?,
            Opcode::IfElse => flow = self.op_if_else()?,
            Opcode::Repeat => self.op_repeat()?,
            Opcode::Times => self.op_times()?,
            Opcode::For => self.op_for()?,
            Opcode::Break => flow = self.op_break(),
            Opcode::Debug => self.op_debug(ip),

            // Accumulator
            Opcode::ASet => self.op_aset()?,
            Opcode::AGet => self.op_aget()?,

            // Strings
            Opcode::At => self.op_at()?,
            Opcode::Head => self.op_head()?,
            Opcode::Tail => self.op_tail()?,
            Opcode::Len => self.op_len()?,
            Opcode::Expl => self.op_expl()?,
            Opcode::Join => self.op_join()?,
            Opcode::Impl => self.op_impl()?,
            Opcode::Split => self.op_split()?,
        }

        self.vm.instruction_count += 1;
        Ok(flow)
    }
}
