//! Shared helpers for integration tests
//!
//! Programs are given as assembler source and run on a fresh VM unless a
//! test passes its own.

use avm::{Assembler, Object, Stack, Vm, VmResult};

/// Assemble `source` for `vm` and run it on a new stack
pub fn run_on(vm: &mut Vm, source: &str) -> (Stack, VmResult<()>) {
    let code = Assembler::for_vm(vm)
        .assemble(source)
        .unwrap_or_else(|e| panic!("assembly failed: {}", e));
    let mut stack = vm.new_stack();
    let result = vm.run(&code, &mut stack);
    (stack, result)
}

/// Run `source` on a default VM
pub fn run(source: &str) -> (Vm, Stack, VmResult<()>) {
    let mut vm = Vm::new();
    let (stack, result) = run_on(&mut vm, source);
    (vm, stack, result)
}

/// Integers left by a successful run, bottom first
pub fn run_ints(source: &str) -> Vec<i32> {
    let (_, stack, result) = run(source);
    if let Err(err) = result {
        panic!("'{}' failed: {}", source, err);
    }
    ints(&stack)
}

pub fn ints(stack: &Stack) -> Vec<i32> {
    let mut values: Vec<i32> = stack
        .iter()
        .map(|object| match object {
            Object::Integer(value) => **value,
            other => panic!("expected an integer, found {}", other),
        })
        .collect();
    values.reverse();
    values
}
