//! Dispatch benchmarks for the AVM
//!
//! Measures the decode loop on integer-heavy programs, with and without the
//! integer pool, plus the cost of calling named procedures.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use avm::asm::Assembler;
use avm::backend::{CodeBuilder, Opcode};
use avm::{Vm, VmConfig};

/// Run `code` on a fresh stack, returning the number of objects left
fn run(vm: &mut Vm, code: &[u8]) -> usize {
    let mut stack = vm.new_stack();
    vm.run(code, &mut stack).expect("VM execution failed");
    stack.size()
}

fn vm_with_pool(pool: usize) -> Vm {
    Vm::with_config(VmConfig::default().with_pool_size(pool)).expect("pool reservation failed")
}

// ============================================================================
// Benchmark 1: Straight-line arithmetic
// ============================================================================

/// `0 (i add)*n`
fn build_add_chain(n: usize) -> Vec<u8> {
    let mut builder = CodeBuilder::new();
    builder.emit_int(0);
    for i in 0..n {
        builder.emit_int(i as i32).emit(Opcode::Add);
    }
    builder.build()
}

fn bench_add_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_chain");
    group.measurement_time(Duration::from_secs(5));

    for n in [16, 256, 4096] {
        let code = build_add_chain(n);
        group.throughput(Throughput::Elements(2 * n as u64));

        for pool in [0, 256] {
            group.bench_with_input(BenchmarkId::new(format!("pool-{}", pool), n), &code, |b, code| {
                let mut vm = vm_with_pool(pool);
                b.iter(|| run(&mut vm, black_box(code)))
            });
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark 2: Loops
// ============================================================================

fn bench_for_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_loop");

    for limit in [100, 10_000] {
        let code = Assembler::new()
            .assemble(&format!("0  1 1 {} {{ add }} for", limit))
            .expect("assembly failed");
        group.throughput(Throughput::Elements(limit as u64));

        for pool in [0, 256] {
            group.bench_with_input(
                BenchmarkId::new(format!("pool-{}", pool), limit),
                &code,
                |b, code| {
                    let mut vm = vm_with_pool(pool);
                    b.iter(|| run(&mut vm, black_box(code)))
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Benchmark 3: Procedure calls
// ============================================================================

fn bench_refval_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("refval_calls");

    let mut vm = vm_with_pool(256);
    let assembler = Assembler::for_vm(&vm);
    let define = assembler
        .assemble("@step { 3 mul 7 add 1000 mod } def")
        .expect("assembly failed");
    run(&mut vm, &define);

    for calls in [10, 1000] {
        let code = assembler
            .assemble(&format!("1 {} {{ $step }} repeat", calls))
            .expect("assembly failed");
        group.throughput(Throughput::Elements(calls as u64));
        group.bench_with_input(BenchmarkId::from_parameter(calls), &code, |b, code| {
            b.iter(|| run(&mut vm, black_box(code)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add_chain, bench_for_loop, bench_refval_calls);
criterion_main!(benches);
