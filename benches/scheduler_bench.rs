//! Benchmarks for the slot scheduler.
//!
//! Benchmarks cover:
//! - Full passes over a pool of yielding slots
//! - Readiness lookup by descriptor
//! - Deadline sweeps
//! - Admit/complete/release cycles through the in-memory backend

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use prometheus_slot_scheduler::core::{
    Interest, Outcome, Scheduler, Slot, SlotHandle, SlotPool, Step,
};
use prometheus_slot_scheduler::infra::multiplexer::memory::InMemoryMultiplexer;
use prometheus_slot_scheduler::infra::Events;
use prometheus_slot_scheduler::util::ManualClock;

type Handler = fn(SlotHandle, &mut Slot<u64>) -> Step;

fn yield_forever(_h: SlotHandle, _slot: &mut Slot<u64>) -> Step {
    Step::Yield
}

fn finish(_h: SlotHandle, slot: &mut Slot<u64>) -> Step {
    Step::Complete(Outcome::Success(slot.request().copied().unwrap_or_default()))
}

fn wait_on_own_fd(_h: SlotHandle, slot: &mut Slot<u64>) -> Step {
    let fd = slot.output_fd().unwrap_or(-1);
    Step::WaitFor {
        fd,
        interest: Interest::Readable,
        timeout: Some(60),
    }
}

fn scheduler(slots: usize, handler: Handler) -> Scheduler<u64, Handler, InMemoryMultiplexer, ManualClock> {
    Scheduler::new(slots, handler, InMemoryMultiplexer::new(3), ManualClock::new(0))
}

// ============================================================================
// Scheduler passes
// ============================================================================

fn bench_run_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_pass_yielding");

    for size in [16_u64, 256, 4_096] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sched = scheduler(size as usize, yield_forever);
            for i in 0..size {
                sched.admit(10 + i as i32, i).unwrap();
            }
            b.iter(|| black_box(sched.run_pass()));
        });
    }
    group.finish();
}

fn bench_admit_release_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("admit_release_cycle");

    for size in [16_u64, 256] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sched = scheduler(size as usize, finish);
            b.iter(|| {
                for i in 0..size {
                    sched.admit(10 + i as i32, i).unwrap();
                }
                while let Some(done) = sched.run_pass() {
                    black_box(sched.release(done).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_wait_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_dispatch");

    for size in [16_u64, 256] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sched = scheduler(size as usize, wait_on_own_fd);
            for i in 0..size {
                sched.admit(10 + i as i32, i).unwrap();
            }
            let mut events = Events::with_capacity(size as usize);
            b.iter(|| {
                sched.run_pass();
                sched.run_pass();
                for i in 0..size {
                    sched.multiplexer_mut().push_ready(10 + i as i32, Interest::Readable);
                }
                black_box(sched.turn(&mut events).unwrap());
            });
        });
    }
    group.finish();
}

// ============================================================================
// Pool lookups
// ============================================================================

fn bench_find_by_fd(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_by_fd");

    for size in [16_u64, 256, 4_096] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sched = scheduler(size as usize, wait_on_own_fd);
            for i in 0..size {
                sched.admit(10 + i as i32, i).unwrap();
            }
            sched.run_pass();
            let last = 10 + size as i32 - 1;
            b.iter(|| black_box(sched.pool().find_by_fd(black_box(last), Some(Interest::Readable))));
        });
    }
    group.finish();
}

fn bench_deadline_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("deadline_sweep");

    for size in [16_usize, 256, 4_096] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let pool: SlotPool<u64> = SlotPool::new(size);
            b.iter(|| {
                black_box(pool.soonest_deadline(black_box(10)));
                black_box(pool.has_overdue(10));
            });
        });
    }
    group.finish();
}

criterion_group!(
    scheduler_benches,
    bench_run_pass,
    bench_admit_release_cycle,
    bench_wait_dispatch
);

criterion_group!(pool_benches, bench_find_by_fd, bench_deadline_sweep);

criterion_main!(scheduler_benches, pool_benches);
