// OfficeFloor Execution
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Linked list set benchmarks
//!
//! Covers the bookkeeping paths that sit on hot team operations:
//! - Append and detach of entries
//! - Snapshot copies for iteration outside the owner's lock
//! - Purge and walk of the detached chain
//! - Linear deduplication of the comparator variant

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use officefloor_core::{ComparatorLinkedListSet, LinkedListSet, OwnerId};

const SIZES: [usize; 3] = [16, 256, 4096];

fn filled(size: usize) -> LinkedListSet<usize> {
    let mut list = LinkedListSet::new(OwnerId::new());
    for value in 0..size {
        list.push(value);
    }
    list
}

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");
    for size in SIZES {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut list = filled(size);
            let key = list.create_entry(usize::MAX);
            b.iter(|| {
                list.add_entry(black_box(key)).unwrap();
                list.remove_entry(black_box(key)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_copy_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_entries");
    for size in SIZES {
        let list = filled(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &list, |b, list| b.iter(|| black_box(list.copy_entries())));
    }
    group.finish();
}

fn bench_purge_and_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("purge_and_walk");
    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || filled(size),
                |mut list| {
                    let head = list.purge_entries();
                    black_box(list.chain(head).count())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_comparator_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("comparator_push");
    for size in SIZES {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut list = ComparatorLinkedListSet::new(OwnerId::new(), |a: &usize, b: &usize| a == b);
            for value in 0..size {
                list.push(value);
            }
            // Duplicate of the tail, so every push scans the whole list
            b.iter(|| black_box(list.push(black_box(size - 1))));
        });
    }
    group.finish();
}

criterion_group!(
    list_benches,
    bench_add_remove,
    bench_copy_entries,
    bench_purge_and_walk,
    bench_comparator_push
);
criterion_main!(list_benches);
