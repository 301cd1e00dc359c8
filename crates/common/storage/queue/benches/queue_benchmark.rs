// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Benchmarks for the disk queue.
//!
//! Measures:
//! - put latency per payload size (Async and Sync flush)
//! - put-then-drain throughput per cache size
//! - peek across chunks
//! - reopen (recovery) time with chunks on disk

use std::hint::black_box;

use bytes::Bytes;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use diskq_queue::{DiskQueue, FlushMode, QueueBuilder};
use tempfile::TempDir;

/// Payload sizes to benchmark (bytes)
const PAYLOAD_SIZES: &[usize] = &[64, 256, 1024, 4096, 16384];

/// Items per throughput iteration
const BATCH_SIZE: usize = 10_000;

fn create_queue(temp_dir: &TempDir, cache_size: usize, flush_mode: FlushMode) -> DiskQueue {
    QueueBuilder::new(temp_dir.path())
        .queue_name("bench")
        .cache_size(cache_size)
        .flush_mode(flush_mode)
        .build()
        .expect("Failed to create queue")
}

fn generate_payload(size: usize) -> Bytes { Bytes::from(vec![0xABu8; size]) }

fn bench_put_latency_async(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_latency_async");

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, 1024, FlushMode::Async);
            let payload = generate_payload(size);

            b.iter(|| {
                queue.put_nowait(black_box(payload.clone())).unwrap();
            });

            queue.close().unwrap();
        });
    }

    group.finish();
}

/// Every put is followed by a sync, so each one pays a chunk write, an index
/// write and their fsyncs.
fn bench_put_sync_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_sync_latency");
    group.sample_size(20);

    for &size in &[64, 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, 1024, FlushMode::Sync);
            let payload = generate_payload(size);

            b.iter(|| {
                queue.put_nowait(black_box(payload.clone())).unwrap();
                queue.sync().unwrap();
            });

            queue.close().unwrap();
        });
    }

    group.finish();
}

fn bench_put_get_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_get_throughput");
    group.sample_size(10);
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));

    for &cache_size in &[16, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(cache_size),
            &cache_size,
            |b, &cache_size| {
                b.iter_batched(
                    || {
                        let temp_dir = TempDir::new().unwrap();
                        let queue = create_queue(&temp_dir, cache_size, FlushMode::Async);
                        (temp_dir, queue, generate_payload(256))
                    },
                    |(temp_dir, queue, payload)| {
                        for _ in 0..BATCH_SIZE {
                            queue.put_nowait(payload.clone()).unwrap();
                        }
                        while let Some(item) = queue.get_nowait().unwrap() {
                            black_box(item);
                        }
                        queue.close().unwrap();
                        drop(temp_dir);
                    },
                    BatchSize::PerIteration,
                );
            },
        );
    }

    group.finish();
}

fn bench_peek(c: &mut Criterion) {
    let mut group = c.benchmark_group("peek");

    for &count in &[1_i64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir, 64, FlushMode::Async);
            for _ in 0..2000 {
                queue.put_nowait(generate_payload(128)).unwrap();
            }

            b.iter(|| black_box(queue.peek(count).unwrap()));

            queue.close().unwrap();
        });
    }

    group.finish();
}

fn bench_reopen(c: &mut Criterion) {
    let mut group = c.benchmark_group("reopen");
    group.sample_size(20);

    for &chunks in &[10_usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(chunks), &chunks, |b, &chunks| {
            let temp_dir = TempDir::new().unwrap();
            {
                let queue = create_queue(&temp_dir, 16, FlushMode::Async);
                for _ in 0..chunks * 16 {
                    queue.put_nowait(generate_payload(64)).unwrap();
                }
                queue.close().unwrap();
            }

            // Opening consumes the head chunk, so both it and the index are
            // restored before every sample.
            let dir = temp_dir.path().join("bench");
            let index = std::fs::read(dir.join("index")).unwrap();
            let head_chunk = std::fs::read(dir.join("00000000.chunk")).unwrap();
            b.iter(|| {
                std::fs::write(dir.join("index"), &index).unwrap();
                std::fs::write(dir.join("00000000.chunk"), &head_chunk).unwrap();
                let queue = create_queue(&temp_dir, 16, FlushMode::Async);
                black_box(queue.len());
                std::mem::forget(queue);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_latency_async,
    bench_put_sync_latency,
    bench_put_get_throughput,
    bench_peek,
    bench_reopen,
);
criterion_main!(benches);
