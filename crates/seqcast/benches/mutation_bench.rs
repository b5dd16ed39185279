//! Mutation throughput with and without subscribers.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use seqcast::{Notification, ObservableSequence};
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    group.bench_function("no_subscribers_1k", |b| {
        b.iter_batched(
            ObservableSequence::<u64>::default,
            |seq| {
                for i in 0..1_000 {
                    seq.append(black_box(i)).unwrap();
                }
                seq
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("two_subscribers_1k", |b| {
        b.iter_batched(
            || {
                let seq = ObservableSequence::<u64>::default();
                let hits = Arc::new(AtomicUsize::new(0));
                let (h1, h2) = (Arc::clone(&hits), Arc::clone(&hits));
                let subs = vec![
                    seq.subscribe_changes(move |note| {
                        if let Notification::Next(event) = note {
                            h1.fetch_add(event.leaf_count(), Ordering::Relaxed);
                        }
                    }),
                    seq.subscribe_snapshots(move |note| {
                        if let Notification::Next(items) = note {
                            h2.fetch_add(items.len(), Ordering::Relaxed);
                        }
                    }),
                ];
                (seq, subs)
            },
            |(seq, subs)| {
                for i in 0..1_000 {
                    seq.append(black_box(i)).unwrap();
                }
                (seq, subs)
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_bulk(c: &mut Criterion) {
    let items: Vec<u64> = (0..1_000).collect();
    c.bench_function("set_value_1k", |b| {
        let seq = ObservableSequence::<u64>::default();
        b.iter(|| seq.set_value(black_box(items.clone())).unwrap())
    });
    c.bench_function("replace_half_1k", |b| {
        let seq = ObservableSequence::new(items.clone());
        let replacement: Vec<u64> = (0..500).rev().collect();
        b.iter(|| seq.replace(250..750, black_box(replacement.clone())).unwrap())
    });
}

criterion_group!(benches, bench_append, bench_bulk);
criterion_main!(benches);
