//! Multi-threaded publication ordering.
//!
//! Several threads mutate one sequence while a single subscriber records
//! both channels into one log. The log must read as whole
//! `(change, snapshot)` pairs, each snapshot consistent with its change.

use parking_lot::Mutex;
use seqcast::{ChangeEvent, Notification, ObservableSequence};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Entry {
    Change(ChangeEvent<u32>),
    Snapshot(Vec<u32>),
}

const THREADS: u32 = 8;
const PER_THREAD: u32 = 200;

#[test]
fn publications_never_interleave_across_threads() {
    let seq = ObservableSequence::new(Vec::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let changes = Arc::clone(&log);
    let _c = seq.subscribe_changes(move |note| {
        if let Notification::Next(event) = note {
            changes.lock().push(Entry::Change(event.clone()));
        }
    });
    let snapshots = Arc::clone(&log);
    let _s = seq.subscribe_snapshots(move |note| {
        if let Notification::Next(items) = note {
            snapshots.lock().push(Entry::Snapshot(items.clone()));
        }
    });

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let seq = seq.clone();
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    seq.append(t * 10_000 + i).unwrap();
                    if i % 3 == 0 {
                        seq.remove_first().unwrap();
                    }
                }
            });
        }
    });

    let log = log.lock().clone();
    let mut previous_len = 0usize;
    let mut pairs = 0;
    for pair in log.chunks(2) {
        let [Entry::Change(change), Entry::Snapshot(snapshot)] = pair else {
            panic!("split publication pair: {pair:?}");
        };
        match change {
            ChangeEvent::Insert { index, element } => {
                assert_eq!(*index, previous_len);
                assert_eq!(snapshot.len(), previous_len + 1);
                assert_eq!(snapshot[*index], *element);
            }
            ChangeEvent::Remove { index, .. } => {
                assert_eq!(*index, 0);
                assert_eq!(snapshot.len() + 1, previous_len);
            }
            other => panic!("unexpected change {other:?}"),
        }
        previous_len = snapshot.len();
        pairs += 1;
    }

    let removals = THREADS * PER_THREAD.div_ceil(3);
    assert_eq!(pairs, (THREADS * PER_THREAD + removals) as usize);
    assert_eq!(seq.len(), (THREADS * PER_THREAD - removals) as usize);
    assert_eq!(seq.version(), pairs as u64);
}

#[test]
fn readers_never_observe_partial_bulk_edits() {
    let seq = ObservableSequence::new(vec![0u32; 16]);

    std::thread::scope(|scope| {
        let writer = seq.clone();
        scope.spawn(move || {
            for round in 1..=200u32 {
                writer.set_value(vec![round; 16]).unwrap();
            }
        });

        let reader = seq.clone();
        scope.spawn(move || {
            for _ in 0..500 {
                let snapshot = reader.current_value();
                assert_eq!(snapshot.len(), 16);
                assert!(snapshot.iter().all(|&v| v == snapshot[0]));
            }
        });
    });

    assert_eq!(seq.current_value(), vec![200; 16]);
}
