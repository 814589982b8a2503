//! Full/empty boundaries and occupancy accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use minstant::Instant;

use tandem::Storage;
use tandem::sync::spsc::{self, FenceLayout, HeapLayout, InlineLayout};

const STALL: Duration = Duration::from_millis(50);

/// Capacity 3 → 4 slots. "a", "b", "c" fill the queue; pushing "d" must spin
/// until one pop frees a slot, after which "b" is at the front.
fn abcd_scenario<S>()
where
    S: Storage<String> + 'static,
{
    let (producer, mut consumer) = spsc::channel::<String, S>(3).unwrap();
    assert_eq!(producer.capacity(), 4);
    assert!(consumer.front().is_none());

    for item in ["a", "b", "c"] {
        assert!(producer.push(item.to_string()));
    }
    assert_eq!(consumer.size(), 3);
    assert_eq!(producer.try_push("x".to_string()), Err("x".to_string()));

    let pushed = Arc::new(AtomicBool::new(false));
    let pushed_clone = Arc::clone(&pushed);

    let handle = thread::spawn(move || {
        let start = Instant::now();
        assert!(producer.push("d".to_string()));
        pushed_clone.store(true, Ordering::Release);
        start.elapsed()
    });

    thread::sleep(STALL);
    assert!(!pushed.load(Ordering::Acquire), "push returned while the queue was full");
    assert_eq!(consumer.size(), 3);

    assert!(consumer.pop());
    let stalled_for = handle.join().unwrap();
    assert!(pushed.load(Ordering::Acquire));
    assert!(stalled_for >= STALL, "producer only waited {stalled_for:?}");

    assert_eq!(consumer.front().map(String::as_str), Some("b"));
    assert_eq!(consumer.size(), 3);
    assert_eq!(consumer.take().as_deref(), Some("b"));
    assert_eq!(consumer.take().as_deref(), Some("c"));
    assert_eq!(consumer.take().as_deref(), Some("d"));
    assert!(consumer.front().is_none());
}

#[test]
fn abcd_heap() {
    abcd_scenario::<HeapLayout<String>>();
}

#[test]
fn abcd_inline() {
    abcd_scenario::<InlineLayout<String>>();
}

#[test]
fn abcd_fenced() {
    abcd_scenario::<FenceLayout<String, 4>>();
}

/// After k pushes and j pops, size() == k - j for every fill level.
fn occupancy<S>()
where
    S: Storage<u32> + 'static,
{
    let (producer, mut consumer) = spsc::channel::<u32, S>(15).unwrap();
    let capacity = producer.capacity();
    assert_eq!(capacity, 16);

    // Rotate the cursors through several wraparounds.
    for round in 0..3 {
        for k in 0..capacity - 1 {
            assert_eq!(producer.size(), k, "round {round}");
            assert!(producer.push(k as u32));
        }
        assert_eq!(consumer.size(), capacity - 1);
        assert!(producer.try_push(0).is_err());

        for j in 0..capacity - 1 {
            assert_eq!(consumer.size(), capacity - 1 - j, "round {round}");
            assert!(consumer.pop());
        }
        assert_eq!(consumer.size(), 0);
        assert!(consumer.is_empty());

        // Offset the next round so the cursors start mid-ring.
        producer.push(0);
        assert!(consumer.pop());
    }
}

#[test]
fn occupancy_heap() {
    occupancy::<HeapLayout<u32>>();
}

#[test]
fn occupancy_inline() {
    occupancy::<InlineLayout<u32>>();
}

#[test]
fn occupancy_fenced() {
    occupancy::<FenceLayout<u32, 16>>();
}

#[test]
fn fresh_queue_is_empty() {
    let (producer, mut consumer) = spsc::channel::<u8, InlineLayout<u8>>(0).unwrap();
    assert_eq!(producer.capacity(), 4);
    assert!(consumer.front().is_none());
    assert!(!consumer.pop());
    assert!(consumer.take().is_none());
}

#[test]
fn try_push_never_spins() {
    let (producer, _consumer) = spsc::channel::<u64, HeapLayout<u64>>(3).unwrap();
    for i in 0..3 {
        producer.try_push(i).unwrap();
    }

    let start = Instant::now();
    for _ in 0..1_000 {
        assert_eq!(producer.try_push(7), Err(7));
    }
    assert!(start.elapsed() < Duration::from_secs(1));
}
