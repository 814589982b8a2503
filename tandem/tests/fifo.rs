//! Ordering tests across every placement and cursor strategy.
//!
//! One thread pushes `0..N` in order, another checks it observes exactly
//! `0..N`: no gaps, no duplicates, no reordering. Every variant must produce
//! the same observable sequence.
//!
//! # Running with tracing
//!
//! ```bash
//! RUST_LOG=tandem=debug cargo test --features tracing --test fifo -- --nocapture
//! ```

use std::sync::Once;
use std::thread;

use tandem::barrier::{Hardware, Portable};
use tandem::cache::{Line128, Line32, Line64};
use tandem::sync::spsc::{self, FenceLayout, HeapLayout, InlineLayout};
use tandem::{FencedCursors, Inline, Separate, Storage};

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once).
fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        tandem::init_tracing();
    });
}

const ITEMS: u64 = 1_000_000;
const CAPACITY: usize = 1024;

/// Streams `0..count` through a queue and returns a digest of what the
/// consumer saw, panicking on the first out-of-order value.
fn stream<S>(count: u64, capacity: usize) -> (u64, u64)
where
    S: Storage<u64> + 'static,
{
    init_test_tracing();
    let (producer, mut consumer) = spsc::channel::<u64, S>(capacity).unwrap();

    let producer_handle = thread::spawn(move || {
        for i in 0..count {
            assert!(producer.push(i));
        }
    });

    let consumer_handle = thread::spawn(move || {
        let mut sum = 0u64;
        let mut last = None;
        for expected in 0..count {
            let value = loop {
                if let Some(&value) = consumer.front() {
                    break value;
                }
                std::hint::spin_loop();
            };
            assert_eq!(value, expected, "out of order after {last:?}");
            assert!(consumer.pop());
            sum = sum.wrapping_add(value);
            last = Some(value);
        }
        assert!(consumer.front().is_none());
        (sum, last.unwrap_or_default())
    });

    producer_handle.join().unwrap();
    consumer_handle.join().unwrap()
}

fn expected_digest(count: u64) -> (u64, u64) {
    (count * (count - 1) / 2, count - 1)
}

#[test]
fn heap_layout_preserves_order() {
    assert_eq!(stream::<HeapLayout<u64>>(ITEMS, CAPACITY), expected_digest(ITEMS));
}

#[test]
fn inline_layout_preserves_order() {
    assert_eq!(stream::<InlineLayout<u64>>(ITEMS, CAPACITY), expected_digest(ITEMS));
}

#[test]
fn fence_layout_preserves_order() {
    assert_eq!(
        stream::<FenceLayout<u64, { CAPACITY + 1 }>>(ITEMS, CAPACITY),
        expected_digest(ITEMS)
    );
}

#[test]
fn strategies_observe_identical_sequences() {
    let reference = stream::<InlineLayout<u64>>(ITEMS, CAPACITY);
    assert_eq!(stream::<Inline<u64, FencedCursors<Line64, Portable>>>(ITEMS, CAPACITY), reference);
    assert_eq!(stream::<Inline<u64, FencedCursors<Line64, Hardware>>>(ITEMS, CAPACITY), reference);
    assert_eq!(stream::<Separate<u64, FencedCursors<Line64, Portable>>>(ITEMS, CAPACITY), reference);
}

#[test]
fn line_sizes_do_not_change_behaviour() {
    let count = 100_000;
    let reference = expected_digest(count);
    assert_eq!(stream::<InlineLayout<u64, Line32>>(count, 256), reference);
    assert_eq!(stream::<InlineLayout<u64, Line128>>(count, 256), reference);
    assert_eq!(stream::<HeapLayout<u64, Line128>>(count, 256), reference);
    assert_eq!(stream::<FenceLayout<u64, 257, Line32>>(count, 256), reference);
}

#[test]
fn tiny_queue_under_constant_backpressure() {
    // Four slots, three usable: almost every push spins.
    assert_eq!(stream::<InlineLayout<u64>>(50_000, 1), expected_digest(50_000));
    assert_eq!(stream::<FenceLayout<u64, 4>>(50_000, 1), expected_digest(50_000));
}

#[test]
fn strings_cross_threads_intact() {
    let (producer, mut consumer) = spsc::channel::<String, InlineLayout<String>>(16).unwrap();

    let handle = thread::spawn(move || {
        for i in 0..10_000 {
            producer.push_with(|| format!("message-{i}"));
        }
    });

    for i in 0..10_000 {
        let message = loop {
            if let Some(message) = consumer.take() {
                break message;
            }
            std::hint::spin_loop();
        };
        assert_eq!(message, format!("message-{i}"));
    }

    handle.join().unwrap();
}
