// src/bus/ring.rs
// Lock-free single-producer single-consumer ring buffer

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounded SPSC queue used to move market-data events from the network
/// thread to the strategy thread without locks. Slot storage is allocated
/// once at construction; the push/pop paths never allocate.
///
/// `N` must be a power of two; one slot is sacrificed to distinguish full
/// from empty, so the usable capacity is `N - 1`. Exactly one thread may
/// push and exactly one thread may pop.
pub struct SpscRing<T, const N: usize> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

unsafe impl<T: Copy + Send, const N: usize> Send for SpscRing<T, N> {}
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T: Copy, const N: usize> SpscRing<T, N> {
    const CAPACITY_CHECK: () = assert!(N.is_power_of_two() && N >= 2);
    const MASK: usize = N - 1;

    pub fn new() -> Self {
        // Forces the compile-time capacity assertion for this N.
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;

        SpscRing {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            buffer: (0..N)
                .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
                .collect(),
        }
    }

    /// Try to push an element (producer thread only). Returns false when the
    /// ring is full; the caller decides how to handle the backpressure.
    pub fn try_push(&self, item: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & Self::MASK;

        if next == self.tail.load(Ordering::Acquire) {
            return false; // full
        }

        unsafe {
            (*self.buffer[head].get()).write(item);
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Push an element, spinning until space is available (producer thread
    /// only).
    pub fn push(&self, item: T) {
        while !self.try_push(item) {
            std::hint::spin_loop();
        }
    }

    /// Try to pop an element (consumer thread only). Returns None when the
    /// ring is empty.
    pub fn try_pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return None; // empty
        }

        let item = unsafe { (*self.buffer[tail].get()).assume_init_read() };
        self.tail.store((tail + 1) & Self::MASK, Ordering::Release);
        Some(item)
    }

    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    pub fn is_full(&self) -> bool {
        let next = (self.head.load(Ordering::Acquire) + 1) & Self::MASK;
        next == self.tail.load(Ordering::Acquire)
    }

    /// Approximate number of queued elements; may be stale under concurrent
    /// access.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & Self::MASK
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }
}

impl<T: Copy, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct TestMessage {
        id: u64,
        value: f64,
    }

    #[test]
    fn initially_empty() {
        let ring: SpscRing<TestMessage, 64> = SpscRing::new();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 63);
    }

    #[test]
    fn push_and_pop() {
        let ring: SpscRing<TestMessage, 64> = SpscRing::new();

        assert!(ring.try_push(TestMessage { id: 1, value: 3.14 }));
        assert!(!ring.is_empty());
        assert_eq!(ring.len(), 1);

        let msg = ring.try_pop().unwrap();
        assert_eq!(msg.id, 1);
        assert_eq!(msg.value, 3.14);
        assert!(ring.is_empty());
        assert!(ring.try_pop().is_none());
    }

    #[test]
    fn fifo_order() {
        let ring: SpscRing<u64, 64> = SpscRing::new();
        for i in 0..10 {
            assert!(ring.try_push(i));
        }
        for i in 0..10 {
            assert_eq!(ring.try_pop(), Some(i));
        }
    }

    #[test]
    fn rejects_push_when_full() {
        let ring: SpscRing<u64, 4> = SpscRing::new();
        assert!(ring.try_push(0));
        assert!(ring.try_push(1));
        assert!(ring.try_push(2));
        assert!(ring.is_full());
        assert!(!ring.try_push(3));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn wrap_around_preserves_order() {
        let ring: SpscRing<u64, 4> = SpscRing::new();

        for i in 0..3 {
            assert!(ring.try_push(i));
        }
        for i in 0..3 {
            assert_eq!(ring.try_pop(), Some(i));
        }
        for i in 3..6 {
            assert!(ring.try_push(i));
        }
        for i in 3..6 {
            assert_eq!(ring.try_pop(), Some(i));
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn threaded_fifo_no_loss_no_reorder() {
        const COUNT: u64 = 100_000;
        let ring: Arc<SpscRing<u64, 1024>> = Arc::new(SpscRing::new());

        let producer_ring = ring.clone();
        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                producer_ring.push(i);
            }
        });

        let mut expected = 0u64;
        while expected < COUNT {
            if let Some(value) = ring.try_pop() {
                assert_eq!(value, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }

        producer.join().unwrap();
        assert!(ring.is_empty());
    }
}
